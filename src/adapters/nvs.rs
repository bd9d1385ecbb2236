//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the AirSense node: the whole
//! [`SystemConfig`] is stored as one postcard blob. Every field is
//! range-checked before persisting — a zero duty divisor or an absurd
//! averaging window must never survive a reboot.
//!
//! On host targets the backend is an in-memory map; ESP-IDF commits are
//! atomic per `nvs_commit()`.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::cell::RefCell;
#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &[u8] = b"airsense\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"syscfg\0";
#[cfg(not(target_os = "espidf"))]
const CONFIG_KEY: &str = "airsense::syscfg";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash. On first boot or a
    /// version mismatch the partition is erased and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase run from the single
            // main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: RefCell::new(HashMap::new()),
        })
    }

    /// Open an NVS namespace, run a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: namespace is a NUL-terminated static; handle is closed
        // before returning on every path.
        let ret = unsafe { nvs_open(CONFIG_NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if cfg.mq_low_div == 0 || cfg.mq_low_div > 1000 {
        return Err(ConfigError::ValidationFailed("mq_low_div must be 1–1000"));
    }
    if cfg.mq_low_mult == 0 || cfg.mq_low_mult >= cfg.mq_low_div {
        return Err(ConfigError::ValidationFailed(
            "mq_low_mult must be 1..mq_low_div (the low job must stay duty-cycled)",
        ));
    }
    if !(5.0..=600.0).contains(&cfg.pm_warmup_secs) {
        return Err(ConfigError::ValidationFailed("pm_warmup_secs must be 5–600"));
    }
    if !(1200..=115_200).contains(&cfg.pm_uart_baud) {
        return Err(ConfigError::ValidationFailed("pm_uart_baud must be 1200–115200"));
    }
    if cfg.pm_average_points == 0 || cfg.pm_average_points > crate::sensors::pm::RING_CAPACITY {
        return Err(ConfigError::ValidationFailed(
            "pm_average_points must fit the averaging ring",
        ));
    }
    if !(10..=1000).contains(&cfg.display_min_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "display_min_interval_ms must be 10–1000",
        ));
    }
    if !(100.0..=10_000.0).contains(&cfg.display_overshoot) {
        return Err(ConfigError::ValidationFailed(
            "display_overshoot must be 100–10000",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(bytes) = self.store.borrow().get(CONFIG_KEY) {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(false, |handle| {
                let mut size: usize = 0;

                // First call sizes the blob.
                // SAFETY: handle open; null data pointer requests the size.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                // SAFETY: buf holds `size` writable bytes.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;

        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().insert(CONFIG_KEY.to_string(), bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(true, |handle| {
                // SAFETY: bytes points at a live Vec for the whole call.
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(validate_config(&SystemConfig::default()).is_ok());
    }

    #[test]
    fn zero_duty_divisor_is_rejected() {
        let cfg = SystemConfig { mq_low_div: 0, ..Default::default() };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn full_power_low_job_is_rejected() {
        let cfg = SystemConfig { mq_low_mult: 50, mq_low_div: 50, ..Default::default() };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn oversized_average_window_is_rejected() {
        let cfg = SystemConfig {
            pm_average_points: crate::sensors::pm::RING_CAPACITY + 1,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn save_load_roundtrip() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = SystemConfig { mq_low_mult: 20, mq_low_div: 40, ..Default::default() };
        nvs.save(&cfg).unwrap();
        let loaded = nvs.load().unwrap();
        assert_eq!(loaded.mq_low_mult, 20);
        assert_eq!(loaded.mq_low_div, 40);
    }

    #[test]
    fn load_without_save_returns_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        let loaded = nvs.load().unwrap();
        assert_eq!(loaded.mq_low_div, SystemConfig::default().mq_low_div);
    }

    #[test]
    fn invalid_config_is_never_persisted() {
        let nvs = NvsAdapter::new().unwrap();
        let bad = SystemConfig { mq_low_div: 0, ..Default::default() };
        assert!(nvs.save(&bad).is_err());
        // The store must still be empty.
        let loaded = nvs.load().unwrap();
        assert_eq!(loaded.mq_low_div, SystemConfig::default().mq_low_div);
    }
}

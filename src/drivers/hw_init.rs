//! One-shot ADC peripheral initialization.
//!
//! Configures the ADC1 oneshot unit and the MQ sense channel using raw
//! ESP-IDF sys calls. The sense channel runs at 0 dB attenuation: the MQ
//! divider network tops out below 1.1 V, and the narrower range buys
//! resolution at the bottom of the scale.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    AdcChannelFailed(i32),
    /// The pin is not routed to ADC1 (ADC2 is unusable next to Wi-Fi).
    UnsupportedAdcPin(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 unit init failed (rc={})", rc),
            Self::AdcChannelFailed(rc) => write!(f, "ADC1 channel config failed (rc={})", rc),
            Self::UnsupportedAdcPin(gpio) => write!(f, "GPIO{} is not an ADC1 pin", gpio),
        }
    }
}

/// ESP32 GPIO → ADC1 channel routing.
pub fn adc1_channel_for_gpio(gpio: i32) -> Result<u32, HwInitError> {
    match gpio {
        36 => Ok(0),
        37 => Ok(1),
        38 => Ok(2),
        39 => Ok(3),
        32 => Ok(4),
        33 => Ok(5),
        34 => Ok(6),
        35 => Ok(7),
        other => Err(HwInitError::UnsupportedAdcPin(other)),
    }
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: written once from the single main-task context before the
/// event loop starts; read only from the same context afterwards.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

/// Create the ADC1 oneshot unit. Idempotent.
#[cfg(target_os = "espidf")]
pub fn adc_init() -> Result<(), HwInitError> {
    // SAFETY: main-task only, see ADC1_HANDLE contract.
    unsafe {
        if !ADC1_HANDLE.is_null() {
            return Ok(());
        }
        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        let ret = adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE);
        if ret != ESP_OK {
            return Err(HwInitError::AdcInitFailed(ret));
        }
    }
    info!("hw_init: ADC1 oneshot unit ready");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_init() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ADC init skipped");
    Ok(())
}

/// Configure the MQ sense channel: 0 dB attenuation, 12-bit width.
#[cfg(target_os = "espidf")]
pub fn adc_config_channel(gpio: i32) -> Result<(), HwInitError> {
    let channel = adc1_channel_for_gpio(gpio)?;
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_0,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    // SAFETY: unit handle is valid after adc_init(); main-task only.
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel as adc_channel_t, &chan_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::AdcChannelFailed(ret));
    }
    info!("hw_init: GPIO{} -> ADC1_CH{} @ 0 dB", gpio, channel);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_config_channel(gpio: i32) -> Result<(), HwInitError> {
    adc1_channel_for_gpio(gpio).map(|_| ())
}

/// One raw sample from the configured channel. Returns 0 on read errors —
/// the accumulator treats flat zero at full power as a wiring fault.
#[cfg(target_os = "espidf")]
pub fn adc_read(gpio: i32) -> u16 {
    let Ok(channel) = adc1_channel_for_gpio(gpio) else {
        return 0;
    };
    let mut raw: core::ffi::c_int = 0;
    // SAFETY: handle/channel configured during init; main-task only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel as adc_channel_t, &mut raw) };
    if ret != ESP_OK {
        return 0;
    }
    raw.clamp(0, 4095) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_read(_gpio: i32) -> u16 {
    0
}

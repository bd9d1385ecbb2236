//! MQ heater supply line driver.
//!
//! The heater draws ~150 mA at 5 V, switched through an NPN driver from a
//! single GPIO. The duty-cycle core toggles this line thousands of times
//! per second in low-power mode, so the driver keeps the pin handle warm
//! instead of reconfiguring per write.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: an `esp-idf-hal` `PinDriver` in push-pull output mode.
//! On host/test: an in-memory pin. Both sides are driven through the
//! `embedded-hal` `OutputPin`/`StatefulOutputPin` traits.

use embedded_hal::digital::{OutputPin, PinState, StatefulOutputPin};
use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

#[cfg(target_os = "espidf")]
type Line = PinDriver<'static, AnyOutputPin, Output>;

#[cfg(not(target_os = "espidf"))]
type Line = SimPin;

/// In-memory stand-in for the heater GPIO on host targets.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
}

#[cfg(not(target_os = "espidf"))]
impl embedded_hal::digital::ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

#[cfg(not(target_os = "espidf"))]
impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Owns the heater line once [`configure`](HeaterDriver::configure) ran.
pub struct HeaterDriver {
    line: Option<Line>,
}

impl HeaterDriver {
    pub fn new() -> Self {
        Self { line: None }
    }

    /// (Re-)arm the pin as an output, driven low. Safe to call again on
    /// every subsystem enable; the pin is only claimed once.
    #[cfg(target_os = "espidf")]
    pub fn configure(&mut self, gpio: i32) {
        if self.line.is_none() {
            // SAFETY: the pin number comes from the board definition in
            // `pins.rs` and is claimed exactly once, before the event loop.
            let pin = unsafe { AnyOutputPin::new(gpio) };
            match PinDriver::output(pin) {
                Ok(driver) => self.line = Some(driver),
                Err(e) => {
                    warn!("heater: failed to claim GPIO{} ({})", gpio, e);
                    return;
                }
            }
        }
        self.set(false);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn configure(&mut self, _gpio: i32) {
        if self.line.is_none() {
            self.line = Some(SimPin::default());
        }
        self.set(false);
    }

    /// Drive the heater line.
    pub fn set(&mut self, on: bool) {
        match self.line.as_mut() {
            Some(line) => {
                if OutputPin::set_state(line, PinState::from(on)).is_err() {
                    warn!("heater: GPIO write failed");
                }
            }
            None => warn!("heater: set({}) before configure()", on),
        }
    }

    /// Commanded level of the line; `false` before configuration.
    pub fn is_on(&mut self) -> bool {
        self.line
            .as_mut()
            .and_then(|line| StatefulOutputPin::is_set_high(line).ok())
            .unwrap_or(false)
    }
}

impl Default for HeaterDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_drives_line_low() {
        let mut heater = HeaterDriver::new();
        heater.configure(27);
        assert!(!heater.is_on());
    }

    #[test]
    fn set_roundtrip() {
        let mut heater = HeaterDriver::new();
        heater.configure(27);
        heater.set(true);
        assert!(heater.is_on());
        heater.set(false);
        assert!(!heater.is_on());
    }

    #[test]
    fn unconfigured_line_reads_off() {
        let mut heater = HeaterDriver::new();
        assert!(!heater.is_on());
    }

    #[test]
    fn reconfigure_forces_heater_off() {
        let mut heater = HeaterDriver::new();
        heater.configure(27);
        heater.set(true);
        heater.configure(27);
        assert!(!heater.is_on());
    }
}

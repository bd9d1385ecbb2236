//! Hardware adapter — bridges real peripherals to the domain port traits.
//!
//! Owns the heater line and delegates ADC, timer, and UART access to the
//! driver modules; this and the drivers are the only code that touches
//! actual hardware. On host targets the ADC reads from an injectable
//! atomic and the UART from an in-memory byte queue, so the whole
//! acquisition path runs in tests unchanged.

use log::warn;

use crate::app::ports::{MqHardware, UartPort};
use crate::drivers::heater::HeaterDriver;
use crate::drivers::{hw_init, hw_timer};

#[cfg(target_os = "espidf")]
use crate::drivers::uart;
#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};
#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

#[cfg(not(target_os = "espidf"))]
static SIM_GAS_ADC: AtomicU16 = AtomicU16::new(0);

/// Inject the simulated MQ sense voltage (host/test builds).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_gas_adc(raw: u16) {
    SIM_GAS_ADC.store(raw, Ordering::Relaxed);
}

/// Concrete adapter combining all sensing hardware behind port traits.
pub struct HardwareAdapter {
    heater: HeaterDriver,
    sense_pin: Option<i32>,
    adc_configured: bool,
    #[cfg(not(target_os = "espidf"))]
    uart_rx: VecDeque<u8>,
}

impl HardwareAdapter {
    pub fn new() -> Self {
        Self {
            heater: HeaterDriver::new(),
            sense_pin: None,
            adc_configured: false,
            #[cfg(not(target_os = "espidf"))]
            uart_rx: VecDeque::new(),
        }
    }

    /// Queue bytes on the simulated PM UART (host/test builds).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_feed_pm_bytes(&mut self, bytes: &[u8]) {
        self.uart_rx.extend(bytes);
    }
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── MqHardware implementation ─────────────────────────────────

impl MqHardware for HardwareAdapter {
    fn configure_heater_output(&mut self, power_pin: i32) {
        self.heater.configure(power_pin);
    }

    fn configure_sense_adc(&mut self, sense_pin: i32) {
        self.sense_pin = Some(sense_pin);
        if self.adc_configured {
            return;
        }
        let setup = hw_init::adc_init().and_then(|()| hw_init::adc_config_channel(sense_pin));
        match setup {
            Ok(()) => self.adc_configured = true,
            Err(e) => warn!("hardware: sense ADC setup failed: {}", e),
        }
    }

    fn set_heater(&mut self, on: bool) {
        self.heater.set(on);
    }

    fn heater_is_on(&mut self) -> bool {
        self.heater.is_on()
    }

    #[cfg(target_os = "espidf")]
    fn read_sense_raw(&mut self) -> u16 {
        self.sense_pin.map_or(0, hw_init::adc_read)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_sense_raw(&mut self) -> u16 {
        SIM_GAS_ADC.load(Ordering::Relaxed)
    }

    fn start_duty_timer(&mut self) {
        hw_timer::start_duty_timer();
    }

    fn stop_duty_timer(&mut self) {
        hw_timer::stop_duty_timer();
    }

    fn start_sample_timer(&mut self) {
        hw_timer::start_sample_timer();
    }

    fn stop_sample_timer(&mut self) {
        hw_timer::stop_sample_timer();
    }
}

// ── UartPort implementation ───────────────────────────────────

impl UartPort for HardwareAdapter {
    #[cfg(target_os = "espidf")]
    fn available(&mut self) -> usize {
        uart::available(pins::PM_UART_NUM)
    }

    #[cfg(target_os = "espidf")]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        uart::read(pins::PM_UART_NUM, buf)
    }

    #[cfg(not(target_os = "espidf"))]
    fn available(&mut self) -> usize {
        self.uart_rx.len()
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.uart_rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.uart_rx.pop_front().unwrap_or(0);
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins;

    #[test]
    fn sim_adc_injection_reaches_reads() {
        let mut hw = HardwareAdapter::new();
        hw.configure_sense_adc(pins::MQ_SENSE_GPIO);
        sim_set_gas_adc(1234);
        assert_eq!(hw.read_sense_raw(), 1234);
        sim_set_gas_adc(0);
    }

    #[test]
    fn sim_uart_feed_and_read() {
        let mut hw = HardwareAdapter::new();
        hw.sim_feed_pm_bytes(&[1, 2, 3, 4]);
        assert_eq!(hw.available(), 4);
        let mut buf = [0u8; 3];
        assert_eq!(UartPort::read(&mut hw, &mut buf), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(hw.available(), 1);
    }

    #[test]
    fn heater_roundtrip_through_port() {
        let mut hw = HardwareAdapter::new();
        hw.configure_heater_output(pins::MQ_POWER_GPIO);
        assert!(!hw.heater_is_on());
        hw.set_heater(true);
        assert!(hw.heater_is_on());
    }
}

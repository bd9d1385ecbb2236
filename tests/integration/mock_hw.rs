//! Mock hardware adapter for integration tests.
//!
//! Records every heater write and timer transition so tests can assert
//! on the full command history without touching real peripherals.

use std::collections::VecDeque;

use airsense::app::events::AppEvent;
use airsense::app::ports::{EventSink, MqHardware, UartPort};

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub heater_on: bool,
    /// Every level ever written, in order.
    pub heater_writes: Vec<bool>,
    /// Returned by ADC reads when the queue is empty.
    pub adc_default: u16,
    /// Per-read override values, consumed front-first.
    pub adc_queue: VecDeque<u16>,
    pub duty_timer_running: bool,
    pub duty_timer_starts: u32,
    pub sample_timer_running: bool,
    pub sample_timer_starts: u32,
    pub configured_heater_pins: Vec<i32>,
    pub configured_adc_pins: Vec<i32>,
    uart_rx: VecDeque<u8>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(adc_default: u16) -> Self {
        Self {
            heater_on: false,
            heater_writes: Vec::new(),
            adc_default,
            adc_queue: VecDeque::new(),
            duty_timer_running: false,
            duty_timer_starts: 0,
            sample_timer_running: false,
            sample_timer_starts: 0,
            configured_heater_pins: Vec::new(),
            configured_adc_pins: Vec::new(),
            uart_rx: VecDeque::new(),
        }
    }

    pub fn feed_uart(&mut self, bytes: &[u8]) {
        self.uart_rx.extend(bytes);
    }
}

impl MqHardware for MockHardware {
    fn configure_heater_output(&mut self, power_pin: i32) {
        self.configured_heater_pins.push(power_pin);
    }

    fn configure_sense_adc(&mut self, sense_pin: i32) {
        self.configured_adc_pins.push(sense_pin);
    }

    fn set_heater(&mut self, on: bool) {
        self.heater_on = on;
        self.heater_writes.push(on);
    }

    fn heater_is_on(&mut self) -> bool {
        self.heater_on
    }

    fn read_sense_raw(&mut self) -> u16 {
        self.adc_queue.pop_front().unwrap_or(self.adc_default)
    }

    fn start_duty_timer(&mut self) {
        self.duty_timer_running = true;
        self.duty_timer_starts += 1;
    }

    fn stop_duty_timer(&mut self) {
        self.duty_timer_running = false;
    }

    fn start_sample_timer(&mut self) {
        self.sample_timer_running = true;
        self.sample_timer_starts += 1;
    }

    fn stop_sample_timer(&mut self) {
        self.sample_timer_running = false;
    }
}

impl UartPort for MockHardware {
    fn available(&mut self) -> usize {
        self.uart_rx.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.uart_rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.uart_rx.pop_front().unwrap();
        }
        n
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, event: AppEvent) -> usize {
        self.events.iter().filter(|&&e| e == event).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

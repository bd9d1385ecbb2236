//! End-to-end duty-cycle runs: service + mock hardware, tick by tick,
//! replicating the main loop's event ordering (deferred window start,
//! run-now first sample, 40 hardware ticks between samples).

use airsense::app::events::AppEvent;
use airsense::app::service::AppService;
use airsense::config::SystemConfig;
use airsense::pins;
use airsense::sensors::mq::{HIGH_DUTY_TICKS, LOW_DUTY_TICKS};

use crate::mock_hw::{MockHardware, RecordingSink};

struct Harness {
    service: AppService,
    hw: MockHardware,
    sink: RecordingSink,
    ticks_since_sample: u32,
}

impl Harness {
    fn new(adc_default: u16) -> Self {
        let mut h = Self {
            service: AppService::new(SystemConfig::default()),
            hw: MockHardware::new(adc_default),
            sink: RecordingSink::new(),
            ticks_since_sample: 0,
        };
        assert!(h.service.mq_enable(pins::MQ_POWER_GPIO, pins::MQ_SENSE_GPIO, &mut h.hw));
        h
    }

    /// One 500 µs hardware tick plus the follow-up events the main loop
    /// would deliver around it.
    fn tick(&mut self) {
        if self.service.on_duty_tick(&mut self.hw) {
            // Deferred window start, then the sample timer's run-now tick.
            self.service.on_window_start(&mut self.hw);
            self.service.on_sample_tick(&mut self.hw, &mut self.sink);
            self.ticks_since_sample = 0;
        } else if self.hw.sample_timer_running {
            self.ticks_since_sample += 1;
            if self.ticks_since_sample >= 40 {
                self.ticks_since_sample = 0;
                self.service.on_sample_tick(&mut self.hw, &mut self.sink);
            }
        }
    }

    fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }
}

#[test]
fn full_power_cycle_publishes_methane() {
    let mut h = Harness::new(2048);
    h.run(HIGH_DUTY_TICKS);

    assert_eq!(h.sink.count(AppEvent::MethaneAvailable), 1);
    assert_eq!(h.service.gas_label(), "methane");
    // 2048/4095 of the 0..1000 range, rounded to 2 decimals.
    let methane = h.service.methane_value().expect("methane must be valid");
    assert!((methane - 500.12).abs() < 1e-9);
    assert_eq!(h.service.gas_value(), Some(methane));
    assert_eq!(h.service.co_value(), None);
}

#[test]
fn second_cycle_publishes_co_after_rotation() {
    let mut h = Harness::new(820);
    h.run(HIGH_DUTY_TICKS);
    assert_eq!(h.sink.count(AppEvent::CoAvailable), 0);

    h.run(LOW_DUTY_TICKS);
    assert_eq!(h.sink.count(AppEvent::CoAvailable), 1);
    assert_eq!(h.service.gas_label(), "co");
    assert!(h.service.co_value().is_some());
    // The CO batch invalidated the methane slot.
    assert_eq!(h.service.methane_value(), None);
}

#[test]
fn two_full_cycles_return_to_methane() {
    let mut h = Harness::new(1500);
    h.run(HIGH_DUTY_TICKS + LOW_DUTY_TICKS + HIGH_DUTY_TICKS);

    assert_eq!(h.sink.count(AppEvent::MethaneAvailable), 2);
    assert_eq!(h.sink.count(AppEvent::CoAvailable), 1);
    assert_eq!(h.service.gas_label(), "methane");
}

#[test]
fn flat_zero_full_power_batch_self_disables() {
    let mut h = Harness::new(0);
    h.run(HIGH_DUTY_TICKS);

    assert_eq!(h.sink.count(AppEvent::GasDisabled), 1);
    assert_eq!(h.sink.count(AppEvent::MethaneAvailable), 0);
    assert!(!h.service.mq_enabled());
    assert!(!h.hw.duty_timer_running);
    assert!(!h.hw.sample_timer_running);
    assert!(!h.hw.heater_on);
    assert_eq!(h.service.gas_label(), "");
    assert_eq!(h.service.gas_value(), None);
}

#[test]
fn heater_duty_pattern_during_low_cycle() {
    let mut h = Harness::new(820);
    h.run(HIGH_DUTY_TICKS); // rotate to the co job

    // Within the low cycle: heater OFF from tick mult to div, ON from
    // div to div+mult (ratio from SystemConfig: 14/50).
    h.hw.heater_writes.clear();
    h.run(50);
    assert!(h.hw.heater_writes.contains(&false));
    assert!(h.hw.heater_writes.contains(&true));
}

#[test]
fn external_toggle_disables_and_reenables() {
    let mut h = Harness::new(2048);
    h.run(1000);

    assert!(h.service.mq_toggle(&mut h.hw, &mut h.sink));
    assert_eq!(h.sink.count(AppEvent::GasDisabled), 1);
    assert!(!h.service.mq_enabled());
    assert!(!h.hw.duty_timer_running);

    assert!(h.service.mq_toggle(&mut h.hw, &mut h.sink));
    assert!(h.service.mq_enabled());
    assert!(h.hw.duty_timer_running);
    assert_eq!(h.hw.duty_timer_starts, 2);
}

#[test]
fn stale_queue_events_after_disable_are_harmless() {
    let mut h = Harness::new(2048);
    h.run(1000);

    assert!(h.service.mq_disable(&mut h.hw, &mut h.sink));

    // Events that were already queued when disable() ran.
    assert!(!h.service.on_duty_tick(&mut h.hw));
    h.service.on_window_start(&mut h.hw);
    assert!(!h.service.on_sample_tick(&mut h.hw, &mut h.sink));
    assert!(!h.hw.sample_timer_running);
}

#[test]
fn enable_is_idempotent_at_service_level() {
    let mut h = Harness::new(2048);
    assert!(h.service.mq_enable(pins::MQ_POWER_GPIO, pins::MQ_SENSE_GPIO, &mut h.hw));
    assert_eq!(h.hw.duty_timer_starts, 1);
    // ADC configuration latched once.
    assert_eq!(h.hw.configured_adc_pins, vec![pins::MQ_SENSE_GPIO]);
}

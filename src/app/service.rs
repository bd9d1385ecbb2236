//! Application service — owns the sensing domain state.
//!
//! [`AppService`] holds the MQ acquisition state machine, the gas readout
//! cache, and the PM pipeline, and routes queue events into them. All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!  MqHardware ──▶ ┌────────────────────────┐ ──▶ EventSink
//!  UartPort   ──▶ │       AppService        │
//!                 │  acquisition · readout  │ ◀── display accessors
//!                 │  PM pipeline            │
//!                 └────────────────────────┘
//! ```

use heapless::String;
use log::info;

use crate::config::SystemConfig;
use crate::error::AverageError;
use crate::sensors::mq::{BatchOutcome, GasKind, GasReadout, MqAcquisition, SampleStep};
use crate::sensors::pm::{Channel, PmFrame, PmPipeline};

use super::events::AppEvent;
use super::ports::{EventSink, MqHardware, UartPort};

/// Characters kept of the display state banner.
const BANNER_CAP: usize = 16;

/// The application service orchestrates the sensing core.
pub struct AppService {
    config: SystemConfig,
    mq: MqAcquisition,
    readout: GasReadout,
    pm: PmPipeline,
    banner: String<BANNER_CAP>,
}

impl AppService {
    /// Construct the service from configuration. The low-power job's duty
    /// ratio comes from the persisted config override.
    pub fn new(config: SystemConfig) -> Self {
        let mq = MqAcquisition::new(config.mq_low_mult, config.mq_low_div, config.mq_dual_mode);
        let pm = PmPipeline::new(config.pm_warmup_secs);
        Self {
            config,
            mq,
            readout: GasReadout::default(),
            pm,
            banner: String::new(),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ── Gas acquisition lifecycle ─────────────────────────────

    /// Switch gas acquisition on (idempotent).
    pub fn mq_enable(&mut self, power_pin: i32, sense_pin: i32, hw: &mut impl MqHardware) -> bool {
        let was_enabled = self.mq.is_enabled();
        let ok = self.mq.enable(power_pin, sense_pin, hw);
        if ok && !was_enabled {
            self.readout.clear_validity();
        }
        ok
    }

    /// Switch gas acquisition off (idempotent). Emits
    /// [`AppEvent::GasDisabled`] on the actual transition.
    pub fn mq_disable(&mut self, hw: &mut impl MqHardware, sink: &mut impl EventSink) -> bool {
        let was_enabled = self.mq.is_enabled();
        let ok = self.mq.disable(hw);
        if ok && was_enabled {
            self.readout.clear_validity();
            sink.emit(&AppEvent::GasDisabled);
        }
        ok
    }

    /// Flip gas acquisition; also the fault response for a disconnected
    /// sensor. Fails only when pins were never assigned.
    pub fn mq_toggle(&mut self, hw: &mut impl MqHardware, sink: &mut impl EventSink) -> bool {
        if self.mq.is_enabled() {
            self.mq_disable(hw, sink)
        } else {
            let ok = self.mq.toggle(hw);
            if ok {
                self.readout.clear_validity();
            }
            ok
        }
    }

    pub fn mq_enabled(&self) -> bool {
        self.mq.is_enabled()
    }

    // ── Event handlers (called from the main-loop drain) ──────

    /// One 500 µs duty tick. Returns `true` when a measurement batch must
    /// be started — the caller pushes the deferred window-start event.
    pub fn on_duty_tick(&mut self, hw: &mut impl MqHardware) -> bool {
        // Ticks already queued when disable() ran are stale; drop them.
        if !self.mq.is_enabled() {
            return false;
        }
        self.mq.hw_tick(hw)
    }

    /// Deferred window-start: arm the sampling timer for a fresh batch.
    pub fn on_window_start(&mut self, hw: &mut impl MqHardware) {
        if !self.mq.is_enabled() || !self.mq.is_measuring() {
            return; // Stale event from before a disable().
        }
        self.mq.begin_batch(hw);
    }

    /// One 20 ms sampling tick. Returns `true` when the readout changed
    /// (batch finalized) so the caller can refresh the display.
    pub fn on_sample_tick(&mut self, hw: &mut impl MqHardware, sink: &mut impl EventSink) -> bool {
        if !self.mq.is_sampling() {
            return false; // Stale tick after finalize or disable.
        }
        match self.mq.sample_tick(hw) {
            SampleStep::Pending => false,
            SampleStep::Finalized(outcome) => {
                self.apply_batch(outcome, hw, sink);
                true
            }
        }
    }

    fn apply_batch(
        &mut self,
        outcome: BatchOutcome,
        hw: &mut impl MqHardware,
        sink: &mut impl EventSink,
    ) {
        match outcome {
            BatchOutcome::Reading { kind, label, value, .. } => {
                self.readout.publish(kind, label, value);
                sink.emit(&match kind {
                    GasKind::Co => AppEvent::CoAvailable,
                    GasKind::Methane => AppEvent::MethaneAvailable,
                });
            }
            BatchOutcome::Rejected { samples } => {
                info!("batch rejected: only {} samples", samples);
                self.readout.reject();
            }
            BatchOutcome::Disconnected => {
                self.readout.reject();
                self.mq_disable(hw, sink);
            }
        }
    }

    /// Drain buffered PM frames. Emits one [`AppEvent::PmFrame`] per
    /// accepted frame; returns how many were accepted.
    pub fn on_pm_data(
        &mut self,
        uart: &mut impl UartPort,
        uptime_secs: f64,
        sink: &mut impl EventSink,
    ) -> u32 {
        let frames = self.pm.drain(uart, uptime_secs);
        for _ in 0..frames {
            sink.emit(&AppEvent::PmFrame);
        }
        frames
    }

    // ── Readout accessors (display path) ──────────────────────

    /// Label of the last measured gas; empty while no valid reading.
    pub fn gas_label(&self) -> &'static str {
        self.readout.label()
    }

    /// Most recent gas reading, whichever kind.
    pub fn gas_value(&self) -> Option<f64> {
        self.readout.value()
    }

    pub fn co_value(&self) -> Option<f64> {
        self.readout.co()
    }

    pub fn methane_value(&self) -> Option<f64> {
        self.readout.methane()
    }

    /// Moving average over the last `points` PM frames.
    pub fn pm_average(&self, channel: Channel, points: usize) -> Result<Option<f64>, AverageError> {
        self.pm.average(channel, points)
    }

    /// Last raw PM frame for the instantaneous display.
    pub fn last_pm_frame(&self) -> Option<&PmFrame> {
        self.pm.last_frame()
    }

    /// Short status string shown in the display header.
    pub fn state_banner(&self) -> &str {
        &self.banner
    }

    /// Replace the banner, truncating to its fixed capacity.
    pub fn set_state_banner(&mut self, text: &str) {
        self.banner.clear();
        for ch in text.chars() {
            if self.banner.push(ch).is_err() {
                break;
            }
        }
    }
}

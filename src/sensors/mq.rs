//! MQ-series combustion-gas acquisition core.
//!
//! Drives the sensor's heater through alternating duty-cycle jobs (full
//! power for methane, a reduced duty for CO, per the MQ9 datasheet) and
//! collects a batch of ADC samples in a timed window at the tail of every
//! duty period:
//!
//! ```text
//!  tick 0                                window start        period end
//!  ├────────────── heater duty pattern ──────┼── sampling ──────┤ rotate
//!  │   LOW job: ON mult of every div ticks   │  one ADC read    │ job,
//!  │   HIGH job: ON continuously             │  per 20 ms tick  │ tick=0
//! ```
//!
//! The duty driver runs once per 500 µs hardware tick; the accumulator
//! runs on a separate 20 ms timer that the driver arms *indirectly* (via
//! a deferred [`Event::MqWindowStart`]) so a timer is never manipulated
//! from inside another timer's callback. Both share this struct's tick
//! counter — safe only under the cooperative single-consumer event loop.
//!
//! [`Event::MqWindowStart`]: crate::events::Event::MqWindowStart

use heapless::Vec;
use log::{error, info, warn};

use crate::app::ports::MqHardware;

/// Duty-cycle hardware tick period.
pub const HW_TICK_US: u64 = 500;

/// Sampling timer period inside the measurement window.
pub const SAMPLE_TICK_MS: u32 = 20;

/// Sample buffer capacity per measurement batch.
pub const MAX_SAMPLES: usize = 64;

/// Hardware ticks between two ADC samples.
const TICKS_PER_SAMPLE: u32 = SAMPLE_TICK_MS * 1000 / HW_TICK_US as u32;

/// Measurement window length: one tick slot per sample plus a 200 ms
/// settle margin.
pub const MEASURE_WINDOW_TICKS: u32 = TICKS_PER_SAMPLE * (MAX_SAMPLES as u32 + 10);

/// Low-power (duty-cycled) job period: 90 s of hardware ticks.
pub const LOW_DUTY_TICKS: u32 = (90_000_000 / HW_TICK_US) as u32;

/// Full-power job period: 60 s of hardware ticks.
pub const HIGH_DUTY_TICKS: u32 = (60_000_000 / HW_TICK_US) as u32;

/// A batch must collect strictly more samples than this to publish.
const MIN_VIABLE_SAMPLES: usize = 16;

/// Raw ADC full scale (12-bit).
const ADC_FULL_SCALE: f64 = 4095.0;

/// Top of the displayed value range; full-scale ADC maps here.
const VALUE_RANGE: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Duty jobs
// ---------------------------------------------------------------------------

/// Which gas a finished batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasKind {
    Co,
    Methane,
}

/// One heater duty pattern plus its output label.
///
/// `mult == div` is the full-power (always-on) job; `mult < div` keeps the
/// heater ON for `mult` out of every `div` ticks.
#[derive(Debug, Clone, Copy)]
pub struct DutyJob {
    pub name: &'static str,
    pub mult: u16,
    pub div: u16,
}

impl DutyJob {
    pub fn is_low_power(&self) -> bool {
        self.mult != self.div
    }

    /// Duty period in hardware ticks. The low-power phase is held longer
    /// (90 s vs 60 s) so the element reaches a stable reduced temperature
    /// before sampling.
    pub fn period_ticks(&self) -> u32 {
        if self.is_low_power() {
            LOW_DUTY_TICKS
        } else {
            HIGH_DUTY_TICKS
        }
    }

    /// First tick of the measurement window.
    pub fn window_start_tick(&self) -> u32 {
        self.period_ticks() - MEASURE_WINDOW_TICKS
    }
}

// ---------------------------------------------------------------------------
// Measurement window tracker
// ---------------------------------------------------------------------------

/// Where a tick falls relative to the job's measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub in_window: bool,
    pub just_entered: bool,
    pub cycle_ended: bool,
}

/// Pure function of `(tick, job)`. The window is the tail
/// [`MEASURE_WINDOW_TICKS`] of the job's duty period.
pub fn track_window(tick: u32, job: &DutyJob) -> WindowState {
    let period = job.period_ticks();
    let start = job.window_start_tick();
    WindowState {
        in_window: tick >= start && tick < period,
        just_entered: tick == start,
        cycle_ended: tick >= period,
    }
}

// ---------------------------------------------------------------------------
// Batch outcomes
// ---------------------------------------------------------------------------

/// Result of a finalized measurement batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchOutcome {
    /// Enough samples: averaged, scaled, ready to publish.
    Reading {
        kind: GasKind,
        label: &'static str,
        value: f64,
        samples: usize,
    },
    /// Too few samples — the current readout must be invalidated.
    Rejected { samples: usize },
    /// Flat-zero batch at full power: the sense line is almost certainly
    /// unconnected. The caller must disable the whole subsystem.
    Disconnected,
}

/// What one sampling-timer tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleStep {
    /// Batch still running.
    Pending,
    /// Terminal transition: the sample timer has been stopped.
    Finalized(BatchOutcome),
}

// ---------------------------------------------------------------------------
// Gas readout cache
// ---------------------------------------------------------------------------

/// Most-recent calibrated readings, readable by the display path.
///
/// Absent values are `None`, never a sentinel — a real zero reading
/// cannot collide with "no reading yet".
#[derive(Debug, Default)]
pub struct GasReadout {
    co: Option<f64>,
    methane: Option<f64>,
    /// Whatever the last completed batch produced, regardless of gas.
    last: Option<(f64, &'static str)>,
}

impl GasReadout {
    /// Publish a completed batch. Every finalize invalidates both
    /// per-gas slots before re-validating the one that was measured.
    pub fn publish(&mut self, kind: GasKind, label: &'static str, value: f64) {
        self.co = None;
        self.methane = None;
        match kind {
            GasKind::Co => self.co = Some(value),
            GasKind::Methane => self.methane = Some(value),
        }
        self.last = Some((value, label));
    }

    /// A batch completed without a usable reading.
    pub fn reject(&mut self) {
        self.co = None;
        self.methane = None;
        self.last = None;
    }

    /// Clear validity flags only (enable/disable path); the last
    /// value/label pair survives for the display.
    pub fn clear_validity(&mut self) {
        self.co = None;
        self.methane = None;
    }

    /// Label of the last measured gas; empty while invalid.
    pub fn label(&self) -> &'static str {
        self.last.map_or("", |(_, name)| name)
    }

    /// Value of the last measured gas, whichever kind it was.
    pub fn value(&self) -> Option<f64> {
        self.last.map(|(v, _)| v)
    }

    pub fn co(&self) -> Option<f64> {
        self.co
    }

    pub fn methane(&self) -> Option<f64> {
        self.methane
    }
}

// ---------------------------------------------------------------------------
// Acquisition state machine
// ---------------------------------------------------------------------------

/// Duty-cycle driver + measurement accumulator + job rotation + lifecycle.
///
/// At most one measurement batch is ever in flight: `measuring` is true
/// exactly while a sampling timer exists. The tick counter always lies in
/// `[0, period_ticks(current job))`.
pub struct MqAcquisition {
    jobs: [DutyJob; 2],
    dual_mode: bool,
    current_job: usize,
    /// Job the in-flight batch belongs to; survives a rotation that
    /// happens while the batch is still finalizing.
    measuring_job: Option<usize>,
    tick: u32,
    measuring: bool,
    sample_timer_live: bool,
    samples: Vec<u16, MAX_SAMPLES>,
    enabled: bool,
    power_pin: Option<i32>,
    sense_pin: Option<i32>,
}

impl MqAcquisition {
    /// Build the job table. Job 0 is the full-power methane phase; job 1
    /// is the reduced-duty CO phase whose ratio comes from persisted
    /// config. A zero divisor or `mult > div` is a configuration error
    /// and fatal here, before any timer exists.
    pub fn new(low_mult: u16, low_div: u16, dual_mode: bool) -> Self {
        assert!(low_div > 0, "low-power duty divisor must be nonzero");
        assert!(low_mult <= low_div, "low-power duty mult must not exceed div");
        Self {
            jobs: [
                DutyJob { name: "methane", mult: 100, div: 100 },
                DutyJob { name: "co", mult: low_mult, div: low_div },
            ],
            dual_mode,
            current_job: 0,
            measuring_job: None,
            tick: 0,
            measuring: false,
            sample_timer_live: false,
            samples: Vec::new(),
            enabled: false,
            power_pin: None,
            sense_pin: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_measuring(&self) -> bool {
        self.measuring
    }

    /// True exactly while a sampling timer is armed.
    pub fn is_sampling(&self) -> bool {
        self.measuring && self.sample_timer_live
    }

    pub fn current_job(&self) -> &DutyJob {
        &self.jobs[self.current_job]
    }

    pub fn current_job_index(&self) -> usize {
        self.current_job
    }

    /// Pin the active job (single-job mode, bench calibration).
    pub fn set_job(&mut self, index: usize) {
        assert!(index < self.jobs.len());
        self.current_job = index;
    }

    pub fn set_dual_mode(&mut self, dual: bool) {
        self.dual_mode = dual;
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Switch the subsystem on. Idempotent: a second call while enabled
    /// does nothing. The first call ever latches the pin assignment and
    /// performs the one-time ADC channel setup; every effective call
    /// re-arms the heater output, resets tick/sample state, selects job 0
    /// and starts the duty timer.
    pub fn enable(&mut self, power_pin: i32, sense_pin: i32, hw: &mut impl MqHardware) -> bool {
        if self.enabled {
            return true;
        }

        if self.power_pin.is_none() {
            self.power_pin = Some(power_pin);
            self.sense_pin = Some(sense_pin);
            hw.configure_sense_adc(sense_pin);
        }

        self.enabled = true;
        self.tick = 0;
        self.samples.clear();
        self.measuring = false;
        self.measuring_job = None;
        self.sample_timer_live = false;
        self.current_job = 0;

        hw.configure_heater_output(self.power_pin.unwrap_or(power_pin));
        hw.set_heater(false);
        hw.start_duty_timer();
        info!(
            "MQ acquisition started: window={} ticks, jobs={}",
            MEASURE_WINDOW_TICKS,
            self.jobs.len()
        );
        true
    }

    /// Switch the subsystem off. Stops the duty timer, cancels any live
    /// sampling timer, forces the heater off. Idempotent; returns `false`
    /// only when there is nothing to stop *and* pins were never assigned.
    pub fn disable(&mut self, hw: &mut impl MqHardware) -> bool {
        if self.enabled {
            hw.stop_duty_timer();
            if self.sample_timer_live {
                hw.stop_sample_timer();
                self.sample_timer_live = false;
            }
            self.enabled = false;
            self.measuring = false;
            self.measuring_job = None;
            hw.set_heater(false);
            info!("MQ acquisition stopped");
            true
        } else {
            self.power_pin.is_some()
        }
    }

    /// Flip between enabled and disabled, reusing the latched pins.
    /// Returns `false` if pins were never assigned.
    pub fn toggle(&mut self, hw: &mut impl MqHardware) -> bool {
        if self.enabled {
            self.disable(hw)
        } else if let (Some(power), Some(sense)) = (self.power_pin, self.sense_pin) {
            self.enable(power, sense, hw)
        } else {
            false
        }
    }

    // ── Duty-cycle driver (500 µs hardware tick) ──────────────

    /// Advance the duty cycle by one hardware tick.
    ///
    /// Returns `true` when the measurement window was just entered: the
    /// caller must defer [`begin_batch`](Self::begin_batch) through the
    /// event queue rather than arming the sampling timer inline.
    pub fn hw_tick(&mut self, hw: &mut impl MqHardware) -> bool {
        debug_assert!(self.enabled);
        self.tick += 1;

        let job = self.jobs[self.current_job];
        if job.is_low_power() {
            let rest = self.tick % u32::from(job.div);
            if rest == u32::from(job.mult) {
                hw.set_heater(false);
            } else if rest == 0 {
                hw.set_heater(true);
            }
        } else if !self.measuring && !hw.heater_is_on() {
            // Full power: idempotent re-assert. The heater deliberately
            // stays energised through the measurement window.
            hw.set_heater(true);
        }

        let window = track_window(self.tick, &job);
        if window.cycle_ended {
            if self.dual_mode {
                self.current_job = (self.current_job + 1) % self.jobs.len();
            }
            self.tick = 0;
            false
        } else if window.just_entered {
            self.measuring = true;
            self.measuring_job = Some(self.current_job);
            true
        } else {
            false
        }
    }

    // ── Measurement accumulator (20 ms sampling timer) ────────

    /// Start a new measurement batch: clear the buffer and arm the
    /// sampling timer. Only reachable from the deferred window-start
    /// event; a batch already in flight is a sequencing bug.
    pub fn begin_batch(&mut self, hw: &mut impl MqHardware) {
        assert!(self.measuring, "batch start outside a measurement window");
        assert!(!self.sample_timer_live, "measurement batch already in flight");
        self.samples.clear();
        self.sample_timer_live = true;
        hw.start_sample_timer();
    }

    /// One sampling-timer tick: pull an ADC sample while the window is
    /// open, finalize the batch when the buffer fills or the window
    /// closes. Finalizing stops the sampling timer — the only place it
    /// is ever stopped outside [`disable`](Self::disable).
    pub fn sample_tick(&mut self, hw: &mut impl MqHardware) -> SampleStep {
        assert!(self.measuring, "sample tick without a live batch");
        assert!(self.sample_timer_live);
        let job = self.jobs[self.measuring_job.expect("measuring without a job")];

        // Live tick counter, shared with hw_tick — not a snapshot.
        let window = track_window(self.tick, &job);
        if window.in_window {
            debug_assert!(!self.samples.is_full());
            let _ = self.samples.push(hw.read_sense_raw());
        }

        if self.samples.is_full() || !window.in_window {
            hw.stop_sample_timer();
            self.sample_timer_live = false;
            self.measuring = false;
            if !window.in_window {
                warn!(
                    "measurement window missed: tick={}, samples={}",
                    self.tick,
                    self.samples.len()
                );
            }
            SampleStep::Finalized(self.finalize(&job))
        } else {
            SampleStep::Pending
        }
    }

    fn finalize(&mut self, job: &DutyJob) -> BatchOutcome {
        let count = self.samples.len();
        let sum: u32 = self.samples.iter().map(|&s| u32::from(s)).sum();
        let low_power = job.is_low_power();

        // A flat-zero batch with the heater at full power means the sense
        // line is floating. In low-power mode a near-zero sum is a
        // legitimate reading, so the inference only applies here.
        if sum == 0 && !low_power {
            error!("MQ sensor probably disconnected, stopping acquisition");
            return BatchOutcome::Disconnected;
        }

        if count > MIN_VIABLE_SAMPLES {
            let mean = f64::from(sum) / count as f64;
            let scaled = mean * VALUE_RANGE / ADC_FULL_SCALE;
            let value = (scaled * 100.0).round() / 100.0;
            let kind = if low_power { GasKind::Co } else { GasKind::Methane };
            info!(
                "measured {} level {:.2} from {} samples",
                job.name, value, count
            );
            BatchOutcome::Reading {
                kind,
                label: job.name,
                value,
                samples: count,
            }
        } else {
            BatchOutcome::Rejected { samples: count }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

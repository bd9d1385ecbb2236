//! Port traits — the boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (the hardware adapter, NVS, the log sink) implement
//! these traits.  The [`AppService`](super::service::AppService) and the
//! acquisition core consume them via generics, so the domain never touches
//! hardware directly and every test can substitute a recording mock.

use crate::config::SystemConfig;

// ───────────────────────────────────────────────────────────────
// MQ acquisition hardware (heater line, sense ADC, timers)
// ───────────────────────────────────────────────────────────────

/// Everything the duty-cycle acquisition core asks of the hardware.
///
/// Timer contract: the duty timer fires [`Event::MqDutyTick`] every
/// 500 µs until stopped; the sample timer fires [`Event::MqSampleTick`]
/// every 20 ms, once immediately on arm ("run now"), until stopped.
/// Both are repeating and idempotently stoppable.
///
/// [`Event::MqDutyTick`]: crate::events::Event::MqDutyTick
/// [`Event::MqSampleTick`]: crate::events::Event::MqSampleTick
pub trait MqHardware {
    /// (Re-)arm the heater line as a GPIO output, driven low.
    fn configure_heater_output(&mut self, power_pin: i32);

    /// One-time ADC channel setup (attenuation, bit width) for the
    /// sense pin.
    fn configure_sense_adc(&mut self, sense_pin: i32);

    /// Drive the heater supply line.
    fn set_heater(&mut self, on: bool);

    /// Current commanded level of the heater line.
    fn heater_is_on(&mut self) -> bool;

    /// One raw 12-bit ADC sample from the sense channel.
    fn read_sense_raw(&mut self) -> u16;

    fn start_duty_timer(&mut self);
    fn stop_duty_timer(&mut self);
    fn start_sample_timer(&mut self);
    fn stop_sample_timer(&mut self);
}

// ───────────────────────────────────────────────────────────────
// PM sensor byte stream
// ───────────────────────────────────────────────────────────────

/// Non-blocking read side of the PM sensor UART.
pub trait UartPort {
    /// Bytes currently buffered and readable without blocking.
    fn available(&mut self) -> usize;

    /// Read up to `buf.len()` bytes; returns the count actually read.
    fn read(&mut self, buf: &mut [u8]) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / display / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits payload-free [`AppEvent`](super::events::AppEvent)
/// notifications through this port.  Consumers re-read state via the
/// service accessors; the event only says *that* something changed.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic uptime source (warm-up gating, refresh throttling).
pub trait TimePort {
    fn uptime_secs(&self) -> f64;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting. Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped —
/// a zero duty divisor would otherwise take down the acquisition core at
/// the next boot.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

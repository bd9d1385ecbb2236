//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, refresh the display,
//! wake a future telemetry uplink.
//!
//! Deliberately payload-free: a consumer that cares about the new value
//! re-reads it through the service accessors, so a slow consumer can never
//! hold a stale copy of the readout.

/// Notifications emitted by the sensing core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// A full-power batch produced a valid methane reading.
    MethaneAvailable,

    /// A low-power batch produced a valid CO reading.
    CoAvailable,

    /// The gas acquisition subsystem was switched off (externally or by
    /// the sensor-disconnected fault policy).
    GasDisabled,

    /// A PM frame passed magic + checksum validation.
    PmFrame,
}

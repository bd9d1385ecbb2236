//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every notification to the logger
//! (UART / USB-CDC in production). The display path consumes the same
//! events directly in the main loop; a future MQTT uplink would be
//! another implementation of the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::MethaneAvailable => info!("EVENT | methane reading available"),
            AppEvent::CoAvailable => info!("EVENT | CO reading available"),
            AppEvent::GasDisabled => info!("EVENT | gas acquisition disabled"),
            AppEvent::PmFrame => info!("EVENT | PM frame received"),
        }
    }
}

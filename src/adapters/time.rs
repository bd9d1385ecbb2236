//! Monotonic uptime adapter.
//!
//! - **`target_os = "espidf"`** — wraps `esp_timer_get_time()` (the
//!   high-resolution timer, microsecond precision, monotonic).
//! - **host** — `std::time::Instant` for tests and simulation.

use crate::app::ports::TimePort;

pub struct UptimeClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl UptimeClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since adapter creation (host builds).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for UptimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimePort for UptimeClock {
    fn uptime_secs(&self) -> f64 {
        self.uptime_us() as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_is_monotonic() {
        let clock = UptimeClock::new();
        let a = clock.uptime_secs();
        let b = clock.uptime_secs();
        assert!(b >= a);
        assert!(a >= 0.0);
    }
}

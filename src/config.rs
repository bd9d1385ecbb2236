//! System configuration parameters
//!
//! All tunable parameters for the AirSense node.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- MQ gas acquisition ---
    /// Low-power job heater duty numerator (heater ON ticks per `div`).
    pub mq_low_mult: u16,
    /// Low-power job heater duty denominator.
    pub mq_low_div: u16,
    /// Alternate between the full-power and low-power jobs every cycle
    /// (MQ9-style CO/methane dual measurement). Off = fixed single job,
    /// for bench calibration.
    pub mq_dual_mode: bool,

    // --- PM sensor ---
    /// Seconds after boot before frames enter the averaging buffer.
    pub pm_warmup_secs: f32,
    /// Plantower UART baud rate.
    pub pm_uart_baud: u32,
    /// Points for the displayed moving average (~5 min of ~1 Hz frames).
    pub pm_average_points: usize,

    // --- Display ---
    /// Minimum spacing between two display refreshes (milliseconds).
    pub display_min_interval_ms: u32,
    /// Gas readings at or above this render as "OVR".
    pub display_overshoot: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // MQ9 datasheet low-power phase: 1.5 V from a 5 V supply
            mq_low_mult: 14,
            mq_low_div: 50,
            mq_dual_mode: true,

            // PM sensor
            pm_warmup_secs: 30.0,
            pm_uart_baud: 9600,
            pm_average_points: 321,

            // Display
            display_min_interval_ms: 33, // ~30 fps cap
            display_overshoot: 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.mq_low_div > 0);
        assert!(c.mq_low_mult <= c.mq_low_div);
        assert!(c.pm_warmup_secs > 0.0);
        assert!(c.pm_uart_baud > 0);
        assert!(c.pm_average_points > 0);
        assert!(c.display_min_interval_ms > 0);
        assert!(c.display_overshoot > 0.0);
    }

    #[test]
    fn default_low_job_is_duty_cycled() {
        // mult == div would make the "low power" job a second full-power
        // job and break the CO/methane alternation.
        let c = SystemConfig::default();
        assert!(c.mq_low_mult < c.mq_low_div);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.mq_low_mult, c2.mq_low_mult);
        assert_eq!(c.mq_low_div, c2.mq_low_div);
        assert_eq!(c.pm_average_points, c2.pm_average_points);
        assert!((c.pm_warmup_secs - c2.pm_warmup_secs).abs() < 0.001);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.mq_low_div, c2.mq_low_div);
        assert_eq!(c.mq_dual_mode, c2.mq_dual_mode);
        assert!((c.display_overshoot - c2.display_overshoot).abs() < 0.001);
    }
}

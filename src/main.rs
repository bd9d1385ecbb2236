//! AirSense Firmware — Main Entry Point
//!
//! Event-driven cooperative execution: timer callbacks and the UART poll
//! only push events; every state transition runs to completion on this
//! task.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        LogEventSink    NvsAdapter   Uptime-   │
//! │  (MqHardware+UartPort)  (EventSink)     (ConfigPort) Clock     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  MQ duty-cycle acquisition · PM pipeline · readout     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Display (FrameBuffer render → SSD1306 flush) · Watchdog       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod error;
mod events;
mod pins;

pub mod app;
mod adapters;
mod drivers;
mod sensors;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::hardware::HardwareAdapter;
use adapters::log_sink::LogEventSink;
use adapters::nvs::NvsAdapter;
use adapters::time::UptimeClock;
use app::ports::{ConfigPort, TimePort, UartPort};
use app::service::AppService;
use config::SystemConfig;
use drivers::display::{self, FrameBuffer, ReadoutView, RefreshGate, ScreensaverOffset};
use drivers::watchdog::Watchdog;
use drivers::{oled, uart};
use events::{drain_events, push_event, Event};
use sensors::pm::{Channel, FRAME_LEN};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("AirSense v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Config from NVS (defaults on any failure) ──────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("NVS init failed ({}), no persistence this session", e);
            None
        }
    };
    let config = match &nvs {
        Some(n) => match n.load() {
            Ok(cfg) => {
                info!("config loaded from NVS");
                cfg
            }
            Err(e) => {
                warn!("NVS config load failed ({}), using defaults", e);
                SystemConfig::default()
            }
        },
        None => SystemConfig::default(),
    };

    // ── 3. Peripherals ────────────────────────────────────────
    let clock = UptimeClock::new();
    let watchdog = Watchdog::new(10_000);
    let mut hw = HardwareAdapter::new();
    let mut sink = LogEventSink::new();

    if let Err(e) = uart::init(
        pins::PM_UART_NUM,
        pins::PM_UART_RX_GPIO,
        pins::PM_UART_TX_GPIO,
        config.pm_uart_baud,
    ) {
        warn!("PM UART unavailable: {}", e);
    }

    let mut framebuffer = FrameBuffer::new();
    let display_ok = match oled::init(pins::OLED_SDA_GPIO, pins::OLED_SCL_GPIO) {
        Ok(()) => true,
        Err(e) => {
            warn!("OLED unavailable: {}", e);
            false
        }
    };

    // ── 4. Sensing core ───────────────────────────────────────
    let mut service = AppService::new(config.clone());
    service.set_state_banner("warmup");
    service.mq_enable(pins::MQ_POWER_GPIO, pins::MQ_SENSE_GPIO, &mut hw);

    let mut offset = ScreensaverOffset::new();
    let mut gate = RefreshGate::new(config.display_min_interval_ms);
    let mut last_offset_walk = 0.0_f64;
    let avg_points = config.pm_average_points;

    info!("system ready, entering event loop");

    // ── 5. Event loop ─────────────────────────────────────────
    loop {
        let mut dirty = false;

        drain_events(|event| match event {
            Event::MqDutyTick => {
                if service.on_duty_tick(&mut hw) {
                    // Deferred: the batch starts on a later drain pass,
                    // never from inside the tick cascade.
                    push_event(Event::MqWindowStart);
                }
            }

            Event::MqWindowStart => service.on_window_start(&mut hw),

            Event::MqSampleTick => {
                if service.on_sample_tick(&mut hw, &mut sink) {
                    dirty = true;
                }
            }

            Event::PmUartData => {
                let uptime = clock.uptime_secs();
                if service.on_pm_data(&mut hw, uptime, &mut sink) > 0 {
                    dirty = true;
                }
            }

            Event::DisplayRefresh => dirty = true,
        });

        // UART poll: raise the data event once a full frame is buffered.
        if UartPort::available(&mut hw) >= FRAME_LEN {
            push_event(Event::PmUartData);
        }

        let now = clock.uptime_secs();

        // 1 Hz screensaver pixel walk.
        if now - last_offset_walk >= 1.0 {
            offset.advance();
            last_offset_walk = now;
        }

        // Drop the boot banner once the PM averaging gate opens.
        if service.state_banner() == "warmup" && now >= f64::from(config.pm_warmup_secs) {
            service.set_state_banner("");
            dirty = true;
        }

        // ── Display refresh (throttled) ───────────────────────
        if dirty && display_ok {
            if gate.try_pass(now) {
                let view = ReadoutView {
                    banner: service.state_banner(),
                    gas_enabled: service.mq_enabled(),
                    frame: service.last_pm_frame(),
                    gas_value: service.gas_value(),
                    overshoot: config.display_overshoot,
                    averages: [
                        service.pm_average(Channel::Pm1_0, avg_points).unwrap_or(None),
                        service.pm_average(Channel::Pm2_5, avg_points).unwrap_or(None),
                        service.pm_average(Channel::Pm10, avg_points).unwrap_or(None),
                    ],
                };
                display::render(&mut framebuffer, &view, &offset).ok();
                if let Err(e) = oled::flush(&framebuffer) {
                    warn!("display: {}", e);
                }
            } else {
                // Too soon — retry on a later pass.
                push_event(Event::DisplayRefresh);
            }
        }

        watchdog.feed();

        // Yield one FreeRTOS tick so the idle task runs; queued events
        // batch-drain on the next pass.
        unsafe {
            esp_idf_svc::sys::vTaskDelay(1);
        }
    }
}

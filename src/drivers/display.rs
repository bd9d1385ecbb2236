//! Composite readout rendering for the 128x64 monochrome OLED.
//!
//! Draws the PM columns (instantaneous + moving average), the gas column,
//! and the particle-count rows onto any `embedded-graphics` draw target —
//! the real panel is a [`FrameBuffer`] flushed over I2C by
//! [`crate::drivers::oled`], tests draw into the same buffer directly.
//!
//! ```text
//! ┌────────────────────────────────┐
//! │ banner  PM1   2.5   10    CO   │  header
//! │          12    18    21   140  │  instantaneous
//! │ ~       11.8  17.5  20.9       │  5-min average
//! │          particles, um         │
//! │ 0.3   0.5    1    2.5   5  10  │
//! │ 1020  512  203    80   12   3  │
//! └────────────────────────────────┘
//! ```
//!
//! The whole layout shifts by a slowly walking pixel offset so a static
//! scene cannot burn into the panel.

use core::fmt::Write as _;

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_4X6, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::Text,
};
use heapless::String;

use crate::sensors::pm::PmFrame;

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 64;

/// Column pitch for the four value columns.
const COLUMN_STEP: i32 = 26;

// ---------------------------------------------------------------------------
// Screensaver offset
// ---------------------------------------------------------------------------

/// Slow pixel walk: x runs 0..=6, then y advances 0..=2.
#[derive(Debug, Default)]
pub struct ScreensaverOffset {
    x: i32,
    y: i32,
}

impl ScreensaverOffset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one step; called at 1 Hz.
    pub fn advance(&mut self) {
        self.x += 1;
        if self.x > 6 {
            self.x = 0;
            self.y += 1;
            if self.y > 2 {
                self.y = 0;
            }
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }
}

// ---------------------------------------------------------------------------
// Refresh throttle
// ---------------------------------------------------------------------------

/// Caps the refresh rate. A refused refresh is retried by the caller via
/// a deferred [`Event::DisplayRefresh`](crate::events::Event::DisplayRefresh).
#[derive(Debug)]
pub struct RefreshGate {
    min_interval_secs: f64,
    last: Option<f64>,
}

impl RefreshGate {
    pub fn new(min_interval_ms: u32) -> Self {
        Self {
            min_interval_secs: f64::from(min_interval_ms) / 1000.0,
            last: None,
        }
    }

    /// `true` = refresh now (recorded); `false` = too soon, defer.
    pub fn try_pass(&mut self, now_secs: f64) -> bool {
        if let Some(last) = self.last {
            if now_secs - last < self.min_interval_secs {
                return false;
            }
        }
        self.last = Some(now_secs);
        true
    }
}

// ---------------------------------------------------------------------------
// Cell formatting
// ---------------------------------------------------------------------------

/// Gas column cell: empty while invalid, "OVR" at the overshoot threshold.
pub fn format_gas_cell(value: Option<f64>, overshoot: f64) -> String<8> {
    let mut s = String::new();
    match value {
        None => {}
        Some(v) if v >= overshoot => {
            s.push_str("OVR").ok();
        }
        Some(v) => {
            write!(s, "{:.0}", v).ok();
        }
    }
    s
}

/// Moving-average cell. The "no data" sentinel renders literally — the
/// -1.0 tells a bench operator the averaging buffer is still warming up.
pub fn format_avg_cell(avg: Option<f64>) -> String<8> {
    let mut s = String::new();
    match avg {
        Some(v) => {
            write!(s, "{:.1}", v).ok();
        }
        None => {
            s.push_str("-1.0").ok();
        }
    }
    s
}

fn format_u16(value: u16) -> String<8> {
    let mut s = String::new();
    write!(s, "{}", value).ok();
    s
}

// ---------------------------------------------------------------------------
// Layout rendering
// ---------------------------------------------------------------------------

/// Everything one repaint needs, pulled from the service accessors.
pub struct ReadoutView<'a> {
    pub banner: &'a str,
    /// Adds the CO column header while gas acquisition runs.
    pub gas_enabled: bool,
    pub frame: Option<&'a PmFrame>,
    pub gas_value: Option<f64>,
    pub overshoot: f64,
    /// PM1.0 / PM2.5 / PM10 moving averages.
    pub averages: [Option<f64>; 3],
}

fn text<D>(
    target: &mut D,
    s: &str,
    x: i32,
    y: i32,
    style: MonoTextStyle<'_, BinaryColor>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Text::new(s, Point::new(x, y), style).draw(target)?;
    Ok(())
}

/// Repaint the whole readout.
pub fn render<D>(
    target: &mut D,
    view: &ReadoutView<'_>,
    offset: &ScreensaverOffset,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    let font = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let small = MonoTextStyle::new(&FONT_4X6, BinaryColor::On);
    let x = offset.x();
    let y = offset.y();

    text(target, view.banner, x, y + 10, font)?;

    let Some(frame) = view.frame else {
        // Nothing received yet — banner only.
        return Ok(());
    };

    // Header row.
    text(target, "PM1", x + COLUMN_STEP, y + 10, font)?;
    text(target, "2.5", x + COLUMN_STEP * 2, y + 10, font)?;
    text(target, "10", x + COLUMN_STEP * 3, y + 10, font)?;
    if view.gas_enabled {
        text(target, "CO", x + COLUMN_STEP * 4, y + 10, font)?;
    }

    // Instantaneous values from the last raw frame.
    text(target, &format_u16(frame.atm_pm1_0), x + COLUMN_STEP, y + 22, font)?;
    text(target, &format_u16(frame.atm_pm2_5), x + COLUMN_STEP * 2, y + 22, font)?;
    text(target, &format_u16(frame.atm_pm10), x + COLUMN_STEP * 3, y + 22, font)?;
    let gas = format_gas_cell(view.gas_value, view.overshoot);
    if !gas.is_empty() {
        text(target, &gas, x + COLUMN_STEP * 4, y + 22, font)?;
    }

    // Moving averages.
    text(target, "~", x, y + 32, font)?;
    for (i, avg) in view.averages.iter().enumerate() {
        let cell = format_avg_cell(*avg);
        text(target, &cell, x + COLUMN_STEP * (i as i32 + 1), y + 32, font)?;
    }

    // Particle-count bins.
    text(target, "particles, um", x + 27, y + 40, small)?;
    for (caption, cx) in [("0.3", 0), ("0.5", 28), ("1", 56), ("2.5", 73), ("5", 100), ("10", 110)]
    {
        text(target, caption, x + cx, y + 48, small)?;
    }
    let bins = [
        (frame.particles_0_3um, 0),
        (frame.particles_0_5um, 28),
        (frame.particles_1_0um, 56),
        (frame.particles_2_5um, 76),
        (frame.particles_5_0um, 96),
        (frame.particles_10um, 116),
    ];
    for (value, cx) in bins {
        text(target, &format_u16(value), x + cx, y + 58, small)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// 1-bpp frame buffer (SSD1306 page layout)
// ---------------------------------------------------------------------------

const PAGES: usize = HEIGHT as usize / 8;

/// In-memory panel image: each byte holds 8 vertically stacked pixels,
/// matching the SSD1306 horizontal addressing mode so the whole buffer
/// streams out in one I2C transfer.
pub struct FrameBuffer {
    pixels: [u8; WIDTH as usize * PAGES],
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: [0; WIDTH as usize * PAGES],
        }
    }

    /// Raw page-major pixel data for the panel transfer.
    pub fn data(&self) -> &[u8] {
        &self.pixels
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Clip silently: the screensaver offset pushes the right
            // column past the edge by design.
            if (0..WIDTH as i32).contains(&point.x) && (0..HEIGHT as i32).contains(&point.y) {
                let index = (point.y as usize / 8) * WIDTH as usize + point.x as usize;
                let mask = 1u8 << (point.y as usize % 8);
                if color == BinaryColor::On {
                    self.pixels[index] |= mask;
                } else {
                    self.pixels[index] &= !mask;
                }
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

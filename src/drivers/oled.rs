//! SSD1306 panel transport over I2C.
//!
//! Pixel generation lives in [`crate::drivers::display`]; this module only
//! moves a finished [`FrameBuffer`](crate::drivers::display::FrameBuffer)
//! to the panel. Uses the legacy I2C master driver via raw sys calls.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::drivers::display::FrameBuffer;

/// Panel I2C address (0x3C for most 128x64 modules).
#[cfg(target_os = "espidf")]
const PANEL_ADDR: u8 = 0x3C;

#[cfg(target_os = "espidf")]
const I2C_PORT: i32 = 0;

#[cfg(target_os = "espidf")]
const I2C_TIMEOUT_TICKS: u32 = 100;

/// Control byte prefixes per the SSD1306 datasheet.
#[cfg(target_os = "espidf")]
const CTRL_COMMAND: u8 = 0x00;
#[cfg(target_os = "espidf")]
const CTRL_DATA: u8 = 0x40;

/// Errors bringing up or driving the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OledError {
    BusConfigFailed(i32),
    WriteFailed(i32),
}

impl core::fmt::Display for OledError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BusConfigFailed(rc) => write!(f, "I2C bus config failed (rc={})", rc),
            Self::WriteFailed(rc) => write!(f, "panel write failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
fn write_panel(payload: &[u8]) -> Result<(), OledError> {
    // SAFETY: payload pointer/len describe a valid readable region; the
    // bus was installed in init().
    let ret = unsafe {
        i2c_master_write_to_device(
            I2C_PORT,
            PANEL_ADDR,
            payload.as_ptr(),
            payload.len(),
            I2C_TIMEOUT_TICKS,
        )
    };
    if ret != ESP_OK {
        return Err(OledError::WriteFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
fn command(bytes: &[u8]) -> Result<(), OledError> {
    let mut payload = [0u8; 8];
    payload[0] = CTRL_COMMAND;
    payload[1..=bytes.len()].copy_from_slice(bytes);
    write_panel(&payload[..=bytes.len()])
}

/// Install the I2C bus and run the panel init sequence.
#[cfg(target_os = "espidf")]
pub fn init(sda_gpio: i32, scl_gpio: i32) -> Result<(), OledError> {
    let config = i2c_config_t {
        mode: i2c_mode_t_I2C_MODE_MASTER,
        sda_io_num: sda_gpio,
        scl_io_num: scl_gpio,
        sda_pullup_en: true,
        scl_pullup_en: true,
        __bindgen_anon_1: i2c_config_t__bindgen_ty_1 {
            master: i2c_config_t__bindgen_ty_1__bindgen_ty_1 { clk_speed: 400_000 },
        },
        ..Default::default()
    };

    // SAFETY: called once from the single main task before the event loop.
    unsafe {
        let ret = i2c_param_config(I2C_PORT, &config);
        if ret != ESP_OK {
            return Err(OledError::BusConfigFailed(ret));
        }
        let ret = i2c_driver_install(I2C_PORT, i2c_mode_t_I2C_MODE_MASTER, 0, 0, 0);
        if ret != ESP_OK {
            return Err(OledError::BusConfigFailed(ret));
        }
    }

    // Standard 128x64 charge-pump init sequence.
    for cmd in [
        &[0xAEu8][..],      // display off
        &[0xD5, 0x80],      // clock divide
        &[0xA8, 0x3F],      // multiplex 64
        &[0xD3, 0x00],      // no display offset
        &[0x40],            // start line 0
        &[0x8D, 0x14],      // charge pump on
        &[0x20, 0x00],      // horizontal addressing
        &[0xA1],            // segment remap
        &[0xC8],            // COM scan direction
        &[0xDA, 0x12],      // COM pins
        &[0x81, 0xCF],      // contrast
        &[0xD9, 0xF1],      // precharge
        &[0xDB, 0x40],      // VCOM detect
        &[0xA4],            // resume from RAM
        &[0xA6],            // normal (non-inverted)
        &[0xAF],            // display on
    ] {
        command(cmd)?;
    }
    info!("oled: panel initialised (SDA={}, SCL={})", sda_gpio, scl_gpio);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init(_sda_gpio: i32, _scl_gpio: i32) -> Result<(), OledError> {
    log::info!("oled(sim): panel init skipped");
    Ok(())
}

/// Stream the whole frame buffer to the panel.
#[cfg(target_os = "espidf")]
pub fn flush(buffer: &FrameBuffer) -> Result<(), OledError> {
    command(&[0x21, 0, 0x7F])?; // column range
    command(&[0x22, 0, 0x07])?; // page range

    let data = buffer.data();
    let mut payload = Vec::with_capacity(data.len() + 1);
    payload.push(CTRL_DATA);
    payload.extend_from_slice(data);
    write_panel(&payload)
}

#[cfg(not(target_os = "espidf"))]
pub fn flush(_buffer: &FrameBuffer) -> Result<(), OledError> {
    Ok(())
}

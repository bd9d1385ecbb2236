//! UART device for the Plantower PM sensor link.
//!
//! The sensor pushes one 32-byte frame roughly every 0.9 s at
//! 9600-8N1; nothing is ever written to it in active mode. The driver
//! installs the ESP-IDF UART driver with an RX ring buffer and exposes
//! non-blocking reads; the main loop polls the buffered length once per
//! pass and raises [`Event::PmUartData`] when a full frame is waiting.
//!
//! [`Event::PmUartData`]: crate::events::Event::PmUartData

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// RX ring buffer: a handful of frames of slack.
#[cfg(target_os = "espidf")]
const RX_BUFFER_SIZE: i32 = 512;

/// Errors installing the UART device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartInitError {
    ParamConfigFailed(i32),
    PinAssignFailed(i32),
    DriverInstallFailed(i32),
}

impl core::fmt::Display for UartInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ParamConfigFailed(rc) => write!(f, "UART param config failed (rc={})", rc),
            Self::PinAssignFailed(rc) => write!(f, "UART pin assignment failed (rc={})", rc),
            Self::DriverInstallFailed(rc) => write!(f, "UART driver install failed (rc={})", rc),
        }
    }
}

/// Install and configure the PM sensor UART (8 data bits, no parity,
/// one stop bit).
#[cfg(target_os = "espidf")]
pub fn init(uart_num: i32, rx_gpio: i32, tx_gpio: i32, baud: u32) -> Result<(), UartInitError> {
    let config = uart_config_t {
        baud_rate: baud as i32,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };

    // SAFETY: called once from the single main task before the event loop.
    unsafe {
        let ret = uart_param_config(uart_num, &config);
        if ret != ESP_OK {
            return Err(UartInitError::ParamConfigFailed(ret));
        }
        let ret = uart_set_pin(
            uart_num,
            tx_gpio,
            rx_gpio,
            UART_PIN_NO_CHANGE,
            UART_PIN_NO_CHANGE,
        );
        if ret != ESP_OK {
            return Err(UartInitError::PinAssignFailed(ret));
        }
        let ret = uart_driver_install(uart_num, RX_BUFFER_SIZE, 0, 0, core::ptr::null_mut(), 0);
        if ret != ESP_OK {
            return Err(UartInitError::DriverInstallFailed(ret));
        }
    }
    info!("uart: PM sensor on UART{} @ {} baud", uart_num, baud);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init(_uart_num: i32, _rx_gpio: i32, _tx_gpio: i32, baud: u32) -> Result<(), UartInitError> {
    log::info!("uart(sim): PM sensor device @ {} baud", baud);
    Ok(())
}

/// Bytes currently buffered, readable without blocking.
#[cfg(target_os = "espidf")]
pub fn available(uart_num: i32) -> usize {
    let mut len: usize = 0;
    // SAFETY: driver installed in init(); main-task only.
    let ret = unsafe { uart_get_buffered_data_len(uart_num, &mut len) };
    if ret == ESP_OK { len } else { 0 }
}

#[cfg(not(target_os = "espidf"))]
pub fn available(_uart_num: i32) -> usize {
    0
}

/// Non-blocking read of up to `buf.len()` bytes.
#[cfg(target_os = "espidf")]
pub fn read(uart_num: i32, buf: &mut [u8]) -> usize {
    // SAFETY: buf pointer/len describe a valid writable region; zero
    // timeout keeps the call non-blocking.
    let got = unsafe {
        uart_read_bytes(
            uart_num,
            buf.as_mut_ptr().cast(),
            buf.len() as u32,
            0,
        )
    };
    if got < 0 { 0 } else { got as usize }
}

#[cfg(not(target_os = "espidf"))]
pub fn read(_uart_num: i32, _buf: &mut [u8]) -> usize {
    0
}

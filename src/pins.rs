//! Pin assignments for the AirSense board (ESP32-WROOM-32 module).
//!
//! Centralised so the hardware adapter, drivers, and main wiring agree
//! on the physical layout. ADC-capable pins must stay on ADC1 — ADC2 is
//! unusable while Wi-Fi is active.

/// MQ sensor heater supply switch (via NPN driver).
pub const MQ_POWER_GPIO: i32 = 27;

/// MQ sensor analog output. GPIO34 is input-only, ADC1 channel 6.
pub const MQ_SENSE_GPIO: i32 = 34;

/// Plantower PM sensor TX -> board RX.
pub const PM_UART_RX_GPIO: i32 = 16;

/// Plantower PM sensor RX -> board TX (unused by the read-only protocol,
/// still routed for firmware-commanded sleep modes).
pub const PM_UART_TX_GPIO: i32 = 17;

/// UART peripheral number for the PM sensor link.
pub const PM_UART_NUM: i32 = 2;

/// SSD1306 OLED I2C bus.
pub const OLED_SDA_GPIO: i32 = 21;
pub const OLED_SCL_GPIO: i32 = 22;

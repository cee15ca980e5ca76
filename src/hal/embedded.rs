//! Adapters from the `embedded-hal`/`embedded-io` ecosystem traits.
//!
//! Board support crates expose their UARTs and GPIOs through these traits;
//! wrapping them here is all it takes to plug them into a [`Board`].
//!
//! | Adapter | Wraps | Implements |
//! |---------|-------|------------|
//! | [`IoSerial`] | `embedded_io::{Read, ReadReady, Write}` | [`SerialPort`] |
//! | [`PinLed`] | `embedded_hal::digital::OutputPin` | [`StatusLed`] |
//!
//! [`Board`]: crate::traits::Board

use embedded_hal::digital::{OutputPin, PinState};
use embedded_io::{Read, ReadReady, Write};

use crate::traits::{SerialPort, StatusLed};

/// [`SerialPort`] on top of a non-blocking `embedded-io` UART.
///
/// Reads only when the UART reports data ready, so `read_byte` never
/// blocks. I/O errors are logged and treated as "no data"; a lost command
/// is recovered by the protocol engine's timeout.
pub struct IoSerial<T> {
    uart: T,
}

impl<T: Read + ReadReady + Write> IoSerial<T> {
    /// Wraps a UART.
    pub fn new(uart: T) -> Self {
        Self { uart }
    }

    /// Returns the wrapped UART.
    pub fn into_inner(self) -> T {
        self.uart
    }
}

impl<T: Read + ReadReady + Write> SerialPort for IoSerial<T> {
    fn read_byte(&mut self) -> Option<u8> {
        match self.uart.read_ready() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(_) => {
                warn!("uart read_ready failed");
                return None;
            }
        }

        let mut byte = [0u8; 1];
        match self.uart.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            Ok(_) => None,
            Err(_) => {
                warn!("uart read failed");
                None
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.uart.write_all(bytes).is_err() {
            warn!("uart write of {=usize} bytes failed", bytes.len());
        }
    }
}

/// [`StatusLed`] on a GPIO output; the LED is on when the pin is high.
pub struct PinLed<P> {
    pin: P,
}

impl<P: OutputPin> PinLed<P> {
    /// Wraps an output pin.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> StatusLed for PinLed<P> {
    fn set(&mut self, on: bool) {
        if self.pin.set_state(PinState::from(on)).is_err() {
            warn!("status led pin write failed");
        }
    }
}

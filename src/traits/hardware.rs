//! Hardware abstraction traits for the serial link, the control panel and timing.
//!
//! This module defines the hardware interfaces that allow mrkt to work
//! across different platforms (microcontroller boards, desktop mocks, the
//! host simulator).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`SerialPort`] | Byte link to the Grbl controller |
//! | [`ControlPanel`] | Keypad ladder, mode/encoder buttons, encoder counter |
//! | [`StatusLed`] | Main status LED |
//! | [`Clock`] | Time source for `no_std` environments |
//! | [`Board`] | Associated-type bundle of one hardware set |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For real peripherals implementing the
//! `embedded-hal`/`embedded-io` traits, use the adapters from
//! `hal::embedded` (requires the `embedded` feature).
//!
//! # Example
//!
//! ```rust
//! use mrkt::traits::SerialPort;
//! use mrkt::hal::MockSerial;
//!
//! let mut serial = MockSerial::new();
//! serial.write(b"$I\r");
//! assert_eq!(serial.sent(), b"$I\r");
//!
//! serial.feed(b"ok\r");
//! assert_eq!(serial.read_byte(), Some(b'o'));
//! ```

use crate::traits::CharacterDisplay;

/// Non-blocking serial link to the motion controller.
///
/// Implementations must never block: [`read_byte`](Self::read_byte)
/// returns `None` when nothing has been received yet, and
/// [`write`](Self::write) is expected to hand bytes to a transmit buffer
/// or a short busy-wait UART.
///
/// # Implementation Notes
///
/// - Write failures are the implementation's problem; the protocol engine
///   recovers from a lost command through its response timeout.
/// - `discard_input` is used before a command is sent and after an
///   exchange ends, to drop stray bytes.
pub trait SerialPort {
    /// Returns the next received byte, if one is available.
    fn read_byte(&mut self) -> Option<u8>;

    /// Transmits all of `bytes`.
    fn write(&mut self, bytes: &[u8]);

    /// Drops everything currently waiting in the receive buffer.
    ///
    /// The default implementation reads until [`read_byte`](Self::read_byte)
    /// reports an empty buffer.
    fn discard_input(&mut self) {
        while self.read_byte().is_some() {}
    }
}

/// The operator's physical controls.
///
/// The keypad shield reports its five buttons through a single resistor
/// ladder on one analog channel, and the mode and encoder push buttons share
/// a second channel. The rotary encoder is read as a raw incremental
/// counter (typically interrupt driven).
///
/// Each method is called exactly once per input pipeline tick.
pub trait ControlPanel {
    /// Raw level of the keypad ladder channel (10-bit ADC scale).
    fn keypad_level(&mut self) -> u16;

    /// Raw level of the mode/encoder button channel (10-bit ADC scale).
    fn button_level(&mut self) -> u16;

    /// Raw encoder counter. Positive values are one rotation direction,
    /// negative values the other; the step size is applied by the caller.
    fn encoder_position(&mut self) -> i32;
}

/// The single binary status LED next to the display.
pub trait StatusLed {
    /// Switches the LED on or off.
    fn set(&mut self, on: bool);
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for timeouts, display delays
/// and LED blinking. On desktop, this can wrap `std::time::Instant`. On
/// embedded, use a hardware timer.
///
/// # Example
///
/// ```rust
/// use mrkt::traits::Clock;
/// use mrkt::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

/// One concrete set of hardware.
///
/// The supervisor and the modes are generic over a single `Board` instead
/// of one type parameter per peripheral.
///
/// # Example
///
/// ```rust
/// use mrkt::traits::Board;
/// use mrkt::hal::{MockBoard, MockSerial};
///
/// fn serial_of<B: Board>(_: &B::Serial) {}
/// serial_of::<MockBoard>(&MockSerial::new());
/// ```
pub trait Board {
    /// Serial link to the motion controller.
    type Serial: SerialPort;
    /// Buttons and rotary encoder.
    type Panel: ControlPanel;
    /// 16x2 character display.
    type Display: CharacterDisplay;
    /// Main status LED.
    type Led: StatusLed;
    /// Millisecond time source.
    type Clock: Clock;
}

/// Owned instances of every peripheral of a [`Board`].
///
/// Handed to [`ModeController::new`](crate::ModeController::new), which
/// keeps them for the lifetime of the program.
pub struct Peripherals<B: Board> {
    /// Serial link to the motion controller.
    pub serial: B::Serial,
    /// Buttons and rotary encoder.
    pub panel: B::Panel,
    /// Character display.
    pub display: B::Display,
    /// Main status LED.
    pub led: B::Led,
    /// Time source.
    pub clock: B::Clock,
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // SerialPort Default Methods Tests
    // =========================================================================

    struct TestSerial {
        rx: [u8; 4],
        pos: usize,
        reads: usize,
    }

    impl SerialPort for TestSerial {
        fn read_byte(&mut self) -> Option<u8> {
            self.reads += 1;
            let byte = self.rx.get(self.pos).copied();
            if byte.is_some() {
                self.pos += 1;
            }
            byte
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    #[test]
    fn serial_discard_input_default_impl() {
        let mut serial = TestSerial {
            rx: *b"ok\r\n",
            pos: 0,
            reads: 0,
        };

        serial.discard_input();

        assert_eq!(serial.pos, 4);
        // Four bytes plus the read that found the buffer empty
        assert_eq!(serial.reads, 5);
        assert_eq!(serial.read_byte(), None);
    }

    #[test]
    fn serial_discard_input_on_empty_port() {
        let mut serial = TestSerial {
            rx: [0; 4],
            pos: 4,
            reads: 0,
        };

        serial.discard_input();
        assert_eq!(serial.reads, 1);
    }
}

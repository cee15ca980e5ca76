//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware traits, enabling
//! development and testing on desktop without a Grbl controller or a
//! keypad shield. Every mock is backed by fixed-capacity `heapless`
//! storage, so they are available in `no_std` builds as well.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockSerial`] | [`SerialPort`] | Scripted input, captured output |
//! | [`MockPanel`] | [`ControlPanel`] | Settable ADC levels and encoder counter |
//! | [`MockDisplay`] | [`CharacterDisplay`] | 16x2 character grid |
//! | [`MockLed`] | [`StatusLed`] | Tracks state and toggles |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockBoard`] | [`Board`] | Bundles all of the above |
//!
//! # Example
//!
//! ```rust
//! use mrkt::{Config, ModeController, ModeKind};
//! use mrkt::hal::MockBoard;
//!
//! let mut controller: ModeController<MockBoard> =
//!     ModeController::new(Config::default(), MockBoard::peripherals());
//!
//! controller.tick();
//! assert_eq!(controller.current_mode(), ModeKind::Initialization);
//! assert_eq!(controller.display().line(0).as_str(), "Mrkt 0.1.0      ");
//! ```

use heapless::{Deque, String, Vec};

use crate::traits::{
    Board, CharacterDisplay, Clock, ControlPanel, Glyph, Peripherals, SerialPort, StatusLed,
    DISPLAY_COLUMNS, DISPLAY_ROWS,
};

/// Receive capacity of [`MockSerial`].
pub const MOCK_SERIAL_RX_SIZE: usize = 512;

/// Transmit capacity of [`MockSerial`].
pub const MOCK_SERIAL_TX_SIZE: usize = 256;

/// ADC level of a channel with no button pressed.
pub const RELEASED_LEVEL: u16 = 1023;

/// Character drawn for every custom glyph in [`MockDisplay::line`].
pub const GLYPH_PLACEHOLDER: char = '~';

const COLUMNS: usize = DISPLAY_COLUMNS as usize;
const ROWS: usize = DISPLAY_ROWS as usize;

// ============================================================================
// Serial
// ============================================================================

/// Mock serial link.
///
/// Bytes passed to [`feed`](Self::feed) are returned by `read_byte` in
/// order; everything written is captured and available via
/// [`sent`](Self::sent). Input beyond [`MOCK_SERIAL_RX_SIZE`] and output
/// beyond [`MOCK_SERIAL_TX_SIZE`] bytes is dropped.
///
/// # Example
///
/// ```rust
/// use mrkt::hal::MockSerial;
/// use mrkt::traits::SerialPort;
///
/// let mut serial = MockSerial::new();
/// serial.feed(b"ok\r");
/// assert_eq!(serial.pending(), 3);
///
/// serial.discard_input();
/// assert_eq!(serial.read_byte(), None);
/// ```
#[derive(Debug, Default)]
pub struct MockSerial {
    rx: Deque<u8, MOCK_SERIAL_RX_SIZE>,
    tx: Vec<u8, MOCK_SERIAL_TX_SIZE>,
    /// Number of `write` calls.
    pub write_count: usize,
}

impl MockSerial {
    /// Creates a link with no pending input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues bytes to be received.
    pub fn feed(&mut self, bytes: &[u8]) {
        for byte in bytes {
            if self.rx.push_back(*byte).is_err() {
                break;
            }
        }
    }

    /// Everything written so far.
    pub fn sent(&self) -> &[u8] {
        &self.tx
    }

    /// Forgets the captured output.
    pub fn clear_sent(&mut self) {
        self.tx.clear();
    }

    /// Number of bytes waiting to be read.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl SerialPort for MockSerial {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.write_count += 1;
        let room = self.tx.capacity() - self.tx.len();
        let _ = self.tx.extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn discard_input(&mut self) {
        self.rx.clear();
    }
}

// ============================================================================
// Control Panel
// ============================================================================

/// Mock control panel.
///
/// Both analog channels start at [`RELEASED_LEVEL`]; set a level inside a
/// band to hold the corresponding button down.
///
/// # Example
///
/// ```rust
/// use mrkt::hal::MockPanel;
/// use mrkt::traits::ControlPanel;
///
/// let mut panel = MockPanel::new();
/// panel.set_keypad_level(100);
/// panel.turn_encoder(4);
/// panel.turn_encoder(-1);
///
/// assert_eq!(panel.keypad_level(), 100);
/// assert_eq!(panel.encoder_position(), 3);
/// ```
#[derive(Debug)]
pub struct MockPanel {
    /// Level returned for the keypad channel.
    pub keypad: u16,
    /// Level returned for the mode/encoder button channel.
    pub buttons: u16,
    /// Raw encoder counter.
    pub encoder: i32,
    /// Number of complete samples taken (keypad reads).
    pub samples: u32,
}

impl MockPanel {
    /// Creates a panel with nothing pressed and the encoder at zero.
    pub fn new() -> Self {
        Self {
            keypad: RELEASED_LEVEL,
            buttons: RELEASED_LEVEL,
            encoder: 0,
            samples: 0,
        }
    }

    /// Sets the keypad channel level.
    pub fn set_keypad_level(&mut self, level: u16) {
        self.keypad = level;
    }

    /// Sets the button channel level.
    pub fn set_button_level(&mut self, level: u16) {
        self.buttons = level;
    }

    /// Releases every button on both channels.
    pub fn release_all(&mut self) {
        self.keypad = RELEASED_LEVEL;
        self.buttons = RELEASED_LEVEL;
    }

    /// Moves the encoder counter by `counts`.
    pub fn turn_encoder(&mut self, counts: i32) {
        self.encoder = self.encoder.wrapping_add(counts);
    }
}

impl Default for MockPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPanel for MockPanel {
    fn keypad_level(&mut self) -> u16 {
        self.samples += 1;
        self.keypad
    }

    fn button_level(&mut self) -> u16 {
        self.buttons
    }

    fn encoder_position(&mut self) -> i32 {
        self.encoder
    }
}

// ============================================================================
// Display
// ============================================================================

/// One cell of the [`MockDisplay`] grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    /// Nothing written since the last clear.
    Blank,
    /// A printable character.
    Char(u8),
    /// A custom glyph.
    Glyph(Glyph),
}

/// Mock 16x2 character display.
///
/// Keeps a grid of cells and a cursor the way an HD44780 does; text past
/// the last column is clipped. [`line`](Self::line) renders a row with
/// blanks as spaces and glyphs as [`GLYPH_PLACEHOLDER`].
///
/// # Example
///
/// ```rust
/// use mrkt::hal::MockDisplay;
/// use mrkt::traits::CharacterDisplay;
///
/// let mut lcd = MockDisplay::new();
/// lcd.print_at(0, 0, "Mrkt 0.1.0");
/// lcd.print_at(12, 1, "ERR");
///
/// assert_eq!(lcd.line(0).as_str(), "Mrkt 0.1.0      ");
/// assert_eq!(lcd.line(1).as_str(), "            ERR ");
/// assert!(lcd.contains("ERR"));
/// ```
#[derive(Debug)]
pub struct MockDisplay {
    cells: [[Cell; COLUMNS]; ROWS],
    cursor: (u8, u8),
    /// Number of `clear` calls.
    pub clear_count: u32,
}

impl MockDisplay {
    /// Creates a blank display with the cursor at the origin.
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Blank; COLUMNS]; ROWS],
            cursor: (0, 0),
            clear_count: 0,
        }
    }

    /// Cell at `col`, `row`. Out-of-range positions read as blank.
    pub fn cell(&self, col: u8, row: u8) -> Cell {
        self.cells
            .get(usize::from(row))
            .and_then(|r| r.get(usize::from(col)))
            .copied()
            .unwrap_or(Cell::Blank)
    }

    /// Current cursor position as `(col, row)`.
    pub fn cursor(&self) -> (u8, u8) {
        self.cursor
    }

    /// Renders one row as text.
    pub fn line(&self, row: u8) -> String<COLUMNS> {
        let mut text = String::new();
        for col in 0..DISPLAY_COLUMNS {
            let c = match self.cell(col, row) {
                Cell::Blank => ' ',
                Cell::Char(b) if b.is_ascii() => char::from(b),
                Cell::Char(_) => '?',
                Cell::Glyph(_) => GLYPH_PLACEHOLDER,
            };
            let _ = text.push(c);
        }
        text
    }

    /// Returns true if either row contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        (0..DISPLAY_ROWS).any(|row| self.line(row).contains(needle))
    }

    fn put(&mut self, cell: Cell) {
        let (col, row) = self.cursor;
        if let Some(slot) = self
            .cells
            .get_mut(usize::from(row))
            .and_then(|r| r.get_mut(usize::from(col)))
        {
            *slot = cell;
        }
        self.cursor.0 = col.saturating_add(1);
    }
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterDisplay for MockDisplay {
    fn clear(&mut self) {
        self.cells = [[Cell::Blank; COLUMNS]; ROWS];
        self.cursor = (0, 0);
        self.clear_count += 1;
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        self.cursor = (col, row);
    }

    fn print(&mut self, text: &str) {
        for byte in text.bytes() {
            self.put(Cell::Char(byte));
        }
    }

    fn write_glyph(&mut self, glyph: Glyph) {
        self.put(Cell::Glyph(glyph));
    }
}

// ============================================================================
// Status LED
// ============================================================================

/// Mock status LED.
#[derive(Debug, Default)]
pub struct MockLed {
    /// Current state.
    pub on: bool,
    /// Number of on/off changes.
    pub toggles: u32,
}

impl MockLed {
    /// Creates an LED that is off.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusLed for MockLed {
    fn set(&mut self, on: bool) {
        if on != self.on {
            self.toggles += 1;
        }
        self.on = on;
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Mock clock for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use mrkt::hal::MockClock;
/// use mrkt::traits::Clock;
///
/// let mut clock = MockClock::new();
/// clock.advance(250);
/// clock.advance(250);
/// assert_eq!(clock.now_ms(), 500);
///
/// clock.set(10_000);
/// assert_eq!(clock.now_ms(), 10_000);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances time by `ms`.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Board
// ============================================================================

/// [`Board`] made of the mocks in this module.
#[derive(Debug)]
pub struct MockBoard;

impl MockBoard {
    /// Fresh instances of every mock peripheral.
    pub fn peripherals() -> Peripherals<MockBoard> {
        Peripherals {
            serial: MockSerial::new(),
            panel: MockPanel::new(),
            display: MockDisplay::new(),
            led: MockLed::new(),
            clock: MockClock::new(),
        }
    }
}

impl Board for MockBoard {
    type Serial = MockSerial;
    type Panel = MockPanel;
    type Display = MockDisplay;
    type Led = MockLed;
    type Clock = MockClock;
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // MockSerial Tests
    // =========================================================================

    #[test]
    fn serial_reads_in_order() {
        let mut serial = MockSerial::new();
        serial.feed(b"ab");
        serial.feed(b"c");
        assert_eq!(serial.read_byte(), Some(b'a'));
        assert_eq!(serial.read_byte(), Some(b'b'));
        assert_eq!(serial.read_byte(), Some(b'c'));
        assert_eq!(serial.read_byte(), None);
    }

    #[test]
    fn serial_captures_writes() {
        let mut serial = MockSerial::new();
        serial.write(b"$I");
        serial.write(b"\r");
        assert_eq!(serial.sent(), b"$I\r");
        assert_eq!(serial.write_count, 2);

        serial.clear_sent();
        assert!(serial.sent().is_empty());
    }

    #[test]
    fn serial_drops_input_beyond_capacity() {
        let mut serial = MockSerial::new();
        serial.feed(&[b'x'; MOCK_SERIAL_RX_SIZE + 10]);
        assert_eq!(serial.pending(), MOCK_SERIAL_RX_SIZE);
    }

    #[test]
    fn serial_truncates_output_beyond_capacity() {
        let mut serial = MockSerial::new();
        serial.write(&[b'y'; MOCK_SERIAL_TX_SIZE - 1]);
        serial.write(b"zz");
        assert_eq!(serial.sent().len(), MOCK_SERIAL_TX_SIZE);
        assert_eq!(serial.sent().last(), Some(&b'z'));
    }

    // =========================================================================
    // MockPanel Tests
    // =========================================================================

    #[test]
    fn panel_starts_released() {
        let mut panel = MockPanel::new();
        assert_eq!(panel.keypad_level(), RELEASED_LEVEL);
        assert_eq!(panel.button_level(), RELEASED_LEVEL);
        assert_eq!(panel.encoder_position(), 0);
        assert_eq!(panel.samples, 1);
    }

    #[test]
    fn panel_release_all() {
        let mut panel = MockPanel::new();
        panel.set_keypad_level(10);
        panel.set_button_level(10);
        panel.release_all();
        assert_eq!(panel.keypad_level(), RELEASED_LEVEL);
        assert_eq!(panel.button_level(), RELEASED_LEVEL);
    }

    // =========================================================================
    // MockDisplay Tests
    // =========================================================================

    #[test]
    fn display_clips_at_last_column() {
        let mut lcd = MockDisplay::new();
        lcd.print_at(14, 0, "abcd");
        assert_eq!(lcd.line(0).as_str(), "              ab");
        assert_eq!(lcd.line(1).as_str(), "                ");
    }

    #[test]
    fn display_clear_resets_grid_and_cursor() {
        let mut lcd = MockDisplay::new();
        lcd.print_at(3, 1, "x");
        lcd.clear();
        assert_eq!(lcd.cursor(), (0, 0));
        assert_eq!(lcd.cell(3, 1), Cell::Blank);
        assert_eq!(lcd.clear_count, 1);
    }

    #[test]
    fn display_renders_glyphs() {
        let mut lcd = MockDisplay::new();
        lcd.print("Grbl ");
        lcd.write_glyph(Glyph::Ellipsis);
        assert_eq!(lcd.cell(5, 0), Cell::Glyph(Glyph::Ellipsis));
        assert!(lcd.line(0).starts_with("Grbl ~"));
    }

    #[test]
    fn display_ignores_rows_out_of_range() {
        let mut lcd = MockDisplay::new();
        lcd.print_at(0, 5, "hidden");
        assert!(!lcd.contains("hidden"));
    }

    // =========================================================================
    // MockLed / MockClock Tests
    // =========================================================================

    #[test]
    fn led_counts_changes_only() {
        let mut led = MockLed::new();
        led.set(false);
        led.set(true);
        led.set(true);
        led.set(false);
        assert!(!led.on);
        assert_eq!(led.toggles, 2);
    }

    #[test]
    fn clock_advances() {
        let mut clock = MockClock::new();
        clock.advance(100);
        clock.advance(50);
        assert_eq!(clock.now_ms(), 150);
    }
}

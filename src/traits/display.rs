//! Display abstraction for the 16x2 character LCD.
//!
//! This module defines the [`CharacterDisplay`] trait implemented by the
//! HD44780-style panel on the keypad shield (or a simulated grid), and the
//! [`Glyph`] set of custom characters the firmware loads into it.

use core::fmt::Write as _;

/// Number of character columns on the display.
pub const DISPLAY_COLUMNS: u8 = 16;

/// Number of character rows on the display.
pub const DISPLAY_ROWS: u8 = 2;

/// Custom characters stored in the display's CGRAM.
///
/// The discriminant is the CGRAM slot the glyph is loaded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Glyph {
    /// "FR" feed rate symbol.
    FeedRate = 0,
    /// Plus/minus sign.
    PlusMinus = 1,
    /// Ellipsis (three dots in one cell).
    Ellipsis = 3,
}

impl Glyph {
    /// All glyphs, in slot order.
    pub const ALL: [Glyph; 3] = [Glyph::FeedRate, Glyph::PlusMinus, Glyph::Ellipsis];

    /// CGRAM slot of this glyph.
    #[inline]
    pub const fn slot(self) -> u8 {
        self as u8
    }

    /// The 5x8 bitmap of this glyph, one row per byte, top row first.
    pub const fn bitmap(self) -> [u8; 8] {
        match self {
            Glyph::FeedRate => [
                0b11100, 0b10000, 0b11000, 0b10110, 0b10101, 0b00110, 0b00101, 0b00101,
            ],
            Glyph::PlusMinus => [
                0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000, 0b11111, 0b00000,
            ],
            Glyph::Ellipsis => [
                0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b10101, 0b00000,
            ],
        }
    }
}

/// Cursor-addressed character display.
///
/// Writes start at the current cursor position and advance it; text past
/// the last column is clipped by the implementation. Drivers are expected
/// to load the [`Glyph`] bitmaps during their own initialisation.
///
/// # Example
///
/// ```rust
/// use mrkt::traits::{CharacterDisplay, Glyph};
/// use mrkt::hal::MockDisplay;
///
/// let mut lcd = MockDisplay::new();
/// lcd.print_at(0, 1, "Grbl");
/// lcd.write_glyph_at(5, 1, Glyph::Ellipsis);
/// lcd.print_number_at(10, 1, -5);
///
/// assert_eq!(lcd.line(1).as_str(), "Grbl ~    -5    ");
/// ```
pub trait CharacterDisplay {
    /// Clears the display and homes the cursor.
    fn clear(&mut self);

    /// Moves the cursor to `col` (0-15) on `row` (0-1).
    fn set_cursor(&mut self, col: u8, row: u8);

    /// Prints text at the cursor.
    fn print(&mut self, text: &str);

    /// Writes a custom glyph at the cursor.
    fn write_glyph(&mut self, glyph: Glyph);

    /// Moves the cursor and prints text.
    fn print_at(&mut self, col: u8, row: u8, text: &str) {
        self.set_cursor(col, row);
        self.print(text);
    }

    /// Prints a signed decimal number at the cursor.
    fn print_number(&mut self, value: i32) {
        let mut digits: heapless::String<12> = heapless::String::new();
        // i32::MIN is 11 characters, so this cannot fail
        let _ = write!(digits, "{}", value);
        self.print(&digits);
    }

    /// Moves the cursor and prints a signed decimal number.
    fn print_number_at(&mut self, col: u8, row: u8, value: i32) {
        self.set_cursor(col, row);
        self.print_number(value);
    }

    /// Moves the cursor and writes a custom glyph.
    fn write_glyph_at(&mut self, col: u8, row: u8, glyph: Glyph) {
        self.set_cursor(col, row);
        self.write_glyph(glyph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        cursor: (u8, u8),
        printed: heapless::Vec<heapless::String<16>, 8>,
        glyphs: heapless::Vec<Glyph, 4>,
    }

    impl CharacterDisplay for Recorder {
        fn clear(&mut self) {
            self.cursor = (0, 0);
        }

        fn set_cursor(&mut self, col: u8, row: u8) {
            self.cursor = (col, row);
        }

        fn print(&mut self, text: &str) {
            let _ = self.printed.push(text.try_into().unwrap());
        }

        fn write_glyph(&mut self, glyph: Glyph) {
            let _ = self.glyphs.push(glyph);
        }
    }

    #[test]
    fn glyph_slots_match_cgram_layout() {
        assert_eq!(Glyph::FeedRate.slot(), 0);
        assert_eq!(Glyph::PlusMinus.slot(), 1);
        assert_eq!(Glyph::Ellipsis.slot(), 3);
    }

    #[test]
    fn glyph_bitmaps_fit_five_columns() {
        for glyph in Glyph::ALL {
            assert!(glyph.bitmap().iter().all(|row| *row < 0b100000));
        }
    }

    #[test]
    fn print_number_formats_signed_values() {
        let mut lcd = Recorder::default();
        lcd.print_number(-2);
        lcd.print_number(0);
        lcd.print_number(i32::MIN);

        assert_eq!(lcd.printed[0].as_str(), "-2");
        assert_eq!(lcd.printed[1].as_str(), "0");
        assert_eq!(lcd.printed[2].as_str(), "-2147483648");
    }

    #[test]
    fn positioned_helpers_move_cursor_first() {
        let mut lcd = Recorder::default();
        lcd.write_glyph_at(5, 1, Glyph::Ellipsis);
        assert_eq!(lcd.cursor, (5, 1));
        assert_eq!(lcd.glyphs[0], Glyph::Ellipsis);

        lcd.print_at(12, 1, "OK");
        assert_eq!(lcd.cursor, (12, 1));
        assert_eq!(lcd.printed[0].as_str(), "OK");
    }
}

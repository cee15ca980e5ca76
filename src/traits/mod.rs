//! Trait definitions for the hardware boundary.
//!
//! This module defines the abstractions that allow mrkt to:
//! - Run on different boards (AVR/ARM targets, desktop mocks, the simulator)
//! - Talk to the motion controller over any byte-oriented serial link
//! - Render onto any 16x2 character display
//!
//! # Submodules
//!
//! - `hardware`: Serial link, control panel inputs, status LED, clock, board bundle
//! - `display`: Character display trait and custom glyphs
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`SerialPort`]: Non-blocking byte link to the Grbl controller
//! - [`ControlPanel`]: Keypad/button channels and the rotary encoder counter
//! - [`CharacterDisplay`]: Cursor-addressed 16x2 character grid
//! - [`StatusLed`]: The single main status LED
//! - [`Clock`]: Time source for `no_std` environments
//! - [`Board`]: Bundles one concrete set of the above

pub mod display;
pub mod hardware;

pub use display::*;
pub use hardware::*;

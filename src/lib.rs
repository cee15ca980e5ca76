//! # mrkt
//!
//! Firmware core of a stand-alone front-end for the Grbl CNC motion
//! controller: a 16x2 character display, a five-button keypad, a mode
//! button, a rotary encoder with push button, and a status LED.
//!
//! ## Features
//!
//! - **Protocol engine**: non-blocking command/response exchange with Grbl,
//!   with response timeout and bounded reply buffer
//! - **Input pipeline**: edge-triggered buttons and a stepped encoder,
//!   coalesced into a small event queue
//! - **Modes**: a closed set of operating modes driven by one supervisor
//! - **Initialization**: locates Grbl, verifies its major version, and
//!   hands over to the working mode
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware abstractions (serial, panel, display, LED, clock)
//! - `comm` - Grbl command/response engine
//! - `controls` - User control sampling and the event queue
//! - `modes` - The mode lifecycle and every mode
//! - `controller` - The supervisor that runs the active mode
//! - `hal` - Concrete implementations (mocks for testing, `embedded-hal` adapters)
//!
//! Everything runs on one thread from a cooperative loop; nothing blocks
//! and nothing allocates.
//!
//! ## Example
//!
//! ```rust
//! use mrkt::{Config, ModeController, ModeKind};
//! use mrkt::hal::MockBoard;
//!
//! let mut controller: ModeController<MockBoard> =
//!     ModeController::new(Config::default(), MockBoard::peripherals());
//!
//! // Main loop
//! for _ in 0..4 {
//!     controller.clock_mut().advance(10);
//!     controller.tick();
//! }
//!
//! // No Grbl attached yet: still searching
//! assert_eq!(controller.current_mode(), ModeKind::Initialization);
//! assert_eq!(controller.comm().serial().sent(), b"$I\r");
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

#[macro_use]
mod fmt;

/// Grbl command/response engine.
pub mod comm;
/// Compile-time configuration and builders.
pub mod config;
/// Mode supervisor.
pub mod controller;
/// User control sampling and the coalescing event queue.
pub mod controls;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Operating modes.
pub mod modes;
/// Core traits for hardware abstraction.
pub mod traits;

pub use comm::{CommError, CommandStatus, Communication, ResponseHandler};
pub use config::Config;
pub use controller::ModeController;
pub use controls::{Event, EventQueue, EventType, UserControls};
pub use modes::{InitState, InitializationMode, Mode, ModeContext, ModeKind, ModeSet};
pub use traits::{Board, Peripherals};

//! Compile-time configuration.
//!
//! Every tunable of the firmware is a `pub const` here. The [`Config`]
//! structs are initialised from these constants and can be adjusted with
//! the `with_*` builders before the supervisor is constructed; there is no
//! runtime configuration protocol.
//!
//! # Example
//!
//! ```rust
//! use mrkt::config::{Config, ControlsConfig, InitTimings};
//! use mrkt::ModeKind;
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.controls.encoder_step, 4);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_controls(ControlsConfig::default().with_encoder_step(2).with_inverted(false))
//!     .with_timing(InitTimings::default().with_comm_timeout_ms(3000))
//!     .with_working_mode(ModeKind::Passthrough);
//! ```

use crate::modes::ModeKind;

/// Firmware version shown in the startup banner (at most 11 characters are displayed).
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Serial links
// ============================================================================

/// Baud rate of the link to the host system.
pub const HOST_SERIAL_SPEED: u32 = 57_600;

/// Baud rate of the link to Grbl. Grbl's own default of 115200 is unreliable
/// on a software UART, hence the lower speed.
pub const GRBL_SERIAL_SPEED: u32 = 57_600;

/// Bytes reserved for a Grbl reply, sized for the `$I` version report.
pub const RESPONSE_BUFFER_SIZE: usize = 50;

// ============================================================================
// User controls
// ============================================================================

/// Raw encoder counts per detent.
pub const ENCODER_STEP_SIZE: i32 = 4;

/// Whether clockwise turns register as negative counts on this encoder.
pub const ENCODER_INVERT_DIRECTION: bool = true;

/// Upper bounds of the keypad ladder bands: Right, Up, Down, Left, Select.
pub const KEYPAD_BANDS: [u16; 5] = [50, 250, 450, 650, 850];

/// Upper bounds of the button channel bands: Mode, Encoder button.
pub const BUTTON_BANDS: [u16; 2] = [250, 750];

/// Capacity of the user event queue. Repeated events are coalesced, so the
/// queue is rarely more than one entry deep.
pub const EVENT_QUEUE_SIZE: usize = 3;

// ============================================================================
// Initialization mode timing
// ============================================================================

/// Slow status LED blink while the controller is being searched for (ms).
pub const INIT_BLINK_INTERVAL_MS: u32 = 500;

/// Fast status LED blink after an unrecoverable error (ms).
pub const ERROR_BLINK_INTERVAL_MS: u32 = 100;

/// How long a user control event stays on screen (ms).
pub const EVENT_DISPLAY_TIME_MS: u32 = 750;

/// How long the Grbl version is shown before handing over (ms).
pub const VERSION_DISPLAY_TIME_MS: u32 = 1000;

/// How long to wait for a reply to the version query (ms).
pub const COMM_TIMEOUT_MS: u32 = 1500;

/// Pause before the version query is sent again after a failure (ms).
pub const COMM_RETRY_DELAY_MS: u32 = 250;

/// Mode entered once the Grbl controller has been verified.
pub const INITIAL_WORKING_MODE: ModeKind = ModeKind::Command;

// ============================================================================
// Main Config
// ============================================================================

/// Complete firmware configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Serial link settings
    pub link: LinkConfig,
    /// Button and encoder settings
    pub controls: ControlsConfig,
    /// Initialization mode timing
    pub timing: InitTimings,
    /// Mode to enter once the controller has been verified
    pub working_mode: ModeKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            controls: ControlsConfig::default(),
            timing: InitTimings::default(),
            working_mode: INITIAL_WORKING_MODE,
        }
    }
}

impl Config {
    /// Set the serial link configuration
    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    /// Set the controls configuration
    pub fn with_controls(mut self, controls: ControlsConfig) -> Self {
        self.controls = controls;
        self
    }

    /// Set the initialization timing
    pub fn with_timing(mut self, timing: InitTimings) -> Self {
        self.timing = timing;
        self
    }

    /// Set the working mode entered after initialization
    pub fn with_working_mode(mut self, mode: ModeKind) -> Self {
        self.working_mode = mode;
        self
    }
}

// ============================================================================
// Link Config
// ============================================================================

/// Serial link configuration.
///
/// The firmware core does not open ports itself; board setup code reads
/// these values when it configures the UARTs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkConfig {
    /// Host link baud rate
    pub host_baud: u32,
    /// Grbl link baud rate
    pub grbl_baud: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host_baud: HOST_SERIAL_SPEED,
            grbl_baud: GRBL_SERIAL_SPEED,
        }
    }
}

impl LinkConfig {
    /// Set the host baud rate
    pub fn with_host_baud(mut self, baud: u32) -> Self {
        self.host_baud = baud;
        self
    }

    /// Set the Grbl baud rate
    pub fn with_grbl_baud(mut self, baud: u32) -> Self {
        self.grbl_baud = baud;
        self
    }
}

// ============================================================================
// Controls Config
// ============================================================================

/// Button ladder and encoder configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlsConfig {
    /// Raw encoder counts per reported step (values below 1 are treated as 1)
    pub encoder_step: i32,
    /// Negate encoder deltas
    pub invert_encoder: bool,
    /// Keypad band upper bounds: Right, Up, Down, Left, Select
    pub keypad_bands: [u16; 5],
    /// Button band upper bounds: Mode, Encoder button
    pub button_bands: [u16; 2],
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            encoder_step: ENCODER_STEP_SIZE,
            invert_encoder: ENCODER_INVERT_DIRECTION,
            keypad_bands: KEYPAD_BANDS,
            button_bands: BUTTON_BANDS,
        }
    }
}

impl ControlsConfig {
    /// Set the encoder step divisor
    pub fn with_encoder_step(mut self, step: i32) -> Self {
        self.encoder_step = step;
        self
    }

    /// Set whether encoder deltas are negated
    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.invert_encoder = inverted;
        self
    }

    /// Set the keypad band upper bounds
    pub fn with_keypad_bands(mut self, bands: [u16; 5]) -> Self {
        self.keypad_bands = bands;
        self
    }

    /// Set the button band upper bounds
    pub fn with_button_bands(mut self, bands: [u16; 2]) -> Self {
        self.button_bands = bands;
        self
    }
}

// ============================================================================
// Initialization Timing
// ============================================================================

/// Timing of the initialization sequence, all in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InitTimings {
    /// Status LED interval while searching
    pub blink_slow_ms: u32,
    /// Status LED interval after an incompatible version
    pub blink_fast_ms: u32,
    /// Time a user event stays on screen
    pub event_display_ms: u32,
    /// Time the version stays on screen before handing over
    pub version_display_ms: u32,
    /// Reply timeout of the version query
    pub comm_timeout_ms: u32,
    /// Delay before the version query is retried
    pub retry_delay_ms: u32,
}

impl Default for InitTimings {
    fn default() -> Self {
        Self {
            blink_slow_ms: INIT_BLINK_INTERVAL_MS,
            blink_fast_ms: ERROR_BLINK_INTERVAL_MS,
            event_display_ms: EVENT_DISPLAY_TIME_MS,
            version_display_ms: VERSION_DISPLAY_TIME_MS,
            comm_timeout_ms: COMM_TIMEOUT_MS,
            retry_delay_ms: COMM_RETRY_DELAY_MS,
        }
    }
}

impl InitTimings {
    /// Set both blink intervals
    pub fn with_blink_ms(mut self, slow: u32, fast: u32) -> Self {
        self.blink_slow_ms = slow;
        self.blink_fast_ms = fast;
        self
    }

    /// Set the event display time
    pub fn with_event_display_ms(mut self, ms: u32) -> Self {
        self.event_display_ms = ms;
        self
    }

    /// Set the version display time
    pub fn with_version_display_ms(mut self, ms: u32) -> Self {
        self.version_display_ms = ms;
        self
    }

    /// Set the version query timeout
    pub fn with_comm_timeout_ms(mut self, ms: u32) -> Self {
        self.comm_timeout_ms = ms;
        self
    }

    /// Set the retry delay
    pub fn with_retry_delay_ms(mut self, ms: u32) -> Self {
        self.retry_delay_ms = ms;
        self
    }
}

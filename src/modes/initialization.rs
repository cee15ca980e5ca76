//! Startup sequence: locate the Grbl controller and verify its version.
//!
//! The mode runs automatically after power-up. It queries Grbl with `$I`,
//! retries until a reply arrives, checks that the major version is `1`, and
//! then hands over to the configured working mode. While it waits, every
//! user control event is echoed on the display so the wiring can be checked.
//!
//! # States
//!
//! ```text
//!             Initial
//!                │
//!                ▼
//!   ┌──▶ GrblSearchStart ──$I──┐
//!   │            │             │
//!   │            ▼             │
//!   │       GrblWaiting ◀──────┼────▶ EventDisplay
//!   │            │             │     (returns after a delay)
//!   │   reply handler          │
//!   │     ┌──────┴───────┐     │
//!   │     ▼              ▼     │
//!   └─ GrblCommError  GrblVersionFound
//!     (retry delay)      │
//!              ┌─────────┴─────────┐
//!              ▼                   ▼
//!        GrblVersionOK      GrblVersionError
//!              │             (terminal, fast blink)
//!              ▼
//!            Final ──▶ switch to working mode
//! ```
//!
//! Display contents follow the same sequence on the second row:
//! `Grbl …`, `KP Left   1`, `Grbl Com Err -1`, `Grbl 1.1h   OK`,
//! `Grbl 0.9j   ERR`.

use super::{Mode, ModeContext, ModeSet};
use crate::comm::{CommError, CommandStatus};
use crate::config::{InitTimings, FIRMWARE_VERSION};
use crate::traits::{Board, CharacterDisplay, Glyph, StatusLed, DISPLAY_COLUMNS};

/// Command that makes Grbl report its build info.
pub const VERSION_QUERY: &str = "$I";

/// Capacity of the parsed version token (`1.1h` and friends).
pub const VERSION_TOKEN_SIZE: usize = 8;

/// Longest firmware version shown in the banner.
const BANNER_VERSION_CHARS: usize = 11;

/// Major version this front-end speaks.
const SUPPORTED_MAJOR: char = '1';

/// Marker preceding the version field in the `$I` reply.
const VERSION_MARKER: &[u8] = b"VER:";

/// Version token extracted from a `$I` reply, e.g. `1.1h`.
pub type VersionToken = heapless::String<VERSION_TOKEN_SIZE>;

// ============================================================================
// Version Parsing
// ============================================================================

/// Reasons a version reply is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VersionError {
    /// The reply has no `VER:` field.
    #[error("reply has no VER: field")]
    MissingMarker,
    /// The version field has fewer than two `.` separators.
    #[error("version field lacks two '.' separators")]
    MissingSeparator,
    /// Nothing precedes the first separator.
    #[error("version field has an empty major version")]
    EmptyMajor,
    /// The token does not fit [`VersionToken`].
    #[error("version token is too long")]
    TokenTooLong,
    /// The token is not valid UTF-8.
    #[error("version token is not valid UTF-8")]
    NotUtf8,
}

/// Extracts `<major>.<minor+patch>` from a reply containing `VER:<major>.<minor+patch>.<date>:`.
///
/// Both separators must lie inside the version field, which ends at the next
/// `:` or line break. Anything else is rejected without reading past the
/// reply.
///
/// ```rust
/// use mrkt::modes::{parse_version, VersionError};
///
/// let token = parse_version(b"[VER:1.1h.20190825:]\r\n[OPT:V,15,128]\r\nok\r").unwrap();
/// assert_eq!(token.as_str(), "1.1h");
///
/// assert_eq!(parse_version(b"[0.9j.20160303:]\r\nok\r"), Err(VersionError::MissingMarker));
/// assert_eq!(parse_version(b"[VER:1.1h:]\r\nok\r"), Err(VersionError::MissingSeparator));
/// ```
pub fn parse_version(reply: &[u8]) -> Result<VersionToken, VersionError> {
    let start = reply
        .windows(VERSION_MARKER.len())
        .position(|window| window == VERSION_MARKER)
        .ok_or(VersionError::MissingMarker)?
        + VERSION_MARKER.len();

    let field = &reply[start..];
    let field_end = field
        .iter()
        .position(|b| matches!(b, b':' | b'\r' | b'\n'))
        .unwrap_or(field.len());
    let field = &field[..field_end];

    let first_dot = field
        .iter()
        .position(|b| *b == b'.')
        .ok_or(VersionError::MissingSeparator)?;
    if first_dot == 0 {
        return Err(VersionError::EmptyMajor);
    }
    let second_dot = field[first_dot + 1..]
        .iter()
        .position(|b| *b == b'.')
        .ok_or(VersionError::MissingSeparator)?
        + first_dot
        + 1;

    let token = core::str::from_utf8(&field[..second_dot]).map_err(|_| VersionError::NotUtf8)?;
    VersionToken::try_from(token).map_err(|_| VersionError::TokenTooLong)
}

// ============================================================================
// Initialization Mode
// ============================================================================

/// Internal states of the startup sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitState {
    /// Draw the banner.
    Initial,
    /// Echo one user event, then return to waiting.
    EventDisplay,
    /// Send the version query.
    GrblSearchStart,
    /// Wait for the query's handler; echo user events meanwhile.
    GrblWaiting,
    /// Show the failure, then retry.
    GrblCommError,
    /// Show the version and check it.
    GrblVersionFound,
    /// Incompatible version; left only by reset.
    GrblVersionError,
    /// Compatible version; hand over after a delay.
    GrblVersionOK,
    /// Request the working mode.
    Final,
}

/// The startup sequence.
#[derive(Debug)]
pub struct InitializationMode {
    timing: InitTimings,
    state: InitState,
    /// The state is not evaluated before this time.
    next_eval_ms: u64,
    led_on: bool,
    last_blink_ms: u64,
    blink_interval_ms: u32,
    version: VersionToken,
    last_error: Option<CommError>,
}

impl InitializationMode {
    /// Creates the mode; it starts from [`InitState::Initial`] on every activation.
    pub fn new(timing: InitTimings) -> Self {
        Self {
            blink_interval_ms: timing.blink_slow_ms,
            timing,
            state: InitState::Initial,
            next_eval_ms: 0,
            led_on: false,
            last_blink_ms: 0,
            version: VersionToken::new(),
            last_error: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> InitState {
        self.state
    }

    /// Version reported by Grbl, once one has been parsed.
    pub fn version(&self) -> Option<&str> {
        (!self.version.is_empty()).then_some(self.version.as_str())
    }

    /// Failure of the most recent query, if it failed.
    pub fn last_error(&self) -> Option<CommError> {
        self.last_error
    }

    /// Current status LED blink interval.
    pub fn blink_interval_ms(&self) -> u32 {
        self.blink_interval_ms
    }

    /// Applies the outcome of the version query.
    ///
    /// Runs from inside the protocol engine's tick, before this mode is
    /// ticked in the same iteration.
    pub fn handle_version_reply(&mut self, status: CommandStatus, reply: &[u8]) {
        let outcome = match status {
            CommandStatus::Ok => parse_version(reply).map_err(|err| {
                warn!("unusable version reply: {}", err);
                CommError::MalformedReply
            }),
            CommandStatus::Failed(err) => Err(err),
        };

        match outcome {
            Ok(version) => {
                info!("Grbl version {=str}", version.as_str());
                self.version = version;
                self.set_state(InitState::GrblVersionFound, 0);
            }
            Err(err) => {
                self.last_error = Some(err);
                self.set_state(InitState::GrblCommError, 0);
            }
        }
    }

    fn set_state(&mut self, state: InitState, next_eval_ms: u64) {
        if state != self.state {
            debug!("initialization {} -> {}", self.state, state);
        }
        self.state = state;
        self.next_eval_ms = next_eval_ms;
    }

    fn blink<L: StatusLed>(&mut self, led: &mut L, now_ms: u64) {
        if now_ms.saturating_sub(self.last_blink_ms) > u64::from(self.blink_interval_ms) {
            self.led_on = !self.led_on;
            led.set(self.led_on);
            self.last_blink_ms = now_ms;
        }
    }

    fn enter_initial<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        self.blink_interval_ms = self.timing.blink_slow_ms;

        let version_end = FIRMWARE_VERSION
            .char_indices()
            .nth(BANNER_VERSION_CHARS)
            .map_or(FIRMWARE_VERSION.len(), |(i, _)| i);
        ctx.display.clear();
        ctx.display.print("Mrkt ");
        ctx.display.print(&FIRMWARE_VERSION[..version_end]);

        self.set_state(InitState::GrblSearchStart, 0);
    }

    fn show_event<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        if let Some(event) = ctx.events.get_event() {
            print_status_line(ctx.display, event.kind.label());
            ctx.display.print_number_at(10, 1, i32::from(event.magnitude));
        }
        let until = ctx.now_ms + u64::from(self.timing.event_display_ms);
        self.set_state(InitState::GrblWaiting, until);
    }

    fn start_search<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        print_status_line(ctx.display, "Grbl");
        ctx.display.write_glyph_at(5, 1, Glyph::Ellipsis);

        let timeout = self.timing.comm_timeout_ms;
        if ctx
            .comm
            .send_command(VERSION_QUERY, timeout, ctx.now_ms, on_version_reply)
        {
            self.set_state(InitState::GrblWaiting, 0);
        } else {
            // Another exchange is in flight; its handler is not ours to wait for
            debug!("protocol engine busy, version query deferred");
            let until = ctx.now_ms + u64::from(self.timing.retry_delay_ms);
            self.set_state(InitState::GrblSearchStart, until);
        }
    }

    fn wait_for_reply<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        // Only the reply handler leaves this state towards the version checks
        if ctx.events.is_event_available() {
            self.set_state(InitState::EventDisplay, 0);
        }
    }

    fn show_comm_error<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        let code = self.last_error.map_or(0, CommError::code);
        if code < 0 {
            print_status_line(ctx.display, "Grbl Com Err");
        } else {
            print_status_line(ctx.display, "Grbl Cmd Err");
        }
        ctx.display.print_number_at(13, 1, i32::from(code));

        let until = ctx.now_ms + u64::from(self.timing.retry_delay_ms);
        self.set_state(InitState::GrblSearchStart, until);
    }

    fn check_version<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        print_status_line(ctx.display, "Grbl");
        ctx.display.print_at(5, 1, &self.version);

        if self.version.starts_with(SUPPORTED_MAJOR) {
            self.set_state(InitState::GrblVersionOK, 0);
        } else {
            warn!("unsupported Grbl version {=str}", self.version.as_str());
            self.set_state(InitState::GrblVersionError, 0);
        }
    }

    fn show_version_error<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        self.blink_interval_ms = self.timing.blink_fast_ms;
        ctx.display.print_at(12, 1, "ERR");

        // Terminal; re-evaluated only to keep the display refreshed
        let until = ctx.now_ms + u64::from(self.timing.version_display_ms);
        self.set_state(InitState::GrblVersionError, until);
    }

    fn show_version_ok<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        ctx.display.print_at(12, 1, "OK");

        let until = ctx.now_ms + u64::from(self.timing.version_display_ms);
        self.set_state(InitState::Final, until);
    }
}

impl Mode for InitializationMode {
    fn activate<B: Board>(&mut self, _ctx: &mut ModeContext<'_, B>) {
        self.state = InitState::Initial;
        self.next_eval_ms = 0;
        self.last_blink_ms = 0;
        self.led_on = false;
        self.blink_interval_ms = self.timing.blink_slow_ms;
        self.version.clear();
        self.last_error = None;
    }

    fn tick<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        self.blink(ctx.led, ctx.now_ms);

        if ctx.now_ms < self.next_eval_ms {
            return;
        }

        match self.state {
            InitState::Initial => self.enter_initial(ctx),
            InitState::EventDisplay => self.show_event(ctx),
            InitState::GrblSearchStart => self.start_search(ctx),
            InitState::GrblWaiting => self.wait_for_reply(ctx),
            InitState::GrblCommError => self.show_comm_error(ctx),
            InitState::GrblVersionFound => self.check_version(ctx),
            InitState::GrblVersionError => self.show_version_error(ctx),
            InitState::GrblVersionOK => self.show_version_ok(ctx),
            InitState::Final => ctx.switch_to_initial_working_mode(),
        }
    }

    fn deactivate<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        self.led_on = false;
        ctx.led.set(false);
    }
}

/// Reply handler of the version query.
fn on_version_reply(modes: &mut ModeSet, status: CommandStatus, reply: &[u8]) {
    modes.initialization.handle_version_reply(status, reply);
}

/// Writes `text` at the start of the second row and blanks the rest of it.
fn print_status_line<D: CharacterDisplay>(display: &mut D, text: &str) {
    const BLANK: &str = "                ";
    let width = usize::from(DISPLAY_COLUMNS);
    display.print_at(0, 1, text);
    if text.len() < width {
        display.print(&BLANK[..width - text.len()]);
    }
}

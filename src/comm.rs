//! Non-blocking command/response engine for the Grbl serial link.
//!
//! [`Communication`] issues one command at a time and collects the reply
//! across as many ticks as it takes. The exchange ends on the first reply
//! line that is exactly `ok` or `error:<code>`, when the reply no longer fits
//! the [`ResponseBuffer`], or when the deadline passes. Whichever happens
//! first, the handler registered with the command is called exactly once,
//! synchronously, from inside [`Communication::tick`].
//!
//! # Handlers
//!
//! A handler is a plain function bound to a target type `T`. The owner of
//! the engine passes the target into every tick, so the handler can update
//! the state of whoever issued the command without the engine holding a
//! reference to it between ticks.
//!
//! ```rust
//! use mrkt::comm::{Communication, CommandStatus};
//! use mrkt::hal::MockSerial;
//!
//! #[derive(Default)]
//! struct Replies {
//!     last: Option<CommandStatus>,
//! }
//!
//! fn on_reply(target: &mut Replies, status: CommandStatus, _reply: &[u8]) {
//!     target.last = Some(status);
//! }
//!
//! let mut comm: Communication<MockSerial, Replies> = Communication::new(MockSerial::new());
//! let mut replies = Replies::default();
//!
//! assert!(comm.send_command("$I", 1500, 0, on_reply));
//! assert_eq!(comm.serial().sent(), b"$I\r");
//!
//! comm.serial_mut().feed(b"[VER:1.1h.20190825:]\r\nok\r\n");
//! comm.tick(10, &mut replies);
//!
//! assert_eq!(replies.last, Some(CommandStatus::Ok));
//! assert!(!comm.is_busy());
//! ```
//!
//! # Status Codes
//!
//! [`CommandStatus::code`] maps outcomes onto the numeric convention of the
//! firmware: `0` success, negative for link failures, positive for Grbl
//! error codes.

use crate::config::RESPONSE_BUFFER_SIZE;
use crate::traits::SerialPort;

/// Status code of a successful exchange.
pub const STATUS_OK: i16 = 0;
/// Status code of an exchange that hit its deadline.
pub const STATUS_TIMEOUT: i16 = -1;
/// Status code of a reply that did not fit the response buffer.
pub const STATUS_BUFFER_OVERFLOW: i16 = -2;
/// Status code of a reply whose payload could not be interpreted.
pub const STATUS_MALFORMED_REPLY: i16 = -3;

/// Line terminator appended to every command.
const COMMAND_TERMINATOR: &[u8] = b"\r";

/// Prefix of a Grbl error line.
const ERROR_PREFIX: &[u8] = b"error:";

/// Handler invoked when an exchange ends.
///
/// Receives the handler target, the outcome, and the raw reply bytes
/// collected so far (including the terminating line).
pub type ResponseHandler<T> = fn(&mut T, CommandStatus, &[u8]);

// ============================================================================
// Errors and Status
// ============================================================================

/// Ways a command exchange can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommError {
    /// No terminating reply line before the deadline.
    #[error("no reply from controller before the deadline")]
    Timeout,
    /// The reply did not fit into the response buffer.
    #[error("reply exceeded the response buffer")]
    Overflow,
    /// The controller answered `error:<code>`.
    #[error("controller reported error {0}")]
    Protocol(u16),
    /// The reply ended with `ok` but its payload was not understood.
    #[error("reply payload was malformed")]
    MalformedReply,
}

impl CommError {
    /// Numeric status of this failure.
    ///
    /// Link failures are negative, protocol errors are the positive code
    /// reported by Grbl (saturated to `i16::MAX`).
    pub const fn code(self) -> i16 {
        match self {
            CommError::Timeout => STATUS_TIMEOUT,
            CommError::Overflow => STATUS_BUFFER_OVERFLOW,
            CommError::MalformedReply => STATUS_MALFORMED_REPLY,
            CommError::Protocol(code) => {
                if code > i16::MAX as u16 {
                    i16::MAX
                } else {
                    code as i16
                }
            }
        }
    }

    /// Returns true for failures of the link itself (negative codes).
    pub const fn is_link_failure(self) -> bool {
        !matches!(self, CommError::Protocol(_))
    }
}

/// Outcome of one command exchange, as passed to its handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandStatus {
    /// The reply ended with an `ok` line.
    Ok,
    /// The exchange failed.
    Failed(CommError),
}

impl CommandStatus {
    /// Numeric status: `0`, a negative link failure, or a positive Grbl error.
    pub const fn code(self) -> i16 {
        match self {
            CommandStatus::Ok => STATUS_OK,
            CommandStatus::Failed(err) => err.code(),
        }
    }

    /// Returns true if the exchange succeeded.
    pub const fn is_ok(self) -> bool {
        matches!(self, CommandStatus::Ok)
    }

    /// Returns the failure, if any.
    pub const fn error(self) -> Option<CommError> {
        match self {
            CommandStatus::Ok => None,
            CommandStatus::Failed(err) => Some(err),
        }
    }
}

// ============================================================================
// Response Buffer
// ============================================================================

/// Fixed-capacity accumulator for one reply.
///
/// Holds at most `N - 1` bytes; the slot after the last stored byte is
/// always zero, so the contents can be handed to code expecting a
/// terminated string. Also tracks where the line currently being received
/// starts.
///
/// ```rust
/// use mrkt::comm::ResponseBuffer;
///
/// let mut buffer: ResponseBuffer<4> = ResponseBuffer::new();
/// assert!(buffer.push(b'o'));
/// assert!(buffer.push(b'k'));
/// assert!(buffer.push(b'\r'));
/// assert!(buffer.is_full());
/// assert!(!buffer.push(b'\n'));
/// assert_eq!(buffer.as_bytes(), b"ok\r");
/// ```
#[derive(Clone, Debug)]
pub struct ResponseBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
    line_start: usize,
}

impl<const N: usize> ResponseBuffer<N> {
    /// Creates an empty buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
            line_start: 0,
        }
    }

    /// Total capacity including the terminator slot.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of stored bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing has been stored.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true once another byte would leave no room for the terminator.
    pub const fn is_full(&self) -> bool {
        self.len + 1 >= N
    }

    /// Appends a byte. Returns `false` without writing if the buffer is full.
    #[must_use]
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        self.bytes[self.len] = 0;
        true
    }

    /// Stored bytes, without the trailing zero.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Bytes of the line currently being received.
    pub fn current_line(&self) -> &[u8] {
        &self.bytes[self.line_start..self.len]
    }

    /// Marks the next stored byte as the start of a new line.
    pub fn start_next_line(&mut self) {
        self.line_start = self.len;
    }

    /// Empties the buffer and zeroes its contents.
    pub fn reset(&mut self) {
        self.bytes = [0; N];
        self.len = 0;
        self.line_start = 0;
    }
}

impl<const N: usize> Default for ResponseBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Communication
// ============================================================================

/// State of the protocol engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommState {
    /// No command in flight; `send_command` is accepted.
    Idle,
    /// A command is in flight; `send_command` is ignored.
    Busy,
}

/// Protocol engine for the Grbl link.
///
/// # Type Parameters
///
/// - `S`: The serial link ([`SerialPort`] trait)
/// - `T`: Target type passed to completion handlers
/// - `N`: Response buffer capacity
pub struct Communication<S, T, const N: usize = RESPONSE_BUFFER_SIZE> {
    serial: S,
    state: CommState,
    buffer: ResponseBuffer<N>,
    deadline_ms: u64,
    handler: Option<ResponseHandler<T>>,
}

impl<S: SerialPort, T, const N: usize> Communication<S, T, N> {
    /// Creates an idle engine on top of a serial link.
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            state: CommState::Idle,
            buffer: ResponseBuffer::new(),
            deadline_ms: 0,
            handler: None,
        }
    }

    /// Sends a command line and registers the handler for its reply.
    ///
    /// Only accepted while idle: stray input is discarded, the deadline is
    /// armed at `now_ms + timeout_ms`, the command is written followed by a
    /// carriage return, and the engine becomes busy. While busy the call is
    /// ignored and returns `false`; there is no request queue.
    pub fn send_command(
        &mut self,
        command: &str,
        timeout_ms: u32,
        now_ms: u64,
        handler: ResponseHandler<T>,
    ) -> bool {
        if self.state == CommState::Busy {
            debug!("command ignored, exchange in flight");
            return false;
        }

        self.serial.discard_input();
        self.buffer.reset();
        self.handler = Some(handler);
        self.deadline_ms = now_ms.saturating_add(u64::from(timeout_ms));
        self.serial.write(command.as_bytes());
        self.serial.write(COMMAND_TERMINATOR);
        self.state = CommState::Busy;

        debug!("sent command {=str}, deadline {=u64}", command, self.deadline_ms);
        true
    }

    /// Advances the exchange in flight, if any.
    ///
    /// Consumes every byte currently available. If the exchange ends during
    /// this tick, the handler runs before `tick` returns.
    pub fn tick(&mut self, now_ms: u64, target: &mut T) {
        if self.state == CommState::Idle {
            return;
        }

        let mut outcome = None;
        while let Some(byte) = self.serial.read_byte() {
            // Checked before the write so the buffer is never overrun
            if !self.buffer.push(byte) {
                warn!("reply overflowed {=usize} byte buffer", N);
                outcome = Some(CommandStatus::Failed(CommError::Overflow));
                break;
            }

            if byte == b'\r' || byte == b'\n' {
                outcome = self.evaluate_line();
                if outcome.is_some() {
                    break;
                }
                self.buffer.start_next_line();
            }
        }

        if outcome.is_none() && now_ms > self.deadline_ms {
            warn!("no reply before deadline {=u64}", self.deadline_ms);
            outcome = Some(CommandStatus::Failed(CommError::Timeout));
        }

        if let Some(status) = outcome {
            self.finish(status, target);
        }
    }

    /// Returns true while a command is in flight.
    pub fn is_busy(&self) -> bool {
        self.state == CommState::Busy
    }

    /// Current engine state.
    pub fn state(&self) -> CommState {
        self.state
    }

    /// Reply bytes received so far for the exchange in flight.
    pub fn buffered(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Deadline of the exchange in flight.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.is_busy().then_some(self.deadline_ms)
    }

    /// Shared access to the serial link.
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Mutable access to the serial link.
    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    /// Classifies the line that was just terminated.
    fn evaluate_line(&self) -> Option<CommandStatus> {
        let line = self.buffer.current_line();
        // Drop the terminator that was just stored
        let line = &line[..line.len().saturating_sub(1)];

        if line == b"ok" {
            return Some(CommandStatus::Ok);
        }

        let code = line.strip_prefix(ERROR_PREFIX).and_then(parse_error_code)?;
        Some(CommandStatus::Failed(CommError::Protocol(code)))
    }

    /// Reports the outcome and returns to idle.
    fn finish(&mut self, status: CommandStatus, target: &mut T) {
        info!("exchange finished with status {=i16}", status.code());

        if let Some(handler) = self.handler.take() {
            handler(target, status, self.buffer.as_bytes());
        }

        self.serial.discard_input();
        self.buffer.reset();
        self.deadline_ms = 0;
        self.state = CommState::Idle;
    }
}

/// Parses the decimal code after `error:`.
///
/// Zero and non-numeric text are rejected. Codes above `u16::MAX` saturate.
fn parse_error_code(digits: &[u8]) -> Option<u16> {
    let text = core::str::from_utf8(digits).ok()?.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if text.bytes().all(|b| b == b'0') {
        return None;
    }
    // All digits and non-zero: only an overflow can fail here
    let code = text.parse::<u64>().unwrap_or(u64::MAX);
    Some(u16::try_from(code).unwrap_or(u16::MAX))
}

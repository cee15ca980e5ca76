//! Operating modes and the context they run in.
//!
//! A mode is one behavioural state machine of the front-end. Exactly one
//! mode is active at a time; the [`ModeController`](crate::ModeController)
//! activates it, ticks it once per scheduler iteration, and deactivates it
//! before another mode takes over.
//!
//! # Lifecycle
//!
//! ```text
//! activate ─▶ tick ─▶ tick ─▶ … ─▶ deactivate
//! ```
//!
//! `activate` runs exactly once before the first `tick`, and `deactivate`
//! exactly once after the last one. No other mode is ticked in between.
//!
//! # Mode Set
//!
//! The set of modes is closed and known at compile time. Every mode is
//! instantiated once inside [`ModeSet`] and dispatched by [`ModeKind`];
//! nothing is constructed or dropped when modes switch.
//!
//! - [`ModeKind::Initialization`]: [`InitializationMode`], the startup sequence
//! - [`ModeKind::Command`], [`ModeKind::Passthrough`] and `ModeKind::Reader`
//!   (with the `sdcard` feature): [`StandbyMode`] placeholders

mod initialization;
mod standby;

pub use initialization::*;
pub use standby::*;

use crate::comm::Communication;
use crate::config::{InitTimings, EVENT_QUEUE_SIZE};
use crate::controls::EventQueue;
use crate::traits::Board;

/// Identifies one of the operating modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeKind {
    /// Startup sequence: locate Grbl and verify its version.
    Initialization,
    /// Interactive command mode.
    Command,
    /// Host-to-Grbl passthrough.
    Passthrough,
    /// Program playback from the SD card.
    #[cfg(feature = "sdcard")]
    Reader,
}

impl ModeKind {
    /// Human-readable mode name.
    pub const fn name(&self) -> &'static str {
        match self {
            ModeKind::Initialization => "Initialization",
            ModeKind::Command => "Command",
            ModeKind::Passthrough => "Passthrough",
            #[cfg(feature = "sdcard")]
            ModeKind::Reader => "Reader",
        }
    }
}

/// Capability set shared by all modes.
///
/// Methods receive a [`ModeContext`] borrowing the shared components for the
/// duration of the call; modes never hold on to them between ticks.
pub trait Mode {
    /// Called once before the first [`tick`](Self::tick).
    fn activate<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>);

    /// Called once per scheduler iteration while the mode is active.
    /// Must return promptly.
    fn tick<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>);

    /// Called once after the last [`tick`](Self::tick), before the next mode
    /// is activated.
    fn deactivate<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>);
}

/// Components lent to a mode for one lifecycle call.
pub struct ModeContext<'a, B: Board> {
    /// Time of the current scheduler iteration.
    pub now_ms: u64,
    /// Protocol engine; handlers registered here receive the [`ModeSet`].
    pub comm: &'a mut Communication<B::Serial, ModeSet>,
    /// Pending user events.
    pub events: &'a mut EventQueue<EVENT_QUEUE_SIZE>,
    /// Character display.
    pub display: &'a mut B::Display,
    /// Main status LED.
    pub led: &'a mut B::Led,
    target_mode: &'a mut ModeKind,
    working_mode: ModeKind,
}

impl<'a, B: Board> ModeContext<'a, B> {
    /// Bundles the components for one call.
    pub fn new(
        now_ms: u64,
        comm: &'a mut Communication<B::Serial, ModeSet>,
        events: &'a mut EventQueue<EVENT_QUEUE_SIZE>,
        display: &'a mut B::Display,
        led: &'a mut B::Led,
        target_mode: &'a mut ModeKind,
        working_mode: ModeKind,
    ) -> Self {
        Self {
            now_ms,
            comm,
            events,
            display,
            led,
            target_mode,
            working_mode,
        }
    }

    /// Requests a switch; it takes effect after the current tick completes.
    pub fn switch_to_mode(&mut self, mode: ModeKind) {
        if *self.target_mode != mode {
            info!("mode switch to {} requested", mode);
        }
        *self.target_mode = mode;
    }

    /// Requests a switch to the configured working mode.
    pub fn switch_to_initial_working_mode(&mut self) {
        self.switch_to_mode(self.working_mode);
    }

    /// Mode that will be active after the current tick.
    pub fn target_mode(&self) -> ModeKind {
        *self.target_mode
    }
}

/// The single instance of every mode.
pub struct ModeSet {
    /// Startup sequence.
    pub initialization: InitializationMode,
    /// Command mode placeholder.
    pub command: StandbyMode,
    /// Passthrough mode placeholder.
    pub passthrough: StandbyMode,
    /// Reader mode placeholder.
    #[cfg(feature = "sdcard")]
    pub reader: StandbyMode,
}

/// Forwards a lifecycle call to the instance selected by `kind`.
macro_rules! dispatch {
    ($set:expr, $kind:expr, $method:ident, $ctx:expr) => {
        match $kind {
            ModeKind::Initialization => $set.initialization.$method($ctx),
            ModeKind::Command => $set.command.$method($ctx),
            ModeKind::Passthrough => $set.passthrough.$method($ctx),
            #[cfg(feature = "sdcard")]
            ModeKind::Reader => $set.reader.$method($ctx),
        }
    };
}

impl ModeSet {
    /// Instantiates every mode.
    pub fn new(timing: InitTimings) -> Self {
        Self {
            initialization: InitializationMode::new(timing),
            command: StandbyMode::new("Command mode"),
            passthrough: StandbyMode::new("Passthrough mode"),
            #[cfg(feature = "sdcard")]
            reader: StandbyMode::new("Reader mode"),
        }
    }

    /// Activates the mode `kind`.
    pub fn activate<B: Board>(&mut self, kind: ModeKind, ctx: &mut ModeContext<'_, B>) {
        dispatch!(self, kind, activate, ctx)
    }

    /// Ticks the mode `kind`.
    pub fn tick<B: Board>(&mut self, kind: ModeKind, ctx: &mut ModeContext<'_, B>) {
        dispatch!(self, kind, tick, ctx)
    }

    /// Deactivates the mode `kind`.
    pub fn deactivate<B: Board>(&mut self, kind: ModeKind, ctx: &mut ModeContext<'_, B>) {
        dispatch!(self, kind, deactivate, ctx)
    }

    /// The placeholder instance behind `kind`, if it is one.
    pub fn standby(&self, kind: ModeKind) -> Option<&StandbyMode> {
        match kind {
            ModeKind::Initialization => None,
            ModeKind::Command => Some(&self.command),
            ModeKind::Passthrough => Some(&self.passthrough),
            #[cfg(feature = "sdcard")]
            ModeKind::Reader => Some(&self.reader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names() {
        assert_eq!(ModeKind::Initialization.name(), "Initialization");
        assert_eq!(ModeKind::Command.name(), "Command");
        assert_eq!(ModeKind::Passthrough.name(), "Passthrough");
    }

    #[test]
    fn standby_lookup() {
        let set = ModeSet::new(InitTimings::default());
        assert!(set.standby(ModeKind::Initialization).is_none());
        assert_eq!(set.standby(ModeKind::Command).unwrap().title(), "Command mode");
        assert_eq!(
            set.standby(ModeKind::Passthrough).unwrap().title(),
            "Passthrough mode"
        );
    }

    #[cfg(feature = "sdcard")]
    #[test]
    fn reader_mode_available_with_sdcard() {
        let set = ModeSet::new(InitTimings::default());
        assert_eq!(ModeKind::Reader.name(), "Reader");
        assert_eq!(set.standby(ModeKind::Reader).unwrap().title(), "Reader mode");
    }
}

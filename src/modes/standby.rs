//! Placeholder for the working modes that have no behaviour yet.

use super::{Mode, ModeContext};
use crate::traits::{Board, CharacterDisplay};

/// A mode that only honours the lifecycle.
///
/// On activation it shows its title and a notice on the display. While
/// active it discards user events so the queue does not stay full. It
/// counts its lifecycle calls, which the supervisor tests rely on.
#[derive(Debug)]
pub struct StandbyMode {
    title: &'static str,
    active: bool,
    activations: u32,
    ticks: u32,
    deactivations: u32,
}

impl StandbyMode {
    /// Creates an inactive placeholder with a display title (max. 16 chars).
    pub const fn new(title: &'static str) -> Self {
        Self {
            title,
            active: false,
            activations: 0,
            ticks: 0,
            deactivations: 0,
        }
    }

    /// Title shown on activation.
    pub fn title(&self) -> &'static str {
        self.title
    }

    /// Returns true between `activate` and `deactivate`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of `activate` calls so far.
    pub fn activations(&self) -> u32 {
        self.activations
    }

    /// Number of `tick` calls so far.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Number of `deactivate` calls so far.
    pub fn deactivations(&self) -> u32 {
        self.deactivations
    }
}

impl Mode for StandbyMode {
    fn activate<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        self.active = true;
        self.activations += 1;
        ctx.display.clear();
        ctx.display.print_at(0, 0, self.title);
        ctx.display.print_at(0, 1, "Not available");
    }

    fn tick<B: Board>(&mut self, ctx: &mut ModeContext<'_, B>) {
        debug_assert!(self.active, "tick on inactive mode");
        self.ticks += 1;
        while let Some(event) = ctx.events.get_event() {
            trace!("{} ignores {}", self.title, event);
        }
    }

    fn deactivate<B: Board>(&mut self, _ctx: &mut ModeContext<'_, B>) {
        self.active = false;
        self.deactivations += 1;
    }
}

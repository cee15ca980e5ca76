//! Supervisor that owns the shared components and runs the active mode.
//!
//! This module provides [`ModeController`], the single owner of the
//! protocol engine, the input pipeline, the display, the status LED and
//! every mode instance.
//!
//! # Overview
//!
//! Each call to [`ModeController::tick`] is one iteration of the firmware's
//! cooperative scheduler:
//!
//! 1. The protocol engine is ticked; a reply handler may run here.
//! 2. The user controls are sampled into the event queue.
//! 3. The active mode is ticked.
//! 4. A requested mode switch is applied: the old mode is deactivated and
//!    the new one activated, in that order.
//!
//! Nothing blocks; the caller is expected to tick as often as it can.
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
//! // Banner, then the version query
//! controller.tick();
//! controller.tick();
//! assert_eq!(controller.comm().serial().sent(), b"$I\r");
//!
//! // Grbl answers
//! controller
//!     .serial_mut()
//!     .feed(b"[VER:1.1h.20190825:]\r\n[OPT:V,15,128]\r\nok\r\n");
//! controller.tick();
//! controller.tick();
//! assert!(controller.display().contains("1.1h"));
//! assert!(controller.display().contains("OK"));
//!
//! // Hand-over after the version has been shown
//! controller.clock_mut().advance(1000);
//! controller.tick();
//! assert_eq!(controller.current_mode(), ModeKind::Command);
//! ```

use crate::comm::Communication;
use crate::config::Config;
use crate::controls::UserControls;
use crate::modes::{ModeContext, ModeKind, ModeSet};
use crate::traits::{Board, Clock, Peripherals};

/// Lends the shared components to a mode call; expanded inline so the
/// borrows stay disjoint from `self.modes`.
macro_rules! mode_context {
    ($self:ident, $now:expr) => {
        ModeContext::<B>::new(
            $now,
            &mut $self.comm,
            $self.controls.events_mut(),
            &mut $self.display,
            &mut $self.led,
            &mut $self.target_mode,
            $self.config.working_mode,
        )
    };
}

/// The mode supervisor.
///
/// # Type Parameter
///
/// - `B`: The hardware set ([`Board`] trait)
pub struct ModeController<B: Board> {
    config: Config,
    comm: Communication<B::Serial, ModeSet>,
    controls: UserControls<B::Panel>,
    display: B::Display,
    led: B::Led,
    clock: B::Clock,
    modes: ModeSet,
    current_mode: ModeKind,
    target_mode: ModeKind,
    last_tick_ms: u64,
}

impl<B: Board> ModeController<B> {
    /// Takes ownership of the peripherals and activates the initialization mode.
    pub fn new(config: Config, peripherals: Peripherals<B>) -> Self {
        let Peripherals {
            serial,
            panel,
            display,
            led,
            clock,
        } = peripherals;

        let now = clock.now_ms();
        let mut controller = Self {
            comm: Communication::new(serial),
            controls: UserControls::new(panel, config.controls.clone()),
            display,
            led,
            clock,
            modes: ModeSet::new(config.timing.clone()),
            current_mode: ModeKind::Initialization,
            target_mode: ModeKind::Initialization,
            last_tick_ms: now,
            config,
        };

        info!("activating {=str}", controller.current_mode.name());
        let mut ctx = mode_context!(controller, now);
        controller
            .modes
            .activate(ModeKind::Initialization, &mut ctx);
        controller
    }

    /// Runs one scheduler iteration.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        self.last_tick_ms = now;

        self.comm.tick(now, &mut self.modes);
        self.controls.tick();

        let current = self.current_mode;
        let mut ctx = mode_context!(self, now);
        self.modes.tick(current, &mut ctx);

        self.apply_switch(now);
    }

    /// Requests a switch to `mode`; it takes effect at the end of the next tick.
    ///
    /// Requesting the mode that is already active does nothing.
    pub fn switch_to_mode(&mut self, mode: ModeKind) {
        if self.target_mode != mode {
            info!("mode switch to {=str} requested", mode.name());
        }
        self.target_mode = mode;
    }

    /// Requests a switch to the configured working mode.
    pub fn switch_to_initial_working_mode(&mut self) {
        self.switch_to_mode(self.config.working_mode);
    }

    /// The mode currently receiving ticks.
    pub fn current_mode(&self) -> ModeKind {
        self.current_mode
    }

    /// The mode that will be active after the next switch point.
    pub fn target_mode(&self) -> ModeKind {
        self.target_mode
    }

    /// Time of the last tick (or of construction).
    pub fn last_tick_ms(&self) -> u64 {
        self.last_tick_ms
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// All mode instances.
    pub fn modes(&self) -> &ModeSet {
        &self.modes
    }

    /// Protocol engine.
    pub fn comm(&self) -> &Communication<B::Serial, ModeSet> {
        &self.comm
    }

    /// User input pipeline.
    pub fn controls(&self) -> &UserControls<B::Panel> {
        &self.controls
    }

    /// Character display.
    pub fn display(&self) -> &B::Display {
        &self.display
    }

    /// Status LED.
    pub fn led(&self) -> &B::Led {
        &self.led
    }

    /// Time source.
    pub fn clock(&self) -> &B::Clock {
        &self.clock
    }

    /// Mutable access to the Grbl serial link.
    pub fn serial_mut(&mut self) -> &mut B::Serial {
        self.comm.serial_mut()
    }

    /// Mutable access to the control panel.
    pub fn panel_mut(&mut self) -> &mut B::Panel {
        self.controls.panel_mut()
    }

    /// Mutable access to the display.
    pub fn display_mut(&mut self) -> &mut B::Display {
        &mut self.display
    }

    /// Mutable access to the time source.
    pub fn clock_mut(&mut self) -> &mut B::Clock {
        &mut self.clock
    }

    fn apply_switch(&mut self, now: u64) {
        if self.target_mode == self.current_mode {
            return;
        }

        let old = self.current_mode;
        let new = self.target_mode;
        info!("switching {=str} -> {=str}", old.name(), new.name());

        let mut ctx = mode_context!(self, now);
        self.modes.deactivate(old, &mut ctx);
        self.current_mode = new;
        let mut ctx = mode_context!(self, now);
        self.modes.activate(new, &mut ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockBoard;
    use crate::modes::InitState;

    fn controller() -> ModeController<MockBoard> {
        ModeController::new(Config::default(), MockBoard::peripherals())
    }

    // =========================================================================
    // Construction Tests
    // =========================================================================

    #[test]
    fn starts_in_initialization() {
        let controller = controller();
        assert_eq!(controller.current_mode(), ModeKind::Initialization);
        assert_eq!(controller.target_mode(), ModeKind::Initialization);
        assert_eq!(
            controller.modes().initialization.state(),
            InitState::Initial
        );
        assert!(!controller.comm().is_busy());
    }

    #[test]
    fn first_tick_draws_banner() {
        let mut controller = controller();
        controller.tick();
        assert!(controller.display().line(0).starts_with("Mrkt "));
        assert_eq!(
            controller.modes().initialization.state(),
            InitState::GrblSearchStart
        );
    }

    // =========================================================================
    // Switch Tests
    // =========================================================================

    #[test]
    fn external_switch_is_deferred_to_tick() {
        let mut controller = controller();
        controller.switch_to_mode(ModeKind::Passthrough);
        assert_eq!(controller.current_mode(), ModeKind::Initialization);
        assert_eq!(controller.target_mode(), ModeKind::Passthrough);

        controller.tick();
        assert_eq!(controller.current_mode(), ModeKind::Passthrough);
        let passthrough = &controller.modes().passthrough;
        assert!(passthrough.is_active());
        assert_eq!(passthrough.activations(), 1);
        assert_eq!(passthrough.ticks(), 0, "activated after the tick");
        assert!(controller.display().contains("Passthrough mode"));
    }

    #[test]
    fn switch_to_same_mode_is_a_no_op() {
        let mut controller = controller();
        controller.switch_to_mode(ModeKind::Command);
        controller.tick();
        controller.switch_to_mode(ModeKind::Command);
        controller.tick();

        let command = &controller.modes().command;
        assert_eq!(command.activations(), 1);
        assert_eq!(command.deactivations(), 0);
        assert_eq!(command.ticks(), 1);
    }

    #[test]
    fn deactivate_precedes_activate() {
        let mut controller = controller();
        controller.switch_to_mode(ModeKind::Command);
        controller.tick();
        controller.switch_to_mode(ModeKind::Passthrough);
        controller.tick();

        assert!(!controller.modes().command.is_active());
        assert_eq!(controller.modes().command.deactivations(), 1);
        assert!(controller.modes().passthrough.is_active());
    }

    #[test]
    fn working_mode_follows_config() {
        let config = Config::default().with_working_mode(ModeKind::Passthrough);
        let mut controller: ModeController<MockBoard> =
            ModeController::new(config, MockBoard::peripherals());
        controller.switch_to_initial_working_mode();
        controller.tick();
        assert_eq!(controller.current_mode(), ModeKind::Passthrough);
    }

    #[test]
    fn leaving_initialization_turns_led_off() {
        let mut controller = controller();
        controller.clock_mut().set(600);
        controller.tick();
        assert!(controller.led().on);

        controller.switch_to_mode(ModeKind::Command);
        controller.tick();
        assert!(!controller.led().on);
    }

    // =========================================================================
    // Scheduler Order Tests
    // =========================================================================

    #[test]
    fn controls_are_sampled_before_mode_tick() {
        let mut controller = controller();
        controller.switch_to_mode(ModeKind::Command);
        controller.tick();

        controller.panel_mut().set_keypad_level(0);
        controller.tick();
        // The standby mode drained the event in the same iteration
        assert!(!controller.controls().is_event_available());
    }

    #[test]
    fn tick_records_time() {
        let mut controller = controller();
        controller.clock_mut().advance(42);
        controller.tick();
        assert_eq!(controller.last_tick_ms(), 42);
    }
}

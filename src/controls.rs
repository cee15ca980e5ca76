//! User control sampling and the coalescing event queue.
//!
//! [`UserControls`] reads the control panel once per tick and turns the
//! noisy hardware state into a short stream of [`Event`]s:
//!
//! - Button presses are edge triggered: only buttons that were not pressed
//!   during the previous tick produce an event.
//! - Encoder movement is divided by the configured step size and reported
//!   as a signed delta whenever the divided position changes.
//! - An event of the same type as the most recently queued one is merged
//!   into it by adding the magnitudes.
//!
//! # Example
//!
//! ```rust
//! use mrkt::controls::{EventType, UserControls};
//! use mrkt::config::ControlsConfig;
//! use mrkt::hal::MockPanel;
//!
//! let mut controls: UserControls<MockPanel> =
//!     UserControls::new(MockPanel::new(), ControlsConfig::default().with_inverted(false));
//!
//! // Two detents clockwise between polls
//! controls.panel_mut().turn_encoder(8);
//! controls.tick();
//!
//! let event = controls.get_event().unwrap();
//! assert_eq!(event.kind, EventType::EncChanged);
//! assert_eq!(event.magnitude, 2);
//! assert!(!controls.is_event_available());
//! ```

use heapless::Deque;

use crate::config::{ControlsConfig, EVENT_QUEUE_SIZE};
use crate::traits::ControlPanel;

// ============================================================================
// Events
// ============================================================================

/// Kinds of user interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventType {
    /// Keypad left.
    KeyLeft,
    /// Keypad right.
    KeyRight,
    /// Keypad up.
    KeyUp,
    /// Keypad down.
    KeyDown,
    /// Keypad select.
    KeySelect,
    /// Encoder wheel turned; the magnitude is the signed step count.
    EncChanged,
    /// Encoder push button.
    EncButton,
    /// Mode button.
    ModeButton,
}

impl EventType {
    /// Short label used when echoing events on the display.
    pub const fn label(&self) -> &'static str {
        match self {
            EventType::KeyLeft => "KP Left",
            EventType::KeyRight => "KP Right",
            EventType::KeyUp => "KP Up",
            EventType::KeyDown => "KP Down",
            EventType::KeySelect => "KP Select",
            EventType::EncChanged => "E Wheel",
            EventType::EncButton => "E Button",
            EventType::ModeButton => "M Button",
        }
    }
}

/// One queued user interaction.
///
/// For [`EventType::EncChanged`] the magnitude is the number of steps
/// turned (negative for the other direction); for buttons it is the number
/// of presses merged into this event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// What happened.
    pub kind: EventType,
    /// Signed count or delta.
    pub magnitude: i8,
}

impl Event {
    /// Creates an event.
    pub const fn new(kind: EventType, magnitude: i8) -> Self {
        Self { kind, magnitude }
    }
}

// ============================================================================
// Button Masks
// ============================================================================

/// Bit values of the sampled button state.
pub struct ButtonMask;

impl ButtonMask {
    /// Keypad up.
    pub const UP: u8 = 1;
    /// Keypad down.
    pub const DOWN: u8 = 2;
    /// Keypad left.
    pub const LEFT: u8 = 4;
    /// Keypad right.
    pub const RIGHT: u8 = 8;
    /// Keypad select.
    pub const SELECT: u8 = 16;
    /// Encoder push button.
    pub const ENCODER: u8 = 32;
    /// Mode button.
    pub const MODE: u8 = 64;

    /// Bits in the order their press events are queued.
    const EVENTS: [(u8, EventType); 7] = [
        (Self::UP, EventType::KeyUp),
        (Self::DOWN, EventType::KeyDown),
        (Self::LEFT, EventType::KeyLeft),
        (Self::RIGHT, EventType::KeyRight),
        (Self::SELECT, EventType::KeySelect),
        (Self::ENCODER, EventType::EncButton),
        (Self::MODE, EventType::ModeButton),
    ];
}

/// Maps the keypad ladder level onto at most one pressed button.
fn keypad_mask(level: u16, bands: &[u16; 5]) -> u8 {
    const KEYS: [u8; 5] = [
        ButtonMask::RIGHT,
        ButtonMask::UP,
        ButtonMask::DOWN,
        ButtonMask::LEFT,
        ButtonMask::SELECT,
    ];
    bands
        .iter()
        .position(|upper| level <= *upper)
        .map_or(0, |band| KEYS[band])
}

/// Maps the mode/encoder channel level onto at most one pressed button.
fn button_mask(level: u16, bands: &[u16; 2]) -> u8 {
    if level <= bands[0] {
        ButtonMask::MODE
    } else if level <= bands[1] {
        ButtonMask::ENCODER
    } else {
        0
    }
}

// ============================================================================
// Event Queue
// ============================================================================

/// Bounded FIFO of events with coalescing of repeats.
///
/// # Example
///
/// ```rust
/// use mrkt::controls::{EventQueue, EventType};
///
/// let mut queue: EventQueue<3> = EventQueue::new();
/// queue.queue_event(EventType::KeyUp, 1);
/// queue.queue_event(EventType::KeyUp, 1);
/// queue.queue_event(EventType::KeyUp, 1);
///
/// assert_eq!(queue.len(), 1);
/// assert_eq!(queue.get_event().unwrap().magnitude, 3);
/// ```
#[derive(Clone, Debug)]
pub struct EventQueue<const N: usize> {
    events: Deque<Event, N>,
}

impl<const N: usize> EventQueue<N> {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
        }
    }

    /// Queues an event.
    ///
    /// A full queue drops the event silently, even one that could have been
    /// merged. Otherwise an event of the same type as the most recently
    /// queued one is merged into it (saturating at the `i8` bounds).
    /// Returns `false` if the event was dropped.
    pub fn queue_event(&mut self, kind: EventType, magnitude: i8) -> bool {
        if self.events.is_full() {
            debug!("event queue full, dropping {}", kind);
            return false;
        }

        if let Some(last) = self.events.back_mut() {
            if last.kind == kind {
                last.magnitude = last.magnitude.saturating_add(magnitude);
                return true;
            }
        }

        // Cannot fail: fullness was checked above
        let _ = self.events.push_back(Event::new(kind, magnitude));
        true
    }

    /// Removes and returns the oldest event.
    pub fn get_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Returns the oldest event without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.events.front()
    }

    /// Returns true if an event is waiting.
    pub fn is_event_available(&self) -> bool {
        !self.events.is_empty()
    }

    /// Drops all pending events.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns true if the queue is at capacity.
    pub fn is_full(&self) -> bool {
        self.events.is_full()
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// User Controls
// ============================================================================

/// Largest encoder movement reported by one event, in either direction.
const MAX_ENCODER_STEPS: i32 = i8::MAX as i32;

/// Samples the control panel and feeds the event queue.
///
/// # Type Parameters
///
/// - `P`: The control panel ([`ControlPanel`] trait)
/// - `N`: Event queue capacity
pub struct UserControls<P: ControlPanel, const N: usize = EVENT_QUEUE_SIZE> {
    panel: P,
    config: ControlsConfig,
    events: EventQueue<N>,
    prev_buttons: u8,
    prev_encoder: i32,
}

impl<P: ControlPanel, const N: usize> UserControls<P, N> {
    /// Creates the pipeline with an empty queue and no buttons pressed.
    pub fn new(panel: P, config: ControlsConfig) -> Self {
        Self {
            panel,
            config,
            events: EventQueue::new(),
            prev_buttons: 0,
            prev_encoder: 0,
        }
    }

    /// Samples the panel once and queues the resulting events.
    pub fn tick(&mut self) {
        let current = keypad_mask(self.panel.keypad_level(), &self.config.keypad_bands)
            | button_mask(self.panel.button_level(), &self.config.button_bands);

        let pressed = current & !self.prev_buttons;
        for (bit, kind) in ButtonMask::EVENTS {
            if pressed & bit != 0 {
                self.events.queue_event(kind, 1);
            }
        }
        self.prev_buttons = current;

        let step = self.config.encoder_step.max(1);
        let position = self.panel.encoder_position() / step;
        if position != self.prev_encoder {
            let moved = position.wrapping_sub(self.prev_encoder);
            let reported = moved.clamp(-MAX_ENCODER_STEPS, MAX_ENCODER_STEPS);
            let delta = if self.config.invert_encoder {
                -reported
            } else {
                reported
            } as i8;
            trace!("encoder moved {=i8}", delta);
            self.events.queue_event(EventType::EncChanged, delta);
            // Steps beyond the i8 range are reported on later ticks
            self.prev_encoder = self.prev_encoder.wrapping_add(reported);
        }
    }

    /// Queues an event directly (see [`EventQueue::queue_event`]).
    pub fn queue_event(&mut self, kind: EventType, magnitude: i8) -> bool {
        self.events.queue_event(kind, magnitude)
    }

    /// Removes and returns the oldest event.
    pub fn get_event(&mut self) -> Option<Event> {
        self.events.get_event()
    }

    /// Returns true if an event is waiting.
    pub fn is_event_available(&self) -> bool {
        self.events.is_event_available()
    }

    /// Drops all pending events.
    pub fn clear_events(&mut self) {
        self.events.clear_events();
    }

    /// Shared access to the event queue.
    pub fn events(&self) -> &EventQueue<N> {
        &self.events
    }

    /// Mutable access to the event queue.
    pub fn events_mut(&mut self) -> &mut EventQueue<N> {
        &mut self.events
    }

    /// Bit mask of the buttons pressed during the last tick.
    pub fn pressed_buttons(&self) -> u8 {
        self.prev_buttons
    }

    /// Shared access to the control panel.
    pub fn panel(&self) -> &P {
        &self.panel
    }

    /// Mutable access to the control panel.
    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }
}

//! Button gesture recognition
//!
//! Buttons are wired active-low with pull-ups: a pressed button reads
//! [`Level::Low`]. Each pin has its own [`PinTracker`], fed with level
//! samples (from edge events or polling) and a timestamp. The tracker
//! applies the per-pin debounce window and turns accepted transitions into
//! at most one [`Action`] per gesture.
//!
//! | Button | Gesture                     | Action       |
//! |--------|-----------------------------|--------------|
//! | Select | press (or release)          | `Advance`    |
//! | Write  | press (or release)          | `Upload`     |
//! | Read   | release, held < long press  | `Download`   |
//! | Read   | release, held >= long press | `Shutdown`   |

use std::fmt;
use std::time::{Duration, Instant};

/// Default minimum hold time for a long press on Read
pub const LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(2000);

/// Default quiet window after an accepted transition
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);

/// Default sampling period of the polling loop
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Electrical level of an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Pin pulled high (button released)
    High,
    /// Pin pulled low (button pressed)
    Low,
}

impl Level {
    /// True when the level means "pressed" on active-low wiring
    pub fn is_pressed(self) -> bool {
        self == Level::Low
    }
}

/// The three logical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Cycle through profiles
    Select,
    /// Upload the selected image to the radio
    Write,
    /// Download from the radio (long press: power off)
    Read,
}

impl Button {
    /// All buttons in a fixed order
    pub const ALL: [Button; 3] = [Button::Select, Button::Write, Button::Read];
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::Select => "select",
            Button::Write => "write",
            Button::Read => "read",
        };
        f.write_str(name)
    }
}

/// Logical actions dispatched to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Select the next profile
    Advance,
    /// Upload the selected profile's image
    Upload,
    /// Download from the radio into a new numbered image
    Download,
    /// Power off the host
    Shutdown,
}

/// Which edge fires Select and Write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    /// Fire on the falling edge (button goes down)
    #[default]
    Press,
    /// Fire on the rising edge (button comes up)
    Release,
}

/// Timing constants shared by both delivery strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Transitions closer than this to the previous accepted one are ignored
    pub debounce: Duration,
    /// Minimum hold time for a long press
    pub long_press: Duration,
    /// Polling loop period
    pub poll_interval: Duration,
    /// Edge that fires Select and Write
    pub trigger: Trigger,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_WINDOW,
            long_press: LONG_PRESS_THRESHOLD,
            poll_interval: POLL_INTERVAL,
            trigger: Trigger::Press,
        }
    }
}

/// Per-pin state
#[derive(Debug, Clone, Copy)]
pub struct ButtonState {
    /// Last accepted level
    pub last_level: Level,
    /// When the current press started (Read only)
    pub press_start: Option<Instant>,
    /// Time of the last accepted transition
    pub last_accepted: Option<Instant>,
}

/// Result of feeding a level sample to a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Same level as the last accepted one
    Unchanged,
    /// Transition inside the debounce window, ignored
    Debounced,
    /// Transition accepted, possibly completing a gesture
    Accepted(Option<Action>),
}

impl Update {
    /// The action produced by this update, if any
    pub fn action(self) -> Option<Action> {
        match self {
            Update::Accepted(action) => action,
            _ => None,
        }
    }
}

/// Debounce and gesture state machine for one pin
#[derive(Debug, Clone)]
pub struct PinTracker {
    button: Button,
    timing: Timing,
    state: ButtonState,
}

impl PinTracker {
    /// Create a tracker with the pin's current level
    ///
    /// A button already held at startup does not produce a gesture when it
    /// is released.
    pub fn new(button: Button, timing: Timing, initial: Level) -> Self {
        Self {
            button,
            timing,
            state: ButtonState {
                last_level: initial,
                press_start: None,
                last_accepted: None,
            },
        }
    }

    /// Button this tracker belongs to
    pub fn button(&self) -> Button {
        self.button
    }

    /// Current state
    pub fn state(&self) -> &ButtonState {
        &self.state
    }

    /// Feed a level sample observed at `now`
    pub fn update(&mut self, level: Level, now: Instant) -> Update {
        if level == self.state.last_level {
            return Update::Unchanged;
        }

        if let Some(prev) = self.state.last_accepted {
            if now.saturating_duration_since(prev) < self.timing.debounce {
                log::trace!("{}: transition to {:?} debounced", self.button, level);
                return Update::Debounced;
            }
        }

        self.state.last_level = level;
        self.state.last_accepted = Some(now);
        log::trace!("{}: accepted {:?}", self.button, level);

        let action = match (self.button, level) {
            (Button::Read, Level::Low) => {
                self.state.press_start = Some(now);
                None
            }
            (Button::Read, Level::High) => self.state.press_start.take().map(|start| {
                let held = now.saturating_duration_since(start);
                if held >= self.timing.long_press {
                    log::debug!("read: long press ({:?})", held);
                    Action::Shutdown
                } else {
                    Action::Download
                }
            }),
            (button, level) => {
                let fires = match self.timing.trigger {
                    Trigger::Press => level == Level::Low,
                    Trigger::Release => level == Level::High,
                };
                match (fires, button) {
                    (true, Button::Select) => Some(Action::Advance),
                    (true, Button::Write) => Some(Action::Upload),
                    _ => None,
                }
            }
        };

        Update::Accepted(action)
    }
}

/// Receiver of recognised gestures
///
/// Implementations must tolerate concurrent calls from different pins.
pub trait ActionSink: Send + Sync {
    /// Handle one action; failures are the sink's own business
    fn dispatch(&self, action: Action);
}

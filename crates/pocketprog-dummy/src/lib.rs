//! pocketprog-dummy - Simulated GPIO buttons for testing
//!
//! This crate provides a GPIO backend whose line levels are set from code.
//! It's useful for development on machines without buttons and for testing
//! both input delivery strategies without hardware.
//!
//! Lines idle high (released) like pulled-up buttons. [`DummyGpio::press`]
//! pulls a line low for a while and releases it again. Edge notifications
//! can be switched off to exercise the polling fallback.

use pocketprog_core::button::{Button, Level};
use pocketprog_core::input::{ButtonPins, Edge, EdgeSignal, GpioBackend, InputLine};
use pocketprog_core::{Error, Result};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for the dummy backend
#[derive(Debug, Clone, Copy)]
pub struct DummyConfig {
    /// Button line numbers
    pub pins: ButtonPins,
    /// Whether edge notifications are offered
    pub edges: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            pins: ButtonPins::default(),
            edges: true,
        }
    }
}

#[derive(Default)]
struct Lines {
    levels: HashMap<u32, Level>,
    subscribers: HashMap<u32, Vec<Sender<Edge>>>,
}

impl Lines {
    fn level(&self, line: u32) -> Level {
        self.levels.get(&line).copied().unwrap_or(Level::High)
    }
}

/// Simulated button lines
///
/// Clones share the same lines, so a test can keep one handle to press
/// buttons while the delivery threads own lines requested from another.
#[derive(Clone, Default)]
pub struct DummyGpio {
    config: DummyConfig,
    lines: Arc<Mutex<Lines>>,
}

impl DummyGpio {
    /// Create a backend with all lines released
    pub fn new(config: DummyConfig) -> Self {
        log::debug!(
            "dummy: buttons on lines {}/{}/{}, edges {}",
            config.pins.select,
            config.pins.write,
            config.pins.read,
            if config.edges { "on" } else { "off" }
        );
        Self {
            config,
            lines: Arc::default(),
        }
    }

    /// Configured button lines
    pub fn pins(&self) -> ButtonPins {
        self.config.pins
    }

    fn lock(&self) -> MutexGuard<'_, Lines> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current level of `line`
    pub fn level(&self, line: u32) -> Level {
        self.lock().level(line)
    }

    /// Drive `line` to `level`, notifying edge listeners on a change
    ///
    /// The edge carries the time of this call, like a kernel event timestamp.
    pub fn set_level(&self, line: u32, level: Level) {
        let at = Instant::now();
        let mut lines = self.lock();
        if lines.level(line) == level {
            return;
        }
        lines.levels.insert(line, level);
        log::trace!("dummy: line {} -> {:?}", line, level);
        if let Some(subscribers) = lines.subscribers.get_mut(&line) {
            subscribers.retain(|tx| tx.send(Edge::new(level, at)).is_ok());
        }
    }

    /// Hold `line` low for `hold`, then release it
    ///
    /// Blocks the calling thread for the duration of the press.
    pub fn press(&self, line: u32, hold: Duration) {
        self.set_level(line, Level::Low);
        thread::sleep(hold);
        self.set_level(line, Level::High);
    }

    /// Press one of the three buttons
    pub fn press_button(&self, button: Button, hold: Duration) {
        self.press(self.config.pins.line(button), hold);
    }
}

impl GpioBackend for DummyGpio {
    fn name(&self) -> &str {
        "dummy"
    }

    fn request_input(&self, line: u32) -> Result<Box<dyn InputLine>> {
        Ok(Box::new(DummyLine {
            line,
            lines: Arc::clone(&self.lines),
        }))
    }

    fn request_edges(&self, line: u32) -> Result<Box<dyn EdgeSignal>> {
        if !self.config.edges {
            return Err(Error::EdgeUnsupported(
                "edge notifications disabled on dummy backend".into(),
            ));
        }
        let (tx, rx) = mpsc::channel();
        self.lock().subscribers.entry(line).or_default().push(tx);
        Ok(Box::new(DummyEdge {
            line: DummyLine {
                line,
                lines: Arc::clone(&self.lines),
            },
            events: rx,
        }))
    }
}

struct DummyLine {
    line: u32,
    lines: Arc<Mutex<Lines>>,
}

impl InputLine for DummyLine {
    fn level(&mut self) -> Result<Level> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(lines.level(self.line))
    }
}

struct DummyEdge {
    line: DummyLine,
    events: Receiver<Edge>,
}

impl InputLine for DummyEdge {
    fn level(&mut self) -> Result<Level> {
        self.line.level()
    }
}

impl EdgeSignal for DummyEdge {
    fn wait_edge(&mut self, timeout: Duration) -> Result<Option<Edge>> {
        match self.events.recv_timeout(timeout) {
            Ok(edge) => Ok(Some(edge)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Gpio(format!(
                "dummy line {} lost its event source",
                self.line.line
            ))),
        }
    }
}

/// Parse backend options
///
/// - `edges=on|off` - offer edge notifications (default on)
/// - `select=N`, `write=N`, `read=N` - button line numbers
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "edges" => {
                config.edges = match *value {
                    "on" | "1" | "true" | "yes" => true,
                    "off" | "0" | "false" | "no" => false,
                    _ => return Err(format!("Invalid edges value: {}", value)),
                };
            }
            "select" | "write" | "read" => {
                let line = value
                    .parse()
                    .map_err(|_| format!("Invalid {} value: {}", key, value))?;
                match *key {
                    "select" => config.pins.select = line,
                    "write" => config.pins.write = line,
                    _ => config.pins.read = line,
                }
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketprog_core::button::{Action, ActionSink, Timing};
    use pocketprog_core::input::probe_delivery;

    #[derive(Default)]
    struct Recorder {
        actions: Mutex<Vec<Action>>,
    }

    impl ActionSink for Recorder {
        fn dispatch(&self, action: Action) {
            self.actions.lock().unwrap().push(action);
        }
    }

    impl Recorder {
        fn wait_for(&self, count: usize) -> Vec<Action> {
            let deadline = Instant::now() + Duration::from_secs(3);
            loop {
                let actions = self.actions.lock().unwrap().clone();
                if actions.len() >= count || Instant::now() > deadline {
                    return actions;
                }
                thread::sleep(Duration::from_millis(5));
            }
        }
    }

    fn timing() -> Timing {
        Timing {
            debounce: Duration::from_millis(10),
            long_press: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
            ..Timing::default()
        }
    }

    fn exercise(gpio: DummyGpio, expected_strategy: &str) {
        let delivery = probe_delivery(&gpio, &gpio.pins(), timing()).unwrap();
        assert_eq!(delivery.name(), expected_strategy);

        let recorder = Arc::new(Recorder::default());
        let monitor = delivery.start(recorder.clone()).unwrap();
        assert_eq!(monitor.strategy(), expected_strategy);
        thread::sleep(Duration::from_millis(50));

        gpio.press_button(Button::Select, Duration::from_millis(40));
        assert_eq!(recorder.wait_for(1), [Action::Advance]);
        thread::sleep(Duration::from_millis(30));

        gpio.press_button(Button::Read, Duration::from_millis(40));
        assert_eq!(recorder.wait_for(2), [Action::Advance, Action::Download]);
        thread::sleep(Duration::from_millis(30));

        gpio.press_button(Button::Read, Duration::from_millis(320));
        assert_eq!(
            recorder.wait_for(3),
            [Action::Advance, Action::Download, Action::Shutdown]
        );
        thread::sleep(Duration::from_millis(30));

        gpio.press_button(Button::Write, Duration::from_millis(40));
        assert_eq!(recorder.wait_for(4)[3], Action::Upload);

        monitor.stop();
    }

    #[test]
    fn test_interrupt_delivery() {
        exercise(DummyGpio::new(DummyConfig::default()), "interrupt");
    }

    #[test]
    fn test_polling_fallback() {
        let config = DummyConfig {
            edges: false,
            ..DummyConfig::default()
        };
        exercise(DummyGpio::new(config), "polling");
    }

    #[test]
    fn test_bounce_collapses_to_one_action() {
        let gpio = DummyGpio::new(DummyConfig::default());
        let delivery = probe_delivery(&gpio, &gpio.pins(), timing()).unwrap();
        let recorder = Arc::new(Recorder::default());
        let monitor = delivery.start(recorder.clone()).unwrap();
        thread::sleep(Duration::from_millis(50));

        let line = gpio.pins().select;
        for _ in 0..3 {
            gpio.set_level(line, Level::Low);
            gpio.set_level(line, Level::High);
        }
        gpio.set_level(line, Level::Low);
        thread::sleep(Duration::from_millis(60));
        gpio.set_level(line, Level::High);
        thread::sleep(Duration::from_millis(60));

        assert_eq!(recorder.wait_for(1), [Action::Advance]);
        monitor.stop();
    }

    /// Sink whose first action keeps the delivery thread busy
    struct SlowFirst {
        recorder: Recorder,
        busy: Duration,
    }

    impl ActionSink for SlowFirst {
        fn dispatch(&self, action: Action) {
            let first = self.recorder.actions.lock().unwrap().is_empty();
            self.recorder.dispatch(action);
            if first {
                thread::sleep(self.busy);
            }
        }
    }

    #[test]
    fn test_hold_while_handler_busy_still_shuts_down() {
        let gpio = DummyGpio::new(DummyConfig::default());
        let delivery = probe_delivery(&gpio, &gpio.pins(), timing()).unwrap();
        assert_eq!(delivery.name(), "interrupt");
        let sink = Arc::new(SlowFirst {
            recorder: Recorder::default(),
            busy: Duration::from_millis(800),
        });
        let monitor = delivery.start(sink.clone()).unwrap();
        thread::sleep(Duration::from_millis(50));

        gpio.press_button(Button::Read, Duration::from_millis(40));
        thread::sleep(Duration::from_millis(50));
        // The download handler is still running during this hold
        gpio.press_button(Button::Read, Duration::from_millis(400));

        assert_eq!(
            sink.recorder.wait_for(2),
            [Action::Download, Action::Shutdown]
        );
        monitor.stop();
    }

    #[test]
    fn test_set_level_notifies_only_on_change() {
        let gpio = DummyGpio::new(DummyConfig::default());
        let mut edge = gpio.request_edges(7).unwrap();
        gpio.set_level(7, Level::High);
        assert_eq!(edge.wait_edge(Duration::from_millis(10)).unwrap(), None);
        let before = Instant::now();
        gpio.set_level(7, Level::Low);
        let event = edge.wait_edge(Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(event.level, Level::Low);
        assert!(event.at >= before);
        assert_eq!(edge.level().unwrap(), Level::Low);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("edges", "off"), ("read", "4")]).unwrap();
        assert!(!config.edges);
        assert_eq!(config.pins.read, 4);
        assert!(parse_options(&[("edges", "maybe")]).is_err());
    }
}

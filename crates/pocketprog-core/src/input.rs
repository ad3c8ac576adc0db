//! Button input delivery
//!
//! GPIO backends expose two capabilities per pin:
//!
//! - [`InputLine`]: read the current level (always available)
//! - [`EdgeSignal`]: block until the level changes (interrupt driven, may be
//!   unavailable on some platforms or without permissions)
//!
//! [`InputDelivery`] is the strategy that turns those into actions. There are
//! two implementations, chosen once at startup by [`probe_delivery`]:
//!
//! - [`InterruptDelivery`]: one thread per pin blocking on edge events.
//!   Threads for different pins run concurrently, so the [`ActionSink`] must
//!   serialise access to shared state.
//! - [`PollingDelivery`]: a single thread sampling all pins every tick.

use crate::button::{Action, ActionSink, Button, Level, PinTracker, Timing, Update};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often blocked edge waits wake up to check for a stop request
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Pause after a failed read before trying again
const ERROR_BACKOFF: Duration = Duration::from_millis(200);

/// Level-only access to one input pin
pub trait InputLine: Send {
    /// Read the current level
    fn level(&mut self) -> Result<Level>;
}

/// One level change reported by an edge source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Level after the change
    pub level: Level,
    /// When the change happened, not when it was read
    pub at: Instant,
}

impl Edge {
    /// Edge observed at `at`
    pub fn new(level: Level, at: Instant) -> Self {
        Self { level, at }
    }
}

/// Edge notifications for one input pin
pub trait EdgeSignal: InputLine {
    /// Wait for the next level change
    ///
    /// Returns the change, or `None` if `timeout` expired first. Edges that
    /// queued up while the caller was busy keep their original timestamps.
    fn wait_edge(&mut self, timeout: Duration) -> Result<Option<Edge>>;
}

/// GPIO line numbers for the three buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPins {
    /// Select button line
    pub select: u32,
    /// Write button line
    pub write: u32,
    /// Read button line
    pub read: u32,
}

impl Default for ButtonPins {
    /// BCM 13 / 19 / 26 on a Raspberry Pi header
    fn default() -> Self {
        Self {
            select: 13,
            write: 19,
            read: 26,
        }
    }
}

impl ButtonPins {
    /// Line number of `button`
    pub fn line(&self, button: Button) -> u32 {
        match button {
            Button::Select => self.select,
            Button::Write => self.write,
            Button::Read => self.read,
        }
    }
}

/// A source of button inputs
pub trait GpioBackend {
    /// Short name for log messages
    fn name(&self) -> &str;

    /// Request a pin for level reads
    fn request_input(&self, line: u32) -> Result<Box<dyn InputLine>>;

    /// Request a pin with edge notifications
    fn request_edges(&self, line: u32) -> Result<Box<dyn EdgeSignal>>;
}

/// Shared stop flag for delivery threads
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Create a cleared flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask all threads holding this flag to exit
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A running delivery strategy
pub struct Monitor {
    strategy: &'static str,
    stop: StopFlag,
    threads: Vec<JoinHandle<()>>,
}

impl Monitor {
    /// Name of the active strategy
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    /// Stop all delivery threads and wait for them
    ///
    /// A thread busy inside an action handler finishes that action first.
    pub fn stop(self) {
        self.stop.stop();
        for handle in self.threads {
            if handle.join().is_err() {
                log::error!("Input thread panicked");
            }
        }
    }
}

/// A way of delivering button gestures to an [`ActionSink`]
pub trait InputDelivery: Send {
    /// Strategy name
    fn name(&self) -> &'static str;

    /// Start delivering; runs until the monitor is stopped
    fn start(self: Box<Self>, sink: Arc<dyn ActionSink>) -> Result<Monitor>;
}

fn deliver(sink: &dyn ActionSink, button: Button, action: Option<Action>) {
    if let Some(action) = action {
        log::debug!("{} button -> {:?}", button, action);
        sink.dispatch(action);
    }
}

/// Interrupt-driven delivery: one blocking edge reader per pin
pub struct InterruptDelivery {
    signals: Vec<(Button, Box<dyn EdgeSignal>)>,
    timing: Timing,
}

impl InterruptDelivery {
    /// Request edge notifications for all three buttons
    ///
    /// Fails if any pin cannot deliver edges.
    pub fn open(backend: &dyn GpioBackend, pins: &ButtonPins, timing: Timing) -> Result<Self> {
        let mut signals = Vec::with_capacity(Button::ALL.len());
        for button in Button::ALL {
            signals.push((button, backend.request_edges(pins.line(button))?));
        }
        Ok(Self { signals, timing })
    }
}

impl InputDelivery for InterruptDelivery {
    fn name(&self) -> &'static str {
        "interrupt"
    }

    fn start(self: Box<Self>, sink: Arc<dyn ActionSink>) -> Result<Monitor> {
        let stop = StopFlag::new();
        let timing = self.timing;
        let mut threads = Vec::with_capacity(self.signals.len());

        for (button, signal) in self.signals {
            let sink = Arc::clone(&sink);
            let stop = stop.clone();
            let handle = thread::Builder::new()
                .name(format!("edge-{}", button))
                .spawn(move || edge_loop(button, signal, timing, sink.as_ref(), &stop))?;
            threads.push(handle);
        }

        Ok(Monitor {
            strategy: "interrupt",
            stop,
            threads,
        })
    }
}

fn edge_loop(
    button: Button,
    mut signal: Box<dyn EdgeSignal>,
    timing: Timing,
    sink: &dyn ActionSink,
    stop: &StopFlag,
) {
    let initial = signal.level().unwrap_or(Level::High);
    let mut tracker = PinTracker::new(button, timing, initial);
    // A change suppressed by debounce is re-checked once the window passes,
    // otherwise a release inside the window would be lost.
    let mut settle_pending = false;

    while !stop.is_stopped() {
        let timeout = if settle_pending {
            timing.debounce
        } else {
            STOP_CHECK_INTERVAL
        };

        // Queued edges are judged by when they happened, so a hold made
        // while a handler was busy still measures as a hold.
        let sample = match signal.wait_edge(timeout) {
            Ok(Some(edge)) => Some((edge.level, edge.at)),
            Ok(None) if settle_pending => match signal.level() {
                Ok(level) => Some((level, Instant::now())),
                Err(e) => {
                    log::warn!("{}: failed to read level: {}", button, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::error!("{}: edge wait failed: {}", button, e);
                thread::sleep(ERROR_BACKOFF);
                None
            }
        };

        if let Some((level, at)) = sample {
            match tracker.update(level, at) {
                Update::Debounced => settle_pending = true,
                Update::Unchanged => settle_pending = false,
                Update::Accepted(action) => {
                    settle_pending = false;
                    deliver(sink, button, action);
                }
            }
        }
    }
}

/// Polling delivery: one thread samples every pin each tick
pub struct PollingDelivery {
    lines: Vec<(Button, Box<dyn InputLine>)>,
    timing: Timing,
}

impl PollingDelivery {
    /// Request level reads for all three buttons
    pub fn open(backend: &dyn GpioBackend, pins: &ButtonPins, timing: Timing) -> Result<Self> {
        let mut lines = Vec::with_capacity(Button::ALL.len());
        for button in Button::ALL {
            lines.push((button, backend.request_input(pins.line(button))?));
        }
        Ok(Self { lines, timing })
    }
}

impl InputDelivery for PollingDelivery {
    fn name(&self) -> &'static str {
        "polling"
    }

    fn start(self: Box<Self>, sink: Arc<dyn ActionSink>) -> Result<Monitor> {
        let stop = StopFlag::new();
        let thread_stop = stop.clone();
        let timing = self.timing;
        let lines = self.lines;

        let handle = thread::Builder::new()
            .name("button-poll".into())
            .spawn(move || poll_loop(lines, timing, sink.as_ref(), &thread_stop))?;

        Ok(Monitor {
            strategy: "polling",
            stop,
            threads: vec![handle],
        })
    }
}

fn poll_loop(
    mut lines: Vec<(Button, Box<dyn InputLine>)>,
    timing: Timing,
    sink: &dyn ActionSink,
    stop: &StopFlag,
) {
    let mut trackers: Vec<PinTracker> = lines
        .iter_mut()
        .map(|(button, line)| PinTracker::new(*button, timing, line.level().unwrap_or(Level::High)))
        .collect();

    while !stop.is_stopped() {
        thread::sleep(timing.poll_interval);

        let mut failed = false;
        for ((button, line), tracker) in lines.iter_mut().zip(trackers.iter_mut()) {
            match line.level() {
                Ok(level) => deliver(sink, *button, tracker.update(level, Instant::now()).action()),
                Err(e) => {
                    log::warn!("{}: failed to read level: {}", button, e);
                    failed = true;
                }
            }
        }
        if failed {
            thread::sleep(ERROR_BACKOFF);
        }
    }
}

/// Pick the delivery strategy supported by `backend`
///
/// Edge notifications are tried first. If they cannot be set up the pins
/// are re-requested for polling; this is an expected fallback and only
/// logged. An error is returned only if polling is impossible too.
pub fn probe_delivery(
    backend: &dyn GpioBackend,
    pins: &ButtonPins,
    timing: Timing,
) -> Result<Box<dyn InputDelivery>> {
    match InterruptDelivery::open(backend, pins, timing) {
        Ok(delivery) => {
            log::info!("{}: using edge notifications", backend.name());
            Ok(Box::new(delivery))
        }
        Err(e) => {
            log::info!(
                "{}: edge notifications unavailable ({}), polling every {:?}",
                backend.name(),
                e,
                timing.poll_interval
            );
            let delivery = PollingDelivery::open(backend, pins, timing).map_err(|e| match e {
                Error::Gpio(msg) => Error::Gpio(format!("cannot read buttons: {}", msg)),
                other => other,
            })?;
            Ok(Box::new(delivery))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Edge source replaying edges that were queued while the reader was busy
    struct Replay {
        edges: VecDeque<Edge>,
        level: Level,
        stop: StopFlag,
    }

    impl InputLine for Replay {
        fn level(&mut self) -> Result<Level> {
            Ok(self.level)
        }
    }

    impl EdgeSignal for Replay {
        fn wait_edge(&mut self, _timeout: Duration) -> Result<Option<Edge>> {
            let edge = self.edges.pop_front();
            match edge {
                Some(edge) => self.level = edge.level,
                None => self.stop.stop(),
            }
            Ok(edge)
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Action>>);

    impl ActionSink for Recorder {
        fn dispatch(&self, action: Action) {
            self.0.lock().unwrap().push(action);
        }
    }

    fn replay(button: Button, timing: Timing, edges: &[(u64, Level)]) -> Vec<Action> {
        let t0 = Instant::now();
        let stop = StopFlag::new();
        let signal = Replay {
            edges: edges
                .iter()
                .map(|&(ms, level)| Edge::new(level, t0 + Duration::from_millis(ms)))
                .collect(),
            level: Level::High,
            stop: stop.clone(),
        };
        let sink = Recorder::default();
        edge_loop(button, Box::new(signal), timing, &sink, &stop);
        sink.0.into_inner().unwrap()
    }

    fn timing() -> Timing {
        Timing {
            long_press: Duration::from_millis(200),
            ..Timing::default()
        }
    }

    #[test]
    fn test_queued_hold_is_measured_by_event_time() {
        // Both edges are read back-to-back, but happened 400ms apart
        let actions = replay(Button::Read, timing(), &[(0, Level::Low), (400, Level::High)]);
        assert_eq!(actions, [Action::Shutdown]);
    }

    #[test]
    fn test_queued_short_press_downloads() {
        let actions = replay(
            Button::Read,
            timing(),
            &[
                (0, Level::Low),
                (80, Level::High),
                (300, Level::Low),
                (700, Level::High),
            ],
        );
        assert_eq!(actions, [Action::Download, Action::Shutdown]);
    }

    #[test]
    fn test_queued_bounces_debounce_on_event_time() {
        let actions = replay(
            Button::Select,
            timing(),
            &[
                (0, Level::Low),
                (5, Level::High),
                (10, Level::Low),
                (300, Level::High),
            ],
        );
        assert_eq!(actions, [Action::Advance]);
    }
}

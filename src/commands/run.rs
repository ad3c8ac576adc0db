//! Button-driven controller loop
//!
//! Startup order matters:
//!
//! 1. SIGINT/SIGTERM are blocked on the main thread before any other thread
//!    exists, so every thread inherits the mask and only the signal thread
//!    sees them.
//! 2. Input delivery starts; from here on button actions run on the
//!    delivery threads.
//! 3. The banner is shown for a few seconds, then the selected profile
//!    unless a button was pressed in the meantime.
//!
//! The main thread then waits for an [`ExitReason`] and tears down.

use crate::backends;
use crate::cli::{FireOn, TimingArgs};
use crate::display;
use nix::sys::signal::{SigSet, Signal};
use pocketprog_core::button::{Action, ActionSink, Timing, Trigger};
use pocketprog_core::controller::{Controller, ExitReason};
use pocketprog_core::input::probe_delivery;
use pocketprog_core::power::{LoggedPower, PowerControl, SystemPower};
use pocketprog_core::process::ProcessRunner;
use pocketprog_core::profile::ProfileSelector;
use pocketprog_core::reporter::ReporterHandle;
use pocketprog_core::tool::ToolConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long the banner stays up before the selected profile is shown
const BANNER_TIME: Duration = Duration::from_secs(5);

/// Settings for the controller loop
pub struct RunOptions {
    /// GPIO backend string
    pub gpio: String,
    /// Button timing
    pub timing: Timing,
    /// Power-off command line
    pub shutdown_command: String,
    /// Tool invocation settings
    pub tool: ToolConfig,
    /// Log tool invocations instead of running them
    pub dry_run: bool,
    /// Stream tool output to the display
    pub live_progress: bool,
    /// Display selection (`auto`, `ssd1306[:...]`, `console`, `log`)
    pub display: String,
}

impl From<&TimingArgs> for Timing {
    fn from(args: &TimingArgs) -> Self {
        Timing {
            debounce: Duration::from_millis(args.debounce_ms),
            long_press: Duration::from_millis(args.long_press_ms),
            poll_interval: Duration::from_millis(args.poll_ms.max(1)),
            trigger: match args.fire_on {
                FireOn::Press => Trigger::Press,
                FireOn::Release => Trigger::Release,
            },
        }
    }
}

fn termination_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set
}

fn spawn_signal_thread(set: SigSet, exit: Sender<ExitReason>) -> std::io::Result<()> {
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || match set.wait() {
            Ok(signal) => {
                log::info!("Received {}", signal.as_str());
                let _ = exit.send(ExitReason::Signal(signal as i32));
            }
            Err(e) => log::error!("Waiting for signals failed: {}", e),
        })?;
    Ok(())
}

fn power_control(opts: &RunOptions) -> Result<Box<dyn PowerControl>, Box<dyn std::error::Error>> {
    if opts.dry_run {
        return Ok(Box::new(LoggedPower));
    }
    let command: Vec<&str> = opts.shutdown_command.split_whitespace().collect();
    if command.is_empty() {
        return Err("Shutdown command must not be empty".into());
    }
    Ok(Box::new(SystemPower::new(command)))
}

/// Forwards button actions to the controller, remembering that one arrived
struct Pressed {
    controller: Arc<Controller>,
    any: AtomicBool,
}

impl ActionSink for Pressed {
    fn dispatch(&self, action: Action) {
        self.any.store(true, Ordering::SeqCst);
        self.controller.dispatch(action);
    }
}

/// Run the controller until a signal arrives or the host powers off
pub fn run(selector: ProfileSelector, opts: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let signals = termination_signals();
    signals.thread_block()?;

    let backend = backends::open_backend(&opts.gpio)?;
    let power = power_control(&opts)?;

    let (exit_tx, exit_rx) = mpsc::channel();
    spawn_signal_thread(signals, exit_tx.clone())?;

    let (screen, kind) = display::open_display(&opts.display, opts.dry_run)?;
    log::info!("Display: {}", kind);
    let reporter = Arc::new(ReporterHandle::new(screen));
    let controller = Arc::new(
        Controller::new(
            selector,
            Arc::clone(&reporter),
            ProcessRunner::new(opts.dry_run),
            opts.tool,
            power,
        )
        .with_live_progress(opts.live_progress)
        .with_exit_notifier(exit_tx),
    );
    let sink = Arc::new(Pressed {
        controller: Arc::clone(&controller),
        any: AtomicBool::new(false),
    });

    let delivery = probe_delivery(backend.gpio.as_ref(), &backend.pins, opts.timing)?;
    let monitor = delivery.start(sink.clone())?;
    log::info!("Button input: {}", monitor.strategy());

    #[cfg(feature = "dummy")]
    if let Err(e) = start_keyboard(&backend, opts.timing) {
        log::warn!("Keyboard input unavailable: {}", e);
    }

    let reason = wait_for_exit(&exit_rx, &controller, &sink);
    monitor.stop();
    let reason = reason?;

    match reason {
        ExitReason::Signal(_) => log::info!("Exiting"),
        ExitReason::PowerOff => log::info!("Host is powering off"),
    }
    reporter.close();
    Ok(())
}

/// Show the banner, then the selected profile, and wait for an exit request
fn wait_for_exit(
    exit_rx: &Receiver<ExitReason>,
    controller: &Controller,
    sink: &Pressed,
) -> Result<ExitReason, Box<dyn std::error::Error>> {
    controller.reporter().show_banner();
    match exit_rx.recv_timeout(BANNER_TIME) {
        Ok(reason) => return Ok(reason),
        Err(RecvTimeoutError::Timeout) => {}
        Err(RecvTimeoutError::Disconnected) => return Err("Exit channel closed".into()),
    }

    // A press during the banner already put its own screen up
    if !sink.any.load(Ordering::SeqCst) {
        controller.show_current();
    }
    log::info!("Waiting for button press...");
    Ok(exit_rx.recv()?)
}

/// Press simulated buttons from stdin: 1=Select 2=Write 3=Read L=long Read
#[cfg(feature = "dummy")]
fn start_keyboard(backend: &backends::Backend, timing: Timing) -> std::io::Result<()> {
    use pocketprog_core::button::Button;
    use std::io::BufRead;

    let Some(gpio) = backend.simulated.clone() else {
        return Ok(());
    };
    let short = timing.debounce * 2 + Duration::from_millis(50);
    let long = timing.long_press + Duration::from_millis(250);
    let gap = timing.debounce * 2 + timing.poll_interval;

    eprintln!("Keys: 1=Select 2=Write 3=Read L=long Read (then Enter)");

    // Detached: it blocks on stdin and dies with the process.
    thread::Builder::new().name("keyboard".into()).spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            for key in line.trim().chars() {
                match key {
                    '1' => gpio.press_button(Button::Select, short),
                    '2' => gpio.press_button(Button::Write, short),
                    '3' => gpio.press_button(Button::Read, short),
                    'l' | 'L' => gpio.press_button(Button::Read, long),
                    _ => log::warn!("Unknown key {:?}", key),
                }
                thread::sleep(gap);
            }
        }
    })?;
    Ok(())
}

//! Linux GPIO button lines
//!
//! Each button gets its own line request on the GPIO character device,
//! configured as an input with the internal pull-up enabled (buttons short
//! the line to ground). Edge requests additionally enable both-edge
//! detection so the kernel queues an event per level change.

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Bias, EdgeDetection, EdgeKind, Offset, Value};
use gpiocdev::request::{Config, Request};
use nix::time::{clock_gettime, ClockId};

use pocketprog_core::button::Level;
use pocketprog_core::input::{ButtonPins, Edge, EdgeSignal, GpioBackend, InputLine};
use std::time::{Duration, Instant};

/// Consumer label shown by `gpioinfo`
const CONSUMER: &str = "pocketprog";

/// Configuration for the Linux GPIO button backend
#[derive(Debug, Clone)]
pub struct LinuxGpioConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// Button line offsets
    pub pins: ButtonPins,
    /// Enable the internal pull-up bias
    pub pull_up: bool,
}

impl Default for LinuxGpioConfig {
    fn default() -> Self {
        Self {
            device: "/dev/gpiochip0".into(),
            pins: ButtonPins::default(),
            pull_up: true,
        }
    }
}

impl LinuxGpioConfig {
    /// Create a configuration for `device` with the given button lines
    pub fn new(device: impl Into<String>, pins: ButtonPins) -> Self {
        Self {
            device: device.into(),
            pins,
            ..Default::default()
        }
    }
}

fn to_level(value: Value) -> Level {
    match value {
        Value::Active => Level::High,
        Value::Inactive => Level::Low,
    }
}

/// GPIO backend on a Linux GPIO chip
#[derive(Debug, Clone)]
pub struct LinuxGpio {
    config: LinuxGpioConfig,
}

impl LinuxGpio {
    /// Create the backend; lines are requested lazily per button
    pub fn open(config: LinuxGpioConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        log::debug!(
            "linux_gpio: {} (select={}, write={}, read={})",
            config.device,
            config.pins.select,
            config.pins.write,
            config.pins.read
        );
        Ok(Self { config })
    }

    /// Configured button lines
    pub fn pins(&self) -> ButtonPins {
        self.config.pins
    }

    fn request(&self, line: Offset, edges: bool) -> Result<Request> {
        let mut req_config = Config::default();
        req_config.with_line(line).as_input();
        if self.config.pull_up {
            req_config.with_bias(Bias::PullUp);
        }
        if edges {
            req_config.with_edge_detection(EdgeDetection::BothEdges);
        }

        Request::from_config(req_config)
            .on_chip(&self.config.device)
            .with_consumer(CONSUMER)
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                chip: self.config.device.clone(),
                line,
                source,
            })
    }
}

impl GpioBackend for LinuxGpio {
    fn name(&self) -> &str {
        "linux_gpio"
    }

    fn request_input(&self, line: u32) -> pocketprog_core::Result<Box<dyn InputLine>> {
        let request = self.request(line, false)?;
        log::debug!("linux_gpio: line {} requested for polling", line);
        Ok(Box::new(GpioLine {
            request,
            offset: line,
        }))
    }

    fn request_edges(&self, line: u32) -> pocketprog_core::Result<Box<dyn EdgeSignal>> {
        let request = self
            .request(line, true)
            .map_err(|e| pocketprog_core::Error::EdgeUnsupported(e.to_string()))?;
        log::debug!("linux_gpio: line {} requested with edge detection", line);
        Ok(Box::new(GpioLine {
            request,
            offset: line,
        }))
    }
}

/// One requested button line
pub struct GpioLine {
    request: Request,
    offset: Offset,
}

impl InputLine for GpioLine {
    fn level(&mut self) -> pocketprog_core::Result<Level> {
        let value = self
            .request
            .value(self.offset)
            .map_err(LinuxGpioError::GetValueFailed)?;
        Ok(to_level(value))
    }
}

impl EdgeSignal for GpioLine {
    fn wait_edge(&mut self, timeout: Duration) -> pocketprog_core::Result<Option<Edge>> {
        let ready = self
            .request
            .wait_edge_event(timeout)
            .map_err(LinuxGpioError::EdgeEventFailed)?;
        if !ready {
            return Ok(None);
        }

        let event = self
            .request
            .read_edge_event()
            .map_err(LinuxGpioError::EdgeEventFailed)?;
        log::trace!(
            "linux_gpio: line {} {:?} at {}ns",
            event.offset,
            event.kind,
            event.timestamp_ns
        );
        let level = match event.kind {
            EdgeKind::Rising => Level::High,
            EdgeKind::Falling => Level::Low,
        };
        let now = Instant::now();
        let at = match monotonic_ns() {
            Some(now_ns) => event_instant(event.timestamp_ns, now_ns, now),
            None => now,
        };
        Ok(Some(Edge::new(level, at)))
    }
}

/// CLOCK_MONOTONIC in nanoseconds, the kernel's default edge event clock
fn monotonic_ns() -> Option<u64> {
    let ts = clock_gettime(ClockId::CLOCK_MONOTONIC).ok()?;
    let secs = u64::try_from(ts.tv_sec()).ok()?;
    let nanos = u64::try_from(ts.tv_nsec()).ok()?;
    secs.checked_mul(1_000_000_000)?.checked_add(nanos)
}

/// Map a kernel event timestamp onto `Instant`, given both clocks read now
///
/// Timestamps ahead of the monotonic clock (a realtime event clock, say)
/// count as just happened.
fn event_instant(event_ns: u64, now_ns: u64, now: Instant) -> Instant {
    let age = Duration::from_nanos(now_ns.saturating_sub(event_ns));
    now.checked_sub(age).unwrap_or(now)
}

/// Parse backend options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `select=N`, `write=N`, `read=N` - button line offsets (default 13/19/26)
/// - `pullup=on|off` - internal pull-up bias (default on)
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxGpioConfig, String> {
    let mut config = LinuxGpioConfig {
        device: String::new(),
        ..Default::default()
    };
    let mut gpiochip: Option<u32> = None;

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "gpiochip" => {
                gpiochip = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid gpiochip value: {}", value))?,
                );
            }
            "select" => {
                config.pins.select = value
                    .parse()
                    .map_err(|_| format!("Invalid select value: {}", value))?;
            }
            "write" => {
                config.pins.write = value
                    .parse()
                    .map_err(|_| format!("Invalid write value: {}", value))?;
            }
            "read" => {
                config.pins.read = value
                    .parse()
                    .map_err(|_| format!("Invalid read value: {}", value))?;
            }
            "pullup" => {
                config.pull_up = match *value {
                    "on" | "1" | "true" => true,
                    "off" | "0" | "false" => false,
                    _ => return Err(format!("Invalid pullup value: {}", value)),
                };
            }
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        config.device = format!("/dev/gpiochip{}", gpiochip.unwrap_or(0));
    } else if gpiochip.is_some() {
        return Err("Only one of 'dev' or 'gpiochip' can be specified".to_string());
    }

    let pins = config.pins;
    if pins.select == pins.write || pins.select == pins.read || pins.write == pins.read {
        return Err(format!(
            "Button lines must differ (select={}, write={}, read={})",
            pins.select, pins.write, pins.read
        ));
    }

    Ok(config)
}

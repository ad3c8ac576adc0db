//! GPIO backend registration and dispatch
//!
//! Backends are feature gated. A backend string is either just the name
//! (e.g., "linux_gpio") or the name with options
//! (e.g., "linux_gpio:gpiochip=1,select=5").

use pocketprog_core::input::{ButtonPins, GpioBackend};

/// Information about a GPIO backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// All backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "linux-gpio")]
    backends.push(BackendInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpio"],
        description: "Linux GPIO character device (gpiochip=N|dev=<path>,select=N,write=N,read=N)",
    });

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &["keyboard"],
        description: "Simulated buttons driven from stdin: 1/2/3, L for a long Read (edges=off)",
    });

    backends
}

/// Help text listing all available backends
pub fn backend_help() -> String {
    let backends = available_backends();

    if backends.is_empty() {
        return "No GPIO backends available (recompile with backend features enabled)".to_string();
    }

    let mut help = String::from("Available GPIO backends:\n");
    for b in &backends {
        help.push_str(&format!("  {:12} - {}\n", b.name, b.description));
        if !b.aliases.is_empty() {
            help.push_str(&format!("  {:12}   aliases: {}\n", "", b.aliases.join(", ")));
        }
    }
    help
}

/// Canonical name of a backend, if it is available
pub fn find_backend(name: &str) -> Option<&'static str> {
    available_backends()
        .into_iter()
        .find(|b| b.name == name || b.aliases.contains(&name))
        .map(|b| b.name)
}

/// Parse a backend string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_backend_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// An opened backend
pub struct Backend {
    /// Line access
    pub gpio: Box<dyn GpioBackend>,
    /// Button lines on that backend
    pub pins: ButtonPins,
    /// Handle for pressing simulated buttons
    #[cfg(feature = "dummy")]
    pub simulated: Option<pocketprog_dummy::DummyGpio>,
}

/// Open the backend named by `backend`
pub fn open_backend(backend: &str) -> Result<Backend, Box<dyn std::error::Error>> {
    let (name, options) = parse_backend_string(backend);

    let canonical = match find_backend(name) {
        Some(n) => n,
        None => return Err(unknown_backend_error(name)),
    };

    match canonical {
        #[cfg(feature = "linux-gpio")]
        "linux_gpio" => {
            use pocketprog_linux_gpio::{parse_options, LinuxGpio};

            let config = parse_options(&options)
                .map_err(|e| format!("Invalid linux_gpio parameters: {}", e))?;
            let pins = config.pins;

            log::info!("Opening GPIO buttons on {}...", config.device);
            let gpio = LinuxGpio::open(config).map_err(|e| {
                format!(
                    "Failed to open GPIO chip: {}\n\
                     Make sure the device exists and you have read/write permissions.\n\
                     You may need to: sudo usermod -aG gpio $USER",
                    e
                )
            })?;

            Ok(Backend {
                gpio: Box::new(gpio),
                pins,
                #[cfg(feature = "dummy")]
                simulated: None,
            })
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            use pocketprog_dummy::{parse_options, DummyGpio};

            let config =
                parse_options(&options).map_err(|e| format!("Invalid dummy parameters: {}", e))?;
            let gpio = DummyGpio::new(config);

            Ok(Backend {
                gpio: Box::new(gpio.clone()),
                pins: config.pins,
                simulated: Some(gpio),
            })
        }

        _ => Err(unknown_backend_error(name)),
    }
}

fn unknown_backend_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown GPIO backend: {}\n\n", name);
    msg.push_str(&backend_help());
    msg.push_str("\nUse 'pocketprog list-backends' for more details");
    msg.into()
}

//! pocketprog-linux-gpio - Linux GPIO button input
//!
//! Reads the Select/Write/Read push buttons through the Linux GPIO character
//! device interface (gpiocdev), the replacement for the deprecated sysfs
//! interface.
//!
//! Edge detection is requested first so buttons are interrupt driven. If
//! the kernel or permissions don't allow it, the same lines are requested
//! as plain inputs and polled.
//!
//! # Usage with the pocketprog CLI
//!
//! ```bash
//! # Raspberry Pi defaults: /dev/gpiochip0, select=13, write=19, read=26
//! pocketprog run --gpio linux_gpio
//!
//! # Other chip and lines
//! pocketprog run --gpio linux_gpio:gpiochip=1,select=5,write=6,read=16
//! ```
//!
//! # Wiring
//!
//! | Button | Default BCM line | Other side |
//! |--------|------------------|------------|
//! | Select | 13               | GND        |
//! | Write  | 19               | GND        |
//! | Read   | 26               | GND        |
//!
//! # System Requirements
//!
//! - Linux kernel 5.5+ for pull-up bias on GPIO character devices
//! - Access to `/dev/gpiochipN` (gpio group or udev rule)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, GpioLine, LinuxGpio, LinuxGpioConfig};
pub use error::{LinuxGpioError, Result};

/// Open the Linux GPIO backend from `key=value` options
pub fn open_linux_gpio(
    options: &[(&str, &str)],
) -> std::result::Result<LinuxGpio, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    Ok(LinuxGpio::open(config)?)
}

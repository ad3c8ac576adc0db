//! pocketprog-ssd1306 - OLED status display
//!
//! Draws the pocketprog screens on a 128x64 SSD1306 (or SSD1309) module
//! wired to a Linux I2C bus, using linux-embedded-hal for the bus and
//! embedded-graphics for text and the progress bar.
//!
//! # Usage with the pocketprog CLI
//!
//! ```bash
//! # Raspberry Pi defaults: /dev/i2c-1, address 0x3c
//! pocketprog --display ssd1306 run
//!
//! # Other bus and address
//! pocketprog --display ssd1306:bus=/dev/i2c-3,address=0x3d run
//! ```
//!
//! # System Requirements
//!
//! - I2C enabled (`dtparam=i2c_arm=on` on a Raspberry Pi)
//! - Access to `/dev/i2c-N` (i2c group or udev rule)

pub mod device;
pub mod error;
pub mod reporter;

// Re-exports
pub use device::{open, parse_options, I2cPanel, Ssd1306Config};
pub use error::{Result, Ssd1306Error};
pub use reporter::{OledReporter, Panel};

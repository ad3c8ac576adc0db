//! SSD1306 panel on a Linux I2C bus
//!
//! The controller runs in buffered graphics mode: drawing goes to a frame
//! buffer in memory and [`Panel::present`] pushes it over I2C in one go.

use crate::error::{Result, Ssd1306Error};
use crate::reporter::Panel;

use linux_embedded_hal::I2cdev;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

/// Default I2C bus on a Raspberry Pi header
pub const DEFAULT_BUS: &str = "/dev/i2c-1";

/// Default 7-bit address of 128x64 modules
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// Panel driver over any embedded-hal I2C bus
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Panel on a Linux `/dev/i2c-N` device
pub type I2cPanel = Display<I2cdev>;

/// Where the panel is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ssd1306Config {
    /// I2C bus device path
    pub bus: String,
    /// 7-bit I2C address
    pub address: u8,
}

impl Default for Ssd1306Config {
    fn default() -> Self {
        Self {
            bus: DEFAULT_BUS.to_string(),
            address: DEFAULT_ADDRESS,
        }
    }
}

impl<DI> Panel for Ssd1306<DI, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>
where
    DI: WriteOnlyDataCommand + Send,
{
    fn blank(&mut self) {
        self.clear_buffer();
    }

    fn present(&mut self) -> std::result::Result<(), String> {
        self.flush().map_err(|e| format!("{:?}", e))
    }
}

/// Initialise a panel at `address` and blank it
pub fn init<I2C>(i2c: I2C, address: u8) -> Result<Display<I2C>>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new_custom_address(i2c, address);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    let init_error = |e| Ssd1306Error::Init {
        address,
        reason: format!("{:?}", e),
    };
    display.init().map_err(init_error)?;
    display.clear_buffer();
    display.flush().map_err(init_error)?;
    Ok(display)
}

/// Open the bus and initialise the panel
pub fn open(config: &Ssd1306Config) -> Result<I2cPanel> {
    log::debug!(
        "ssd1306: opening {} at 0x{:02x}",
        config.bus,
        config.address
    );
    let i2c = I2cdev::new(&config.bus).map_err(|e| Ssd1306Error::Bus {
        bus: config.bus.clone(),
        reason: e.to_string(),
    })?;
    init(i2c, config.address)
}

/// Parse display options
///
/// - `bus=/dev/i2c-N` - I2C bus device (default /dev/i2c-1)
/// - `address=0xNN` - 7-bit address, hex with or without `0x` (default 0x3c)
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<Ssd1306Config, String> {
    let mut config = Ssd1306Config::default();

    for (key, value) in options {
        match *key {
            "bus" => {
                if value.is_empty() {
                    return Err("Empty bus path".to_string());
                }
                config.bus = value.to_string();
            }
            "address" | "addr" => {
                let digits = value
                    .strip_prefix("0x")
                    .or_else(|| value.strip_prefix("0X"))
                    .unwrap_or(value);
                config.address = u8::from_str_radix(digits, 16)
                    .ok()
                    .filter(|a| *a < 0x80)
                    .ok_or_else(|| format!("Invalid address value: {}", value))?;
            }
            _ => {
                log::warn!("ssd1306: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

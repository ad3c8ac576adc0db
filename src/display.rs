//! Status display selection
//!
//! The display is picked once at startup. A display string is a name with
//! optional options, like backend strings:
//!
//! - `auto` - the OLED if one answers, else the terminal
//! - `ssd1306[:bus=/dev/i2c-1,address=0x3c]` - the OLED, else the terminal
//! - `console` - the terminal
//! - `log` - log lines only
//!
//! Dry runs never touch the I2C bus.

use crate::backends::parse_backend_string;
use crate::console::ConsoleReporter;
use pocketprog_core::reporter::{LogReporter, Reporter};

/// Opened display and its kind, for the startup log
pub type Opened = (Box<dyn Reporter>, &'static str);

/// Open the display named by `display`
pub fn open_display(display: &str, dry_run: bool) -> Result<Opened, Box<dyn std::error::Error>> {
    let (name, options) = parse_backend_string(display);

    match name {
        "console" | "terminal" => Ok(console()),
        "log" => {
            let reporter: Box<dyn Reporter> = Box::new(LogReporter::new());
            Ok((reporter, "log"))
        }
        "auto" | "ssd1306" | "oled" => {
            let explicit = name != "auto";
            if dry_run {
                log::info!("Dry run: using the terminal instead of the OLED");
                return Ok(console());
            }
            open_oled(&options, explicit)
        }
        _ => Err(format!(
            "Unknown display: {}\nUse auto, ssd1306[:bus=..,address=..], console or log",
            name
        )
        .into()),
    }
}

fn console() -> Opened {
    let reporter: Box<dyn Reporter> = Box::new(ConsoleReporter::new());
    (reporter, "console")
}

#[cfg(feature = "ssd1306")]
fn open_oled(options: &[(&str, &str)], explicit: bool) -> Result<Opened, Box<dyn std::error::Error>> {
    let config = pocketprog_ssd1306::parse_options(options)
        .map_err(|e| format!("Invalid ssd1306 parameters: {}", e))?;

    match pocketprog_ssd1306::open(&config) {
        Ok(panel) => {
            let reporter: Box<dyn Reporter> =
                Box::new(pocketprog_ssd1306::OledReporter::new(panel));
            Ok((reporter, "ssd1306"))
        }
        Err(e) => {
            if explicit {
                log::warn!("{}; falling back to the terminal", e);
            } else {
                log::info!("No OLED display ({}); using the terminal", e);
            }
            Ok(console())
        }
    }
}

#[cfg(not(feature = "ssd1306"))]
fn open_oled(_options: &[(&str, &str)], explicit: bool) -> Result<Opened, Box<dyn std::error::Error>> {
    if explicit {
        log::warn!("Built without ssd1306 support; falling back to the terminal");
    }
    Ok(console())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_uses_console() {
        let (_, kind) = open_display("auto", true).unwrap();
        assert_eq!(kind, "console");
        let (_, kind) = open_display("ssd1306:bus=/dev/i2c-1", true).unwrap();
        assert_eq!(kind, "console");
    }

    #[test]
    fn test_missing_oled_falls_back_to_console() {
        let (_, kind) = open_display("ssd1306:bus=/nonexistent/i2c-9", false).unwrap();
        assert_eq!(kind, "console");
    }

    #[test]
    fn test_named_displays() {
        assert_eq!(open_display("log", false).unwrap().1, "log");
        assert_eq!(open_display("console", false).unwrap().1, "console");
        let err = open_display("lcd", false).err().unwrap();
        assert!(err.to_string().contains("Unknown display: lcd"));
    }

    #[cfg(feature = "ssd1306")]
    #[test]
    fn test_bad_oled_options_are_errors() {
        let err = open_display("ssd1306:address=0xzz", false).err().unwrap();
        assert!(err.to_string().contains("Invalid ssd1306 parameters"));
    }
}

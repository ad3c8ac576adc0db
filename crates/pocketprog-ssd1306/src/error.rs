//! Error types for the SSD1306 display

use thiserror::Error;

/// SSD1306 specific errors
#[derive(Debug, Error)]
pub enum Ssd1306Error {
    /// Failed to open the I2C bus device
    #[error("Failed to open I2C bus '{bus}': {reason}")]
    Bus {
        /// Bus device path
        bus: String,
        /// Underlying error
        reason: String,
    },

    /// The controller did not accept the init sequence
    #[error("No SSD1306 answering at 0x{address:02x}: {reason}")]
    Init {
        /// 7-bit I2C address
        address: u8,
        /// Underlying error
        reason: String,
    },
}

/// Result type for display operations
pub type Result<T> = std::result::Result<T, Ssd1306Error>;

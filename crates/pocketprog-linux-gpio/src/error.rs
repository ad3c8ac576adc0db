//! Error types for Linux GPIO button input

use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request a GPIO line
    #[error("Failed to request line {line} on '{chip}': {source}")]
    LineRequestFailed {
        /// Chip device path
        chip: String,
        /// Line offset
        line: u32,
        /// Underlying gpiocdev error
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to get GPIO line value
    #[error("Failed to get GPIO line value: {0}")]
    GetValueFailed(#[source] gpiocdev::Error),

    /// Failed to wait for or read an edge event
    #[error("Failed to read edge event: {0}")]
    EdgeEventFailed(#[source] gpiocdev::Error),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,
}

impl From<LinuxGpioError> for pocketprog_core::Error {
    fn from(e: LinuxGpioError) -> Self {
        pocketprog_core::Error::Gpio(e.to_string())
    }
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;

//! Error types for pocketprog-core

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// The profile source produced no profiles
    #[error("No profiles configured (the profile list must not be empty)")]
    NoProfiles,

    /// Failed to read a profile file
    #[error("Failed to read profile file '{path}': {source}")]
    ProfileRead {
        /// Path of the profile file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// RON profile file could not be parsed
    #[error("Invalid RON profile file: {0}")]
    ProfileRon(#[from] ron::error::SpannedError),

    /// TOML profile file could not be parsed
    #[error("Invalid TOML profile file: {0}")]
    ProfileToml(#[from] toml::de::Error),

    /// Profile file has an extension we don't know how to parse
    #[error("Unsupported profile file format: {0} (expected .ron or .toml)")]
    UnsupportedProfileFormat(PathBuf),

    /// A profile is missing a required field value
    #[error("Profile #{index} has an empty {field}")]
    InvalidProfile {
        /// Position of the profile in the list
        index: usize,
        /// Name of the empty field
        field: &'static str,
    },

    /// The image root directory does not exist
    #[error("Image root directory not found: {0}")]
    MissingImageRoot(PathBuf),

    /// Command line is empty
    #[error("Cannot run an empty command")]
    EmptyCommand,

    /// Failed to start an external process
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Another transfer holds the serial port
    #[error("A transfer is already running")]
    Busy,

    /// The image to upload does not exist
    #[error("Image not found: {0}")]
    MissingImage(PathBuf),

    /// GPIO backend failure
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// The GPIO backend cannot deliver edge notifications
    #[error("Edge notifications unavailable: {0}")]
    EdgeUnsupported(String),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;

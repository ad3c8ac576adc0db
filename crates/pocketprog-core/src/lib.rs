//! pocketprog-core - Button-driven radio programming controller
//!
//! Three push buttons pick a radio profile, upload its image to the radio,
//! or download the radio into a new image, by running an external
//! programmer tool (CHIRP's `chirpc`) over a serial cable. Progress and
//! results go to a small text display.
//!
//! # Modules
//!
//! - [`button`] - debounce and short/long press recognition per pin
//! - [`input`] - interrupt-driven and polling delivery of button gestures
//! - [`profile`] - profile list, loading and the selection cursor
//! - [`process`] - running the tool and judging its result
//! - [`controller`] - the action handlers
//! - [`reporter`] - display backends and the shared display sink
//! - [`tool`] - tool command lines and download file naming
//! - [`power`] - host power-off
//!
//! # Example
//!
//! ```no_run
//! use pocketprog_core::controller::Controller;
//! use pocketprog_core::power::LoggedPower;
//! use pocketprog_core::process::ProcessRunner;
//! use pocketprog_core::profile::{Profile, ProfileSelector};
//! use pocketprog_core::reporter::ReporterHandle;
//! use pocketprog_core::tool::ToolConfig;
//! use std::sync::Arc;
//!
//! let selector = ProfileSelector::new(vec![Profile::new("green", "green.img", "QYT_KT-WP12")])?;
//! let controller = Controller::new(
//!     selector,
//!     Arc::new(ReporterHandle::log_only()),
//!     ProcessRunner::new(true),
//!     ToolConfig::default(),
//!     Box::new(LoggedPower),
//! );
//! let outcome = controller.upload()?;
//! assert!(outcome.success);
//! # Ok::<(), pocketprog_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod button;
pub mod config;
pub mod controller;
pub mod error;
pub mod input;
pub mod power;
pub mod process;
pub mod profile;
pub mod reporter;
pub mod tool;

pub use error::{Error, Result};

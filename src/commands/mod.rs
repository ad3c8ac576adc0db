//! CLI command implementations
//!
//! - `run`: the button-driven controller
//! - `transfer`: one upload or download from the shell, same handlers
//! - `list`: profiles and GPIO backends

mod list;
pub mod run;
pub mod transfer;

pub use list::{list_backends, list_profiles};

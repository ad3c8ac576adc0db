//! One-shot upload and download
//!
//! Runs the same handlers the Write and Read buttons trigger, against a
//! profile picked on the command line, with output on the terminal.

use crate::console::ConsoleReporter;
use pocketprog_core::controller::Controller;
use pocketprog_core::power::LoggedPower;
use pocketprog_core::process::ProcessRunner;
use pocketprog_core::profile::ProfileSelector;
use pocketprog_core::reporter::ReporterHandle;
use pocketprog_core::tool::ToolConfig;
use std::fmt;
use std::sync::Arc;

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Image file to radio
    Upload,
    /// Radio to a new numbered image file
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "Upload"),
            Direction::Download => write!(f, "Download"),
        }
    }
}

/// Run one transfer for the profile matching `key` (number or name)
pub fn run_transfer(
    selector: ProfileSelector,
    key: &str,
    direction: Direction,
    tool: ToolConfig,
    dry_run: bool,
    live_progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = selector
        .find(key)
        .map(|(i, _)| i)
        .ok_or_else(|| format!("No profile matches '{}' (see 'pocketprog profiles')", key))?;

    let reporter = Arc::new(ReporterHandle::new(Box::new(ConsoleReporter::new())));
    let controller = Controller::new(
        selector,
        Arc::clone(&reporter),
        ProcessRunner::new(dry_run),
        tool,
        Box::new(LoggedPower),
    )
    .with_live_progress(live_progress);

    let profile = controller.select(index);
    log::info!("{} with profile {} ({})", direction, profile.name, profile.device_model);

    let outcome = match direction {
        Direction::Upload => controller.upload(),
        Direction::Download => controller.download(),
    };
    reporter.close();

    let outcome = outcome?;
    if outcome.success {
        println!("{} succeeded: {}", direction, outcome.image.display());
        Ok(())
    } else {
        Err(format!("{} failed: {}", direction, outcome.image.display()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketprog_core::profile::Profile;

    fn selector() -> ProfileSelector {
        ProfileSelector::new(vec![
            Profile::new("green", "green.img", "QYT_KT-WP12"),
            Profile::new("blue", "blue.img", "QYT_KT-WP12"),
        ])
        .unwrap()
    }

    #[test]
    fn test_unknown_profile() {
        let err = run_transfer(
            selector(),
            "red",
            Direction::Upload,
            ToolConfig::default(),
            true,
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("No profile matches 'red'"));
    }

    #[test]
    fn test_dry_run_upload_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ToolConfig {
            image_root: dir.path().to_path_buf(),
            ..ToolConfig::default()
        };
        run_transfer(selector(), "BLUE", Direction::Upload, tool, true, true).unwrap();
    }

    #[test]
    fn test_dry_run_download_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ToolConfig {
            image_root: dir.path().to_path_buf(),
            ..ToolConfig::default()
        };
        run_transfer(selector(), "0", Direction::Download, tool, true, false).unwrap();
        assert!(!dir.path().join("QYT_KT-WP12").exists());
    }
}

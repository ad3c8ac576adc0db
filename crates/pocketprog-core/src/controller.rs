//! Button action handlers
//!
//! [`Controller`] owns the profile cursor and the display sink and runs the
//! programmer tool for uploads and downloads. It is shared between input
//! threads, so all mutable state sits behind locks:
//!
//! - the selection cursor (Select writes it, Write/Read snapshot it)
//! - the display, via [`ReporterHandle`]
//! - the serial port: one transfer at a time, others are turned away

use crate::button::{Action, ActionSink};
use crate::error::{Error, Result};
use crate::power::PowerControl;
use crate::process::{ProcessRunner, SuccessCriteria};
use crate::profile::{Profile, ProfileSelector};
use crate::reporter::ReporterHandle;
use crate::tool::ToolConfig;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// Why the controller should stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Termination signal received
    Signal(i32),
    /// A long press powered the host off
    PowerOff,
}

/// Result of an upload or download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Verdict from exit code and output markers
    pub success: bool,
    /// Image uploaded from or downloaded into
    pub image: PathBuf,
}

/// Dispatch target for button actions
pub struct Controller {
    selector: Mutex<ProfileSelector>,
    reporter: Arc<ReporterHandle>,
    runner: ProcessRunner,
    tool: ToolConfig,
    power: Box<dyn PowerControl>,
    transfer: Mutex<()>,
    live_progress: bool,
    exit: Option<Sender<ExitReason>>,
}

impl Controller {
    /// Create a controller
    pub fn new(
        selector: ProfileSelector,
        reporter: Arc<ReporterHandle>,
        runner: ProcessRunner,
        tool: ToolConfig,
        power: Box<dyn PowerControl>,
    ) -> Self {
        Self {
            selector: Mutex::new(selector),
            reporter,
            runner,
            tool,
            power,
            transfer: Mutex::new(()),
            live_progress: false,
            exit: None,
        }
    }

    /// Stream tool output to the display instead of waiting for the verdict
    pub fn with_live_progress(mut self, live: bool) -> Self {
        self.live_progress = live;
        self
    }

    /// Send [`ExitReason::PowerOff`] here after a successful power-off
    pub fn with_exit_notifier(mut self, exit: Sender<ExitReason>) -> Self {
        self.exit = Some(exit);
        self
    }

    fn selector(&self) -> MutexGuard<'_, ProfileSelector> {
        self.selector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the active profile
    pub fn current(&self) -> Profile {
        self.selector().current().clone()
    }

    /// Display sink
    pub fn reporter(&self) -> &ReporterHandle {
        &self.reporter
    }

    /// Show the active profile
    pub fn show_current(&self) {
        self.reporter.show_selected(&self.current());
    }

    /// Select the next profile
    pub fn advance(&self) -> Profile {
        let profile = self.selector().advance().clone();
        log::info!(
            "Selected: {} ({} / {})",
            profile.name,
            profile.device_model,
            profile.filename
        );
        self.reporter.show_selected(&profile);
        profile
    }

    /// Select a profile by position
    pub fn select(&self, index: usize) -> Profile {
        self.selector().select(index).clone()
    }

    fn claim_port(&self) -> Result<MutexGuard<'_, ()>> {
        match self.transfer.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(p)) => Ok(p.into_inner()),
            Err(TryLockError::WouldBlock) => {
                self.reporter.append_line("Busy");
                Err(Error::Busy)
            }
        }
    }

    fn run_tool(&self, args: &[String], label: &str, criteria: &SuccessCriteria) -> bool {
        let result = if self.live_progress {
            self.runner.stream(args, label, criteria, &self.reporter)
        } else {
            self.runner.run_blocking(args, criteria)
        };

        match result {
            Ok(result) => result.success(),
            Err(e) => {
                log::error!("{} failed: {}", label, e);
                self.reporter.append_line(&format!("Error: {}", e));
                false
            }
        }
    }

    /// Upload the active profile's image to the radio
    pub fn upload(&self) -> Result<TransferOutcome> {
        let _port = self.claim_port()?;
        let profile = self.current();
        let image = self.tool.image_path(&profile);

        if !self.runner.is_dry_run() && !image.is_file() {
            self.reporter.show_result("Image missing", &profile);
            return Err(Error::MissingImage(image));
        }

        log::info!(
            "Uploading {} {} (selected={})",
            profile.device_model,
            profile.filename,
            profile.name
        );
        self.reporter
            .show_report("Uploading", &profile.filename, &profile.device_model);

        let args = self.tool.upload_command(&profile);
        let success = self.run_tool(&args, "Upload", &self.tool.upload_success);

        let status = if success {
            "Upload complete"
        } else {
            "Upload failed"
        };
        log::info!("{}: {}", status, image.display());
        self.reporter.show_result(status, &profile);

        Ok(TransferOutcome { success, image })
    }

    /// Download the radio into the next numbered image of its model folder
    pub fn download(&self) -> Result<TransferOutcome> {
        let _port = self.claim_port()?;
        let profile = self.current();

        let target = self
            .prepare_download(&profile)
            .inspect_err(|_| self.reporter.show_result("Download failed", &profile))?;

        log::info!(
            "Downloading from {} into {}",
            profile.device_model,
            target.display()
        );
        self.reporter
            .show_report("Downloading", "download[n]", &profile.device_model);

        let args = self.tool.download_command(&profile, &target);
        let success = self.run_tool(&args, "Download", &self.tool.download_success);

        let status = if success {
            let name = target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("Saved to {}", name)
        } else {
            "Download failed".to_string()
        };
        log::info!("{} ({})", status, target.display());
        self.reporter.show_result(&status, &profile);

        Ok(TransferOutcome {
            success,
            image: target,
        })
    }

    fn prepare_download(&self, profile: &Profile) -> Result<PathBuf> {
        let target = self.tool.download_target(profile)?;
        if !self.runner.is_dry_run() {
            fs::create_dir_all(self.tool.model_dir(profile))?;
        }
        Ok(target)
    }

    /// Power the host off
    pub fn shutdown(&self) -> Result<()> {
        log::info!("Long press detected: shutting down");
        self.reporter.show_status("Shutting down...");
        self.power.power_off()?;
        if let Some(exit) = &self.exit {
            let _ = exit.send(ExitReason::PowerOff);
        }
        Ok(())
    }

    /// Run the handler for `action`
    pub fn handle(&self, action: Action) -> Result<()> {
        match action {
            Action::Advance => {
                self.advance();
                Ok(())
            }
            Action::Upload => self.upload().map(|_| ()),
            Action::Download => self.download().map(|_| ()),
            Action::Shutdown => self.shutdown(),
        }
    }
}

impl ActionSink for Controller {
    /// Errors and panics stop at this boundary; the caller keeps listening
    fn dispatch(&self, action: Action) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.handle(action))) {
            Ok(Ok(())) => {}
            Ok(Err(Error::Busy)) => log::warn!("{:?} ignored: transfer in progress", action),
            Ok(Err(e)) => {
                log::error!("{:?} failed: {}", action, e);
                self.reporter.append_line(&format!("Error: {}", e));
            }
            Err(_) => log::error!("{:?} handler panicked", action),
        }
        log::info!("Waiting for button press...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::LoggedPower;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    fn profiles() -> ProfileSelector {
        ProfileSelector::new(vec![
            Profile::new("A", "a.img", "M1"),
            Profile::new("B", "b.img", "M1"),
            Profile::new("C", "c.img", "M2"),
        ])
        .unwrap()
    }

    fn dry_controller() -> Controller {
        let tool = ToolConfig {
            image_root: PathBuf::from("/nonexistent/pocketprog-root"),
            ..ToolConfig::default()
        };
        Controller::new(
            profiles(),
            Arc::new(ReporterHandle::log_only()),
            ProcessRunner::new(true),
            tool,
            Box::new(LoggedPower),
        )
    }

    struct CountingPower(Arc<AtomicUsize>);

    impl PowerControl for CountingPower {
        fn power_off(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingPower;

    impl PowerControl for FailingPower {
        fn power_off(&self) -> Result<()> {
            Err(Error::Gpio("boom".into()))
        }
    }

    #[test]
    fn test_select_actions_cycle() {
        let c = dry_controller();
        let names: Vec<_> = (0..3).map(|_| c.advance().name).collect();
        assert_eq!(names, ["B", "C", "A"]);
        assert_eq!(c.current().name, "A");
    }

    #[test]
    fn test_dry_run_transfers_succeed() {
        let c = dry_controller();
        c.select(2);
        let up = c.upload().unwrap();
        assert!(up.success);
        assert!(up.image.ends_with("M2/c.img"));

        let down = c.download().unwrap();
        assert!(down.success);
        assert!(down.image.ends_with("M2/download1.img"));
        assert!(!PathBuf::from("/nonexistent/pocketprog-root").exists());
    }

    #[test]
    fn test_download_numbers_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("M1")).unwrap();
        std::fs::File::create(dir.path().join("M1/download2.img")).unwrap();
        let tool = ToolConfig {
            image_root: dir.path().to_path_buf(),
            ..ToolConfig::default()
        };
        let c = Controller::new(
            profiles(),
            Arc::new(ReporterHandle::log_only()),
            ProcessRunner::new(true),
            tool,
            Box::new(LoggedPower),
        );
        let down = c.download().unwrap();
        assert_eq!(down.image, dir.path().join("M1/download3.img"));
    }

    #[test]
    fn test_missing_image_fails_upload() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ToolConfig {
            program: "/nonexistent/programmer-tool".into(),
            image_root: dir.path().to_path_buf(),
            ..ToolConfig::default()
        };
        let c = Controller::new(
            profiles(),
            Arc::new(ReporterHandle::log_only()),
            ProcessRunner::new(false),
            tool,
            Box::new(LoggedPower),
        );
        assert!(matches!(c.upload(), Err(Error::MissingImage(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_upload_verdict_reflects_tool() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("M1")).unwrap();
        std::fs::File::create(dir.path().join("M1/a.img")).unwrap();

        for (program, expected) in [("true", true), ("false", false)] {
            let tool = ToolConfig {
                program: program.into(),
                image_root: dir.path().to_path_buf(),
                ..ToolConfig::default()
            };
            for live in [false, true] {
                let c = Controller::new(
                    profiles(),
                    Arc::new(ReporterHandle::log_only()),
                    ProcessRunner::new(false),
                    tool.clone(),
                    Box::new(LoggedPower),
                )
                .with_live_progress(live);
                assert_eq!(c.upload().unwrap().success, expected);
            }
        }
    }

    #[test]
    fn test_shutdown_notifies_exit() {
        let count = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let c = Controller::new(
            profiles(),
            Arc::new(ReporterHandle::log_only()),
            ProcessRunner::new(true),
            ToolConfig::default(),
            Box::new(CountingPower(Arc::clone(&count))),
        )
        .with_exit_notifier(tx);

        c.dispatch(Action::Shutdown);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_recv(), Ok(ExitReason::PowerOff));
    }

    #[test]
    fn test_failing_action_is_contained() {
        let (tx, rx) = mpsc::channel();
        let c = Controller::new(
            profiles(),
            Arc::new(ReporterHandle::log_only()),
            ProcessRunner::new(true),
            ToolConfig::default(),
            Box::new(FailingPower),
        )
        .with_exit_notifier(tx);

        c.dispatch(Action::Shutdown);
        assert!(rx.try_recv().is_err());
        // Still usable afterwards
        c.dispatch(Action::Advance);
        assert_eq!(c.current().name, "B");
    }

    #[test]
    fn test_concurrent_transfers_are_turned_away() {
        let c = dry_controller();
        let _port = c.claim_port().unwrap();
        assert!(matches!(c.upload(), Err(Error::Busy)));
        assert!(matches!(c.download(), Err(Error::Busy)));
        // Selection is independent of the port
        assert_eq!(c.advance().name, "B");
    }
}

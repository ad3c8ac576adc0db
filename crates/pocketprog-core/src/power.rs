//! Host power-off

use crate::error::{Error, Result};
use std::process::Command;

/// Something that can power the host off
pub trait PowerControl: Send + Sync {
    /// Start powering off; on success the host is going down
    fn power_off(&self) -> Result<()>;
}

/// Runs a shutdown command (default `sudo shutdown -h now`)
#[derive(Debug, Clone)]
pub struct SystemPower {
    command: Vec<String>,
}

impl Default for SystemPower {
    fn default() -> Self {
        Self::new(["sudo", "shutdown", "-h", "now"])
    }
}

impl SystemPower {
    /// Use a custom shutdown command
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
        }
    }
}

impl PowerControl for SystemPower {
    fn power_off(&self) -> Result<()> {
        let (program, args) = self.command.split_first().ok_or(Error::EmptyCommand)?;
        log::warn!("Powering off: {}", self.command.join(" "));
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Io(std::io::Error::other(format!(
                "{} exited with {}",
                program, status
            ))))
        }
    }
}

/// Logs instead of powering off (dry runs, development hosts)
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggedPower;

impl PowerControl for LoggedPower {
    fn power_off(&self) -> Result<()> {
        log::warn!("DRY RUN: would power off now");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command() {
        let power = SystemPower::new(Vec::<String>::new());
        assert!(matches!(power.power_off(), Err(Error::EmptyCommand)));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_status() {
        assert!(SystemPower::new(["true"]).power_off().is_ok());
        assert!(SystemPower::new(["false"]).power_off().is_err());
    }
}

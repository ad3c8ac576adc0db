//! Programmer tool command lines
//!
//! The tool is invoked as
//! `<tool> -r <model> --serial=<port> --mmap=<image> --upload-mmap|--download-mmap`.
//! Images live under `<root>/<model>/`.

use crate::error::{Error, Result};
use crate::process::SuccessCriteria;
use crate::profile::Profile;
use std::fs;
use std::path::{Path, PathBuf};

/// Base name for downloaded images, numbered from 1
pub const DOWNLOAD_BASENAME: &str = "download.img";

/// Tool invocation settings
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Tool executable
    pub program: String,
    /// Serial port the radio cable is on
    pub serial_port: String,
    /// Directory holding one folder per radio model
    pub image_root: PathBuf,
    /// Flag selecting an upload
    pub upload_flag: String,
    /// Flag selecting a download
    pub download_flag: String,
    /// Output markers meaning an upload worked
    pub upload_success: SuccessCriteria,
    /// Output markers meaning a download worked
    pub download_success: SuccessCriteria,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "chirpc".into(),
            serial_port: "/dev/ttyUSB0".into(),
            image_root: PathBuf::from("/home/pi/Radios"),
            upload_flag: "--upload-mmap".into(),
            download_flag: "--download-mmap".into(),
            upload_success: SuccessCriteria::markers(["Upload successful", "Success"]),
            download_success: SuccessCriteria::markers(["100.0%"]),
        }
    }
}

impl ToolConfig {
    /// Folder for a radio model
    pub fn model_dir(&self, profile: &Profile) -> PathBuf {
        self.image_root.join(&profile.device_model)
    }

    /// Image uploaded for `profile`
    pub fn image_path(&self, profile: &Profile) -> PathBuf {
        self.model_dir(profile).join(&profile.filename)
    }

    fn base_args(&self, profile: &Profile, image: &Path) -> Vec<String> {
        vec![
            self.program.clone(),
            "-r".into(),
            profile.device_model.clone(),
            format!("--serial={}", self.serial_port),
            format!("--mmap={}", image.display()),
        ]
    }

    /// Command line uploading the profile's image
    pub fn upload_command(&self, profile: &Profile) -> Vec<String> {
        let mut args = self.base_args(profile, &self.image_path(profile));
        args.push(self.upload_flag.clone());
        args
    }

    /// Command line downloading the radio into `target`
    pub fn download_command(&self, profile: &Profile, target: &Path) -> Vec<String> {
        let mut args = self.base_args(profile, target);
        args.push(self.download_flag.clone());
        args
    }

    /// Next free numbered download path in the profile's model folder
    pub fn download_target(&self, profile: &Profile) -> Result<PathBuf> {
        next_incremental_filename(&self.model_dir(profile).join(DOWNLOAD_BASENAME))
    }

    /// Fail if the image root is missing
    pub fn check_image_root(&self) -> Result<()> {
        if self.image_root.is_dir() {
            Ok(())
        } else {
            Err(Error::MissingImageRoot(self.image_root.clone()))
        }
    }
}

/// Next numbered sibling of `path`: `dir/download.img` -> `dir/download<N>.img`
///
/// N is one more than the highest number already present, or 1 if there
/// are none or the directory does not exist yet.
pub fn next_incremental_filename(path: &Path) -> Result<PathBuf> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    if !dir.is_dir() {
        return Ok(dir.join(format!("{}1{}", stem, ext)));
    }

    let mut max = 0u64;
    for entry in fs::read_dir(&dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        let number = name
            .strip_prefix(stem.as_str())
            .and_then(|rest| rest.strip_suffix(ext.as_str()))
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(n) = number {
            max = max.max(n);
        }
    }

    Ok(dir.join(format!("{}{}{}", stem, max + 1, ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn profile() -> Profile {
        Profile::new("green", "green.img", "QYT_KT-WP12")
    }

    #[test]
    fn test_upload_command() {
        let tool = ToolConfig::default();
        assert_eq!(
            tool.upload_command(&profile()),
            [
                "chirpc",
                "-r",
                "QYT_KT-WP12",
                "--serial=/dev/ttyUSB0",
                "--mmap=/home/pi/Radios/QYT_KT-WP12/green.img",
                "--upload-mmap",
            ]
        );
    }

    #[test]
    fn test_download_command() {
        let tool = ToolConfig::default();
        let target = Path::new("/tmp/x/download4.img");
        let args = tool.download_command(&profile(), target);
        assert_eq!(args[4], "--mmap=/tmp/x/download4.img");
        assert_eq!(args[5], "--download-mmap");
    }

    #[test]
    fn test_incremental_filename() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("radio").join("download.img");

        let first = next_incremental_filename(&base).unwrap();
        assert_eq!(first, dir.path().join("radio").join("download1.img"));
        assert!(!dir.path().join("radio").exists());

        fs::create_dir(dir.path().join("radio")).unwrap();

        File::create(dir.path().join("radio/download1.img")).unwrap();
        File::create(dir.path().join("radio/download7.img")).unwrap();
        File::create(dir.path().join("radio/download.img")).unwrap();
        File::create(dir.path().join("radio/downloadx9.img")).unwrap();
        File::create(dir.path().join("radio/download12.bin")).unwrap();

        let next = next_incremental_filename(&base).unwrap();
        assert_eq!(next, dir.path().join("radio").join("download8.img"));
    }

    #[test]
    fn test_download_target_uses_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ToolConfig {
            image_root: dir.path().to_path_buf(),
            ..ToolConfig::default()
        };
        let target = tool.download_target(&profile()).unwrap();
        assert_eq!(target, dir.path().join("QYT_KT-WP12").join("download1.img"));
    }
}

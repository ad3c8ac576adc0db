//! Radio profiles and the selection cursor
//!
//! A profile bundles a display name, a colour hint, the image file to upload
//! and the radio model passed to the programmer tool. Profiles come from a
//! RON/TOML profile file or from scanning the image root directory, and are
//! never modified after startup.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// RGB colour hint in the 0.0..=1.0 range
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ColorHint(pub f32, pub f32, pub f32);

impl Default for ColorHint {
    fn default() -> Self {
        Self(1.0, 1.0, 1.0)
    }
}

/// A named upload/download configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
    /// Display name
    pub name: String,
    /// Colour hint (unused by the text display)
    #[serde(default)]
    pub color: ColorHint,
    /// Image filename inside the model folder
    pub filename: String,
    /// Radio model, also the folder name under the image root
    #[serde(alias = "model")]
    pub device_model: String,
}

impl Profile {
    /// Create a profile with the default colour hint
    pub fn new(
        name: impl Into<String>,
        filename: impl Into<String>,
        device_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            color: ColorHint::default(),
            filename: filename.into(),
            device_model: device_model.into(),
        }
    }

    /// Set the colour hint
    pub fn with_color(mut self, color: ColorHint) -> Self {
        self.color = color;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(alias = "profile", default)]
    profiles: Vec<Profile>,
}

/// Parse profiles from a RON document: `(profiles: [(name: .., ..), ..])`
pub fn parse_ron(content: &str) -> Result<Vec<Profile>> {
    let file: ProfileFile = ron::from_str(content)?;
    validate(file.profiles)
}

/// Parse profiles from a TOML document with `[[profile]]` tables
pub fn parse_toml(content: &str) -> Result<Vec<Profile>> {
    let file: ProfileFile = toml::from_str(content)?;
    validate(file.profiles)
}

/// Load profiles from a `.ron` or `.toml` file
pub fn load_file(path: &Path) -> Result<Vec<Profile>> {
    let content = fs::read_to_string(path).map_err(|source| Error::ProfileRead {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => parse_ron(&content),
        Some("toml") => parse_toml(&content),
        _ => Err(Error::UnsupportedProfileFormat(path.to_path_buf())),
    }
}

/// Build profiles from the image root: one profile per `<model>/<name>.img`
///
/// Numbered download images (`download<N>.img`) are skipped. The result is
/// sorted by model, then filename.
pub fn scan_image_root(root: &Path) -> Result<Vec<Profile>> {
    if !root.is_dir() {
        return Err(Error::MissingImageRoot(root.to_path_buf()));
    }

    let mut profiles = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let model = entry.file_name().to_string_lossy().into_owned();
        if model.starts_with('.') {
            continue;
        }

        for image in fs::read_dir(entry.path())? {
            let image = image?;
            let path = image.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("img") {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if is_download_image(&stem) {
                continue;
            }
            let filename = image.file_name().to_string_lossy().into_owned();
            profiles.push(Profile::new(stem, filename, model.clone()));
        }
    }

    profiles.sort_by(|a, b| {
        a.device_model
            .cmp(&b.device_model)
            .then_with(|| a.filename.cmp(&b.filename))
    });

    log::debug!(
        "Found {} image(s) under {}",
        profiles.len(),
        root.display()
    );
    validate(profiles)
}

fn is_download_image(stem: &str) -> bool {
    stem.strip_prefix("download")
        .is_some_and(|n| n.is_empty() || n.bytes().all(|b| b.is_ascii_digit()))
}

fn validate(profiles: Vec<Profile>) -> Result<Vec<Profile>> {
    if profiles.is_empty() {
        return Err(Error::NoProfiles);
    }
    for (index, p) in profiles.iter().enumerate() {
        if p.filename.is_empty() {
            return Err(Error::InvalidProfile {
                index,
                field: "filename",
            });
        }
        if p.device_model.is_empty() {
            return Err(Error::InvalidProfile {
                index,
                field: "device_model",
            });
        }
    }
    Ok(profiles)
}

/// Ordered profile list with a wrapping cursor
#[derive(Debug, Clone)]
pub struct ProfileSelector {
    profiles: Vec<Profile>,
    index: usize,
}

impl ProfileSelector {
    /// Create a selector positioned on the first profile
    ///
    /// An empty list is a configuration error.
    pub fn new(profiles: Vec<Profile>) -> Result<Self> {
        if profiles.is_empty() {
            return Err(Error::NoProfiles);
        }
        Ok(Self { profiles, index: 0 })
    }

    /// Move to the next profile, wrapping at the end, and return it
    pub fn advance(&mut self) -> &Profile {
        self.index = (self.index + 1) % self.profiles.len();
        &self.profiles[self.index]
    }

    /// The active profile
    pub fn current(&self) -> &Profile {
        &self.profiles[self.index]
    }

    /// Cursor position
    pub fn index(&self) -> usize {
        self.index
    }

    /// All profiles in order
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Number of profiles (always at least one)
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Find a profile by name or by index string
    pub fn find(&self, key: &str) -> Option<(usize, &Profile)> {
        if let Ok(i) = key.parse::<usize>() {
            return self.profiles.get(i).map(|p| (i, p));
        }
        self.profiles
            .iter()
            .enumerate()
            .find(|(_, p)| p.name.eq_ignore_ascii_case(key))
    }

    /// Move the cursor to `index`; out of range indices are ignored
    pub fn select(&mut self, index: usize) -> &Profile {
        if index < self.profiles.len() {
            self.index = index;
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn abc() -> Vec<Profile> {
        vec![
            Profile::new("A", "a.img", "QYT_KT-WP12"),
            Profile::new("B", "b.img", "QYT_KT-WP12"),
            Profile::new("C", "c.img", "Baofeng_UV-5R"),
        ]
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(ProfileSelector::new(vec![]), Err(Error::NoProfiles)));
    }

    #[test]
    fn test_advance_sequence() {
        let mut sel = ProfileSelector::new(abc()).unwrap();
        assert_eq!(sel.current().name, "A");
        assert_eq!(sel.advance().name, "B");
        assert_eq!(sel.advance().name, "C");
        assert_eq!(sel.advance().name, "A");
        assert_eq!(sel.current().name, "A");
    }

    #[test]
    fn test_advance_is_cyclic() {
        for count in 1..=7 {
            let profiles: Vec<_> = (0..count)
                .map(|i| Profile::new(format!("p{}", i), "x.img", "M"))
                .collect();
            let mut sel = ProfileSelector::new(profiles).unwrap();
            for start in 0..count {
                sel.select(start);
                for _ in 0..count {
                    sel.advance();
                }
                assert_eq!(sel.index(), start);
            }
        }
    }

    #[test]
    fn test_find() {
        let sel = ProfileSelector::new(abc()).unwrap();
        assert_eq!(sel.find("b").map(|(i, _)| i), Some(1));
        assert_eq!(sel.find("2").map(|(_, p)| p.name.as_str()), Some("C"));
        assert!(sel.find("9").is_none());
        assert!(sel.find("nope").is_none());
    }

    #[test]
    fn test_parse_ron() {
        let ron = r#"(
            profiles: [
                (name: "green", color: (0.0, 1.0, 0.0), filename: "green.img", device_model: "QYT_KT-WP12"),
                (name: "pink", filename: "pink.img", model: "Baofeng_UV-5R"),
            ],
        )"#;
        let profiles = parse_ron(ron).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].color, ColorHint(0.0, 1.0, 0.0));
        assert_eq!(profiles[1].device_model, "Baofeng_UV-5R");
        assert_eq!(profiles[1].color, ColorHint::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[[profile]]
name = "red"
color = [1.0, 0.0, 0.0]
filename = "red.img"
device_model = "QYT_KT-WP12"
"#;
        let profiles = parse_toml(toml).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "red");
    }

    #[test]
    fn test_parse_rejects_empty_and_invalid() {
        assert!(matches!(parse_toml(""), Err(Error::NoProfiles)));
        let toml = r#"
[[profile]]
name = "red"
filename = "red.img"
device_model = ""
"#;
        assert!(matches!(
            parse_toml(toml),
            Err(Error::InvalidProfile {
                index: 0,
                field: "device_model"
            })
        ));
    }

    #[test]
    fn test_scan_image_root() {
        let dir = tempfile::tempdir().unwrap();
        let wp12 = dir.path().join("QYT_KT-WP12");
        let uv5r = dir.path().join("Baofeng_UV-5R");
        fs::create_dir(&wp12).unwrap();
        fs::create_dir(&uv5r).unwrap();
        File::create(wp12.join("yellow.img")).unwrap();
        File::create(wp12.join("blue.img")).unwrap();
        File::create(wp12.join("download3.img")).unwrap();
        File::create(wp12.join("notes.txt")).unwrap();
        File::create(uv5r.join("cyan.img")).unwrap();

        let profiles = scan_image_root(dir.path()).unwrap();
        let names: Vec<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["cyan", "blue", "yellow"]);
        assert_eq!(profiles[1].device_model, "QYT_KT-WP12");
        assert_eq!(profiles[1].filename, "blue.img");
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            scan_image_root(&missing),
            Err(Error::MissingImageRoot(_))
        ));
        assert!(matches!(scan_image_root(dir.path()), Err(Error::NoProfiles)));
    }
}

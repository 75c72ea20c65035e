use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::{AssetProvider, FontInfo, ImageInfo, SoundInfo, SpriteSheetInfo};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum AssetManifestError {
    #[error("failed to read asset manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid asset manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate asset key '{key}' in {section}")]
    DuplicateKey { section: &'static str, key: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SpriteSheetEntry {
    pub key: String,
    pub path: String,
    pub frame_width: u32,
    pub frame_height: u32,
    #[serde(default = "default_frames_per_facing")]
    pub frames_per_facing: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ImageEntry {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SoundEntry {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FontEntry {
    pub key: String,
    pub path: String,
    pub size_px: u32,
}

fn default_frames_per_facing() -> u32 {
    4
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default)]
    sprite_sheets: Vec<SpriteSheetEntry>,
    #[serde(default)]
    images: Vec<ImageEntry>,
    #[serde(default)]
    sounds: Vec<SoundEntry>,
    #[serde(default)]
    fonts: Vec<FontEntry>,
}

/// Key-to-file registry for every asset the runtime can ask for.
///
/// Built once at startup and shared by `Arc`. Paths in the manifest are
/// relative to the assets directory.
#[derive(Debug, Default)]
pub struct AssetManifest {
    assets_dir: PathBuf,
    sprite_sheets: HashMap<String, SpriteSheetEntry>,
    images: HashMap<String, ImageEntry>,
    sounds: HashMap<String, SoundEntry>,
    fonts: HashMap<String, FontEntry>,
    warned_missing_keys: Mutex<HashMap<&'static str, HashSet<String>>>,
}

impl AssetManifest {
    pub fn empty(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            ..Self::default()
        }
    }

    /// Reads `<assets_dir>/manifest.json`. A missing file is not an error: every
    /// lookup then resolves to a placeholder.
    pub fn load_or_empty(assets_dir: &Path) -> Result<Self, AssetManifestError> {
        let path = assets_dir.join(MANIFEST_FILE_NAME);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "asset_manifest_missing_using_placeholders");
                return Ok(Self::empty(assets_dir));
            }
            Err(source) => return Err(AssetManifestError::Read { path, source }),
        };
        let manifest = Self::from_json_str(assets_dir, &raw).map_err(|error| match error {
            AssetManifestError::Parse { source, .. } => AssetManifestError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        info!(
            path = %path.display(),
            sprite_sheets = manifest.sprite_sheets.len(),
            images = manifest.images.len(),
            sounds = manifest.sounds.len(),
            fonts = manifest.fonts.len(),
            "asset_manifest_loaded"
        );
        Ok(manifest)
    }

    pub fn from_json_str(assets_dir: &Path, raw: &str) -> Result<Self, AssetManifestError> {
        let file: ManifestFile =
            serde_json::from_str(raw).map_err(|source| AssetManifestError::Parse {
                path: assets_dir.join(MANIFEST_FILE_NAME),
                source,
            })?;
        Ok(Self {
            assets_dir: assets_dir.to_path_buf(),
            sprite_sheets: index_by_key("sprite_sheets", file.sprite_sheets, |e| &e.key)?,
            images: index_by_key("images", file.images, |e| &e.key)?,
            sounds: index_by_key("sounds", file.sounds, |e| &e.key)?,
            fonts: index_by_key("fonts", file.fonts, |e| &e.key)?,
            warned_missing_keys: Mutex::new(HashMap::new()),
        })
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        self.assets_dir.join(relative)
    }

    /// Number of registered entries per section: sheets, images, sounds, fonts.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.sprite_sheets.len(),
            self.images.len(),
            self.sounds.len(),
            self.fonts.len(),
        )
    }

    /// Remembers missing keys per kind; only the first miss allocates.
    fn warn_missing_once(&self, kind: &'static str, key: &str) {
        let mut warned = match self.warned_missing_keys.lock() {
            Ok(warned) => warned,
            Err(poisoned) => poisoned.into_inner(),
        };
        let keys = warned.entry(kind).or_default();
        if keys.contains(key) {
            return;
        }
        keys.insert(key.to_string());
        drop(warned);
        warn!(kind, key, "asset_missing_using_placeholder");
    }

    #[cfg(test)]
    fn warned_missing_count(&self) -> usize {
        self.warned_missing_keys
            .lock()
            .map(|warned| warned.values().map(HashSet::len).sum())
            .unwrap_or(0)
    }
}

impl AssetProvider for AssetManifest {
    fn spritesheet(&self, key: &str) -> SpriteSheetInfo {
        match self.sprite_sheets.get(key) {
            Some(entry) => SpriteSheetInfo {
                key: entry.key.clone(),
                path: Some(self.resolve_path(&entry.path)),
                frame_width: entry.frame_width.max(1),
                frame_height: entry.frame_height.max(1),
                frames_per_facing: entry.frames_per_facing.max(1),
                is_placeholder: false,
            },
            None => {
                self.warn_missing_once("sprite_sheet", key);
                SpriteSheetInfo::placeholder(key)
            }
        }
    }

    fn image(&self, key: &str) -> ImageInfo {
        match self.images.get(key) {
            Some(entry) => ImageInfo {
                key: entry.key.clone(),
                path: Some(self.resolve_path(&entry.path)),
                is_placeholder: false,
            },
            None => {
                self.warn_missing_once("image", key);
                ImageInfo::placeholder(key)
            }
        }
    }

    fn sound(&self, key: &str) -> SoundInfo {
        match self.sounds.get(key) {
            Some(entry) => SoundInfo {
                key: entry.key.clone(),
                path: Some(self.resolve_path(&entry.path)),
                is_placeholder: false,
            },
            None => {
                self.warn_missing_once("sound", key);
                SoundInfo::placeholder(key)
            }
        }
    }

    fn font(&self, key: &str) -> FontInfo {
        match self.fonts.get(key) {
            Some(entry) => FontInfo {
                key: entry.key.clone(),
                path: Some(self.resolve_path(&entry.path)),
                size_px: entry.size_px,
                is_placeholder: false,
            },
            None => {
                self.warn_missing_once("font", key);
                FontInfo::placeholder(key)
            }
        }
    }
}

fn index_by_key<T>(
    section: &'static str,
    entries: Vec<T>,
    key_of: impl Fn(&T) -> &String,
) -> Result<HashMap<String, T>, AssetManifestError> {
    let mut indexed = HashMap::with_capacity(entries.len());
    for entry in entries {
        let key = key_of(&entry).clone();
        if indexed.contains_key(&key) {
            return Err(AssetManifestError::DuplicateKey { section, key });
        }
        indexed.insert(key, entry);
    }
    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{PLACEHOLDER_IMAGE_SIZE, PLACEHOLDER_SHEET_FRAME_HEIGHT};

    const SAMPLE: &str = r#"{
        "sprite_sheets": [
            { "key": "ely", "path": "sprites/ely.png", "frame_width": 25, "frame_height": 44 }
        ],
        "sounds": [ { "key": "default", "path": "sounds/blip.wav" } ],
        "fonts": [ { "key": "main_16", "path": "fonts/main.ttf", "size_px": 16 } ]
    }"#;

    #[test]
    fn known_keys_resolve_relative_to_assets_dir() {
        let manifest = AssetManifest::from_json_str(Path::new("/game/assets"), SAMPLE)
            .expect("manifest");
        let sheet = manifest.spritesheet("ely");
        assert!(!sheet.is_placeholder);
        assert_eq!(sheet.frames_per_facing, 4);
        assert_eq!(
            sheet.path,
            Some(PathBuf::from("/game/assets").join("sprites/ely.png"))
        );
        assert!(!manifest.sound("default").is_silent());
        assert_eq!(manifest.font("main_16").size_px, 16);
    }

    #[test]
    fn missing_keys_return_placeholders_repeatedly() {
        let manifest = AssetManifest::empty("/nowhere");
        for _ in 0..2 {
            let sheet = manifest.spritesheet("ghost");
            assert!(sheet.is_placeholder);
            assert_eq!(sheet.frame_height, PLACEHOLDER_SHEET_FRAME_HEIGHT);
            assert!(manifest.image("ghost").is_placeholder);
            assert!(manifest.sound("ghost").is_silent());
            assert!(manifest.font("ghost").is_placeholder);
        }
        assert_eq!(PLACEHOLDER_IMAGE_SIZE, 32);
        // One remembered miss per kind, however often the key is asked for.
        assert_eq!(manifest.warned_missing_count(), 4);
        manifest.spritesheet("wraith");
        assert_eq!(manifest.warned_missing_count(), 5);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let raw = r#"{ "images": [
            { "key": "a", "path": "a.png" },
            { "key": "a", "path": "b.png" }
        ] }"#;
        let error = AssetManifest::from_json_str(Path::new("."), raw).expect_err("duplicate");
        assert!(matches!(
            error,
            AssetManifestError::DuplicateKey { section: "images", .. }
        ));
    }

    #[test]
    fn load_or_empty_tolerates_missing_file_but_not_bad_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = AssetManifest::load_or_empty(dir.path()).expect("missing is fine");
        assert_eq!(manifest.counts(), (0, 0, 0, 0));

        fs::write(dir.path().join(MANIFEST_FILE_NAME), "{ not json").expect("write");
        let error = AssetManifest::load_or_empty(dir.path()).expect_err("bad json");
        assert!(matches!(error, AssetManifestError::Parse { .. }));
    }
}

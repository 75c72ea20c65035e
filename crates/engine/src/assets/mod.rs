mod cache;
mod manifest;

use std::path::PathBuf;

use crate::app::Facing;

pub(crate) use cache::{AssetCache, LoadedImage};
pub use manifest::{
    AssetManifest, AssetManifestError, FontEntry, ImageEntry, SoundEntry, SpriteSheetEntry,
    MANIFEST_FILE_NAME,
};

pub const PLACEHOLDER_SHEET_FRAME_WIDTH: u32 = 25;
pub const PLACEHOLDER_SHEET_FRAME_HEIGHT: u32 = 44;
pub const PLACEHOLDER_IMAGE_SIZE: u32 = 32;
pub const PLACEHOLDER_FONT_SIZE_PX: u32 = 16;

/// Lookups never fail: a missing key yields a deterministic placeholder so the
/// simulation keeps running with absent art or audio.
pub trait AssetProvider {
    fn spritesheet(&self, key: &str) -> SpriteSheetInfo;
    fn image(&self, key: &str) -> ImageInfo;
    fn sound(&self, key: &str) -> SoundInfo;
    fn font(&self, key: &str) -> FontInfo;
}

/// Source rectangle inside an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Character sheet laid out with one row per facing and one column per walk frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheetInfo {
    pub key: String,
    pub path: Option<PathBuf>,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frames_per_facing: u32,
    pub is_placeholder: bool,
}

impl SpriteSheetInfo {
    pub fn placeholder(key: &str) -> Self {
        Self {
            key: key.to_string(),
            path: None,
            frame_width: PLACEHOLDER_SHEET_FRAME_WIDTH,
            frame_height: PLACEHOLDER_SHEET_FRAME_HEIGHT,
            frames_per_facing: 1,
            is_placeholder: true,
        }
    }

    pub fn frame_count(&self, _facing: Facing) -> u32 {
        self.frames_per_facing.max(1)
    }

    /// Region of `frame` for `facing`; the frame index wraps at the row length.
    pub fn frame_region(&self, facing: Facing, frame: u32) -> SourceRegion {
        let column = frame % self.frame_count(facing);
        SourceRegion {
            x: column * self.frame_width,
            y: facing.sheet_row() * self.frame_height,
            width: self.frame_width,
            height: self.frame_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub key: String,
    pub path: Option<PathBuf>,
    pub is_placeholder: bool,
}

impl ImageInfo {
    pub fn placeholder(key: &str) -> Self {
        Self {
            key: key.to_string(),
            path: None,
            is_placeholder: true,
        }
    }
}

/// A sound handle. Playback is outside the runtime; a placeholder is silent.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundInfo {
    pub key: String,
    pub path: Option<PathBuf>,
    pub is_placeholder: bool,
}

impl SoundInfo {
    pub fn placeholder(key: &str) -> Self {
        Self {
            key: key.to_string(),
            path: None,
            is_placeholder: true,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.path.is_none()
    }
}

/// Placeholder fonts render with the built-in bitmap glyphs.
#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    pub key: String,
    pub path: Option<PathBuf>,
    pub size_px: u32,
    pub is_placeholder: bool,
}

impl FontInfo {
    pub fn placeholder(key: &str) -> Self {
        Self {
            key: key.to_string(),
            path: None,
            size_px: PLACEHOLDER_FONT_SIZE_PX,
            is_placeholder: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_region_uses_facing_row_and_wraps_column() {
        let sheet = SpriteSheetInfo {
            key: "ely".to_string(),
            path: None,
            frame_width: 25,
            frame_height: 44,
            frames_per_facing: 4,
            is_placeholder: false,
        };
        assert_eq!(
            sheet.frame_region(Facing::Left, 1),
            SourceRegion {
                x: 25,
                y: 88,
                width: 25,
                height: 44
            }
        );
        assert_eq!(sheet.frame_region(Facing::Down, 5).x, 25);
    }

    #[test]
    fn placeholder_sheet_has_single_frame_rows() {
        let sheet = SpriteSheetInfo::placeholder("missing");
        assert!(sheet.is_placeholder);
        assert_eq!(sheet.frame_count(Facing::Up), 1);
        assert_eq!(sheet.frame_region(Facing::Up, 3).x, 0);
    }
}

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl LoadedImage {
    pub(crate) fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Decoded RGBA images keyed by file path. Failed loads are remembered as `None`
/// so a broken file is decoded and reported only once.
#[derive(Debug, Default)]
pub(crate) struct AssetCache {
    images: HashMap<PathBuf, Option<LoadedImage>>,
    warned_paths: HashSet<PathBuf>,
}

impl AssetCache {
    pub(crate) fn get_or_load(&mut self, path: &Path) -> Option<&LoadedImage> {
        if !self.images.contains_key(path) {
            let loaded = match load_image_rgba(path) {
                Ok(image) => Some(image),
                Err(reason) => {
                    if self.warned_paths.insert(path.to_path_buf()) {
                        warn!(
                            path = %path.display(),
                            reason = reason.as_str(),
                            "image_load_failed_using_placeholder"
                        );
                    }
                    None
                }
            };
            self.images.insert(path.to_path_buf(), loaded);
        }
        self.images.get(path).and_then(Option::as_ref)
    }

    #[cfg(test)]
    pub(crate) fn cached_count(&self) -> usize {
        self.images.len()
    }
}

fn load_image_rgba(path: &Path) -> Result<LoadedImage, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_cached_as_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope.png");
        let mut cache = AssetCache::default();
        assert!(cache.get_or_load(&path).is_none());
        assert!(cache.get_or_load(&path).is_none());
        assert_eq!(cache.cached_count(), 1);
    }

    #[test]
    fn png_round_trips_through_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dot.png");
        let mut buffer = image::RgbaImage::new(2, 1);
        buffer.put_pixel(1, 0, image::Rgba([10, 20, 30, 255]));
        buffer.save(&path).expect("save png");

        let mut cache = AssetCache::default();
        let loaded = cache.get_or_load(&path).expect("loaded");
        assert_eq!((loaded.width, loaded.height), (2, 1));
        assert_eq!(loaded.pixel(1, 0), Some([10, 20, 30, 255]));
        assert_eq!(loaded.pixel(2, 0), None);
    }
}

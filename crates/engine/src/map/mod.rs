mod tmx;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::app::{Rect, Vec2};
use crate::assets::SourceRegion;

pub use tmx::TmxMapProvider;

/// Sort bias applied to placed map objects so they layer just above actors
/// standing at the same depth.
pub const OBJECT_SORT_BIAS: f32 = -10.0;

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse xml in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
    #[error("{path}: <{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        path: PathBuf,
        element: &'static str,
        attribute: &'static str,
    },
    #[error("{path}: attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        path: PathBuf,
        attribute: &'static str,
        value: String,
    },
    #[error("{path}: layer '{layer}' uses unsupported encoding '{encoding}'")]
    UnsupportedEncoding {
        path: PathBuf,
        layer: String,
        encoding: String,
    },
    #[error("{path}: tile gid {gid} does not belong to any tileset")]
    UnknownTileGid { path: PathBuf, gid: u32 },
}

/// One drawable tile, either from a tile layer or a tile object.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSprite {
    pub image: Arc<Path>,
    pub source: SourceRegion,
    pub position: Vec2,
    pub size: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogZone {
    pub text: String,
    pub ticks_per_char: u32,
    pub sound: String,
    pub portrait: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneKind {
    Dialog(DialogZone),
    NextLevel { next_map: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractableZone {
    pub rect: Rect,
    pub kind: ZoneKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapData {
    pub source: PathBuf,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub ground_sprites: Vec<TileSprite>,
    pub object_sprites: Vec<TileSprite>,
    pub obstacles: Vec<Rect>,
    pub zones: Vec<InteractableZone>,
    pub start_point: Option<Vec2>,
}

impl MapData {
    /// Start point, or the origin for maps that do not declare one.
    pub fn start_point_or_origin(&self) -> Vec2 {
        self.start_point.unwrap_or(Vec2::ZERO)
    }
}

pub trait MapProvider {
    fn load(&self, path: &str) -> Result<MapData, MapLoadError>;
}

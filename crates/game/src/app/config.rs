use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use deswonder_engine::CameraSmoothing;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::gameplay::{
    FieldSettings, DEFAULT_ANIMATION_SPEED, DEFAULT_FADE_SPEED, DEFAULT_FOLLOWER_DELAY_TICKS,
    DEFAULT_FOLLOWER_MAX_SPEED, DEFAULT_HISTORY_CAPACITY, DEFAULT_PLAYER_SPEED,
};

pub(crate) const CONFIG_FILE_NAME: &str = "game.json";
const DEFAULT_START_MAP: &str = "level1.tmx";
const DEFAULT_WINDOW_SCALE: u32 = 4;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read game config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid game config {path} at '{json_path}': {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct SmoothingConfig {
    pub(crate) enabled: bool,
    pub(crate) factor: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        let smoothing = CameraSmoothing::default();
        Self {
            enabled: smoothing.enabled,
            factor: smoothing.factor,
        }
    }
}

/// `config/game.json`. Every field may be omitted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) start_map: String,
    pub(crate) camera_smoothing: SmoothingConfig,
    pub(crate) follower_delay_ticks: usize,
    pub(crate) history_capacity: usize,
    pub(crate) follower_max_speed: f32,
    pub(crate) player_speed: f32,
    pub(crate) animation_speed: f32,
    pub(crate) fade_speed: f32,
    pub(crate) window_scale: u32,
    pub(crate) initial_party: Vec<String>,
    /// Item catalog JSON relative to the config directory. The built-in
    /// catalog is used when absent.
    pub(crate) item_catalog: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_map: DEFAULT_START_MAP.to_string(),
            camera_smoothing: SmoothingConfig::default(),
            follower_delay_ticks: DEFAULT_FOLLOWER_DELAY_TICKS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            follower_max_speed: DEFAULT_FOLLOWER_MAX_SPEED,
            player_speed: DEFAULT_PLAYER_SPEED,
            animation_speed: DEFAULT_ANIMATION_SPEED,
            fade_speed: DEFAULT_FADE_SPEED,
            window_scale: DEFAULT_WINDOW_SCALE,
            initial_party: Vec::new(),
            item_catalog: None,
        }
    }
}

impl GameConfig {
    pub(crate) fn from_json_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            ConfigError::Parse {
                path: path.to_path_buf(),
                json_path,
                source: error.into_inner(),
            }
        })
    }

    /// Reads `<config_dir>/game.json`; a missing file yields the defaults.
    pub(crate) fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "game_config_missing_using_defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let config = Self::from_json_str(&path, &raw)?;
        info!(
            path = %path.display(),
            start_map = %config.start_map,
            initial_party = config.initial_party.len(),
            "game_config_loaded"
        );
        Ok(config)
    }

    pub(crate) fn item_catalog_path(&self, config_dir: &Path) -> Option<PathBuf> {
        self.item_catalog
            .as_ref()
            .map(|relative| config_dir.join(relative))
    }

    pub(crate) fn window_scale(&self) -> u32 {
        self.window_scale.max(1)
    }

    pub(crate) fn field_settings(&self) -> FieldSettings {
        FieldSettings {
            start_map: self.start_map.clone(),
            camera_smoothing: CameraSmoothing {
                enabled: self.camera_smoothing.enabled,
                factor: self.camera_smoothing.factor,
            },
            follower_delay_ticks: self.follower_delay_ticks,
            history_capacity: self.history_capacity,
            follower_max_speed: self.follower_max_speed,
            player_speed: self.player_speed,
            animation_speed: self.animation_speed,
            fade_speed: self.fade_speed,
            initial_party: self.initial_party.clone(),
        }
    }
}

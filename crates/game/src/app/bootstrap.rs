use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use deswonder_engine::{
    resolve_app_paths, AssetManifest, AssetManifestError, LoopConfig, Scene, StartupError,
    TmxMapProvider,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{ConfigError, GameConfig};
use super::gameplay::{self, ItemCatalogError, ItemRegistry};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Manifest(#[from] AssetManifestError),
    #[error("failed to read item catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("item catalog {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: ItemCatalogError,
    },
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) assets: Arc<AssetManifest>,
    pub(crate) title_scene: Box<dyn Scene>,
    pub(crate) field_scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Deswonder Startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        assets = %paths.assets_dir.display(),
        maps = %paths.maps_dir.display(),
        "app_paths_resolved"
    );

    let game_config = GameConfig::load_or_default(&paths.config_dir)?;
    let assets = Arc::new(AssetManifest::load_or_empty(&paths.assets_dir)?);
    let registry = Arc::new(load_item_registry(
        game_config.item_catalog_path(&paths.config_dir),
    )?);

    let maps = Box::new(TmxMapProvider::new(paths.maps_dir.clone()));
    let (title_scene, field_scene) =
        gameplay::build_scenes(game_config.field_settings(), maps, registry);

    let defaults = LoopConfig::default();
    let scale = game_config.window_scale();
    let config = LoopConfig {
        window_width: defaults.internal_width * scale,
        window_height: defaults.internal_height * scale,
        ..defaults
    };
    info!(
        window_width = config.window_width,
        window_height = config.window_height,
        target_tps = config.target_tps,
        start_scene = ?config.start_scene,
        "loop_config_ready"
    );

    Ok(AppWiring {
        config,
        assets,
        title_scene,
        field_scene,
    })
}

fn load_item_registry(path: Option<PathBuf>) -> Result<ItemRegistry, BootstrapError> {
    let Some(path) = path else {
        return Ok(ItemRegistry::with_default_catalog());
    };
    let raw = fs::read_to_string(&path).map_err(|source| BootstrapError::CatalogRead {
        path: path.clone(),
        source,
    })?;
    let registry =
        ItemRegistry::from_json_str(&raw).map_err(|source| BootstrapError::Catalog {
            path: path.clone(),
            source,
        })?;
    info!(
        path = %path.display(),
        items = registry.all_items().count(),
        "item_catalog_loaded"
    );
    Ok(registry)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_catalog_path_uses_built_in_items() {
        let registry = load_item_registry(None).expect("default catalog");
        assert_eq!(registry.all_items().count(), 12);
    }

    #[test]
    fn catalog_file_is_read_and_validated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("items.json");
        fs::write(
            &path,
            r#"{"items": [{"id": 1, "name": "Palo", "category": "weapon"}]}"#,
        )
        .expect("write");
        let registry = load_item_registry(Some(path)).expect("catalog");
        assert_eq!(registry.all_items().count(), 1);

        let missing = load_item_registry(Some(dir.path().join("nope.json")));
        assert!(matches!(missing, Err(BootstrapError::CatalogRead { .. })));
    }
}

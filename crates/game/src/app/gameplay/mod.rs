use std::sync::Arc;

use deswonder_engine::{MapProvider, Scene};

mod character;
mod debug_tools;
mod dialog;
mod equipment;
mod field_scene;
mod game_state;
mod inventory;
mod inventory_menu;
mod item;
mod movement;
mod party;
mod title_scene;
mod trajectory;
mod transition;

pub(crate) use field_scene::{FieldScene, FieldSettings};
pub(crate) use item::{ItemCatalogError, ItemRegistry};
pub(crate) use movement::{DEFAULT_ANIMATION_SPEED, DEFAULT_PLAYER_SPEED};
pub(crate) use title_scene::TitleScene;
pub(crate) use trajectory::{
    DEFAULT_FOLLOWER_DELAY_TICKS, DEFAULT_FOLLOWER_MAX_SPEED, DEFAULT_HISTORY_CAPACITY,
};
pub(crate) use transition::DEFAULT_FADE_SPEED;

/// Title and field scenes, in the order the scene machine expects them.
pub(crate) fn build_scenes(
    settings: FieldSettings,
    maps: Box<dyn MapProvider>,
    registry: Arc<ItemRegistry>,
) -> (Box<dyn Scene>, Box<dyn Scene>) {
    let title = TitleScene::default();
    let field = FieldScene::new(settings, maps, registry);
    (Box::new(title), Box::new(field))
}

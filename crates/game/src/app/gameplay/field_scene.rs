use std::sync::Arc;

use deswonder_engine::{
    CameraSmoothing, Facing, InputAction, InputSnapshot, MapData, MapProvider, RenderLayer, Scene,
    SceneCommand, SceneDebugCommand, SceneDebugCommandResult, SceneLoadError, SceneWorld,
    SpriteInstance, SpriteVisual, TextPanel, TileSprite, Vec2, ZoneKind, OBJECT_SORT_BIAS,
};
use tracing::{info, trace, warn};

use super::debug_tools::{self, DebugFlags, HITBOX_COLOR, REACH_COLOR, ZONE_COLOR};
use super::dialog::DialogManager;
use super::game_state::{GameState, GameStateManager};
use super::inventory_menu::{InventoryMenu, MenuSignal};
use super::item::ItemRegistry;
use super::movement::{DirectionKeys, InputHistory, PlayerController};
use super::party::{Party, RecruitOutcome};
use super::trajectory::{Follower, HistoryBuffer};
use super::transition::{FadeEvent, FadeTransition};

const FIELD_CLEAR_COLOR: [u8; 4] = [20, 18, 28, 255];
const MAP_LABEL_POSITION: (i32, i32) = (10, 10);

/// Tunables for the field scene, filled from the game config.
#[derive(Debug, Clone)]
pub(crate) struct FieldSettings {
    pub(crate) start_map: String,
    pub(crate) camera_smoothing: CameraSmoothing,
    pub(crate) follower_delay_ticks: usize,
    pub(crate) history_capacity: usize,
    pub(crate) follower_max_speed: f32,
    pub(crate) player_speed: f32,
    pub(crate) animation_speed: f32,
    pub(crate) fade_speed: f32,
    pub(crate) initial_party: Vec<String>,
}

/// The explorable map: leader, followers, zones, menus and level changes.
pub(crate) struct FieldScene {
    settings: FieldSettings,
    maps: Box<dyn MapProvider>,
    registry: Arc<ItemRegistry>,
    map: MapData,
    map_path: String,
    pending_map: Option<String>,
    party: Party,
    player: PlayerController,
    followers: Vec<Follower>,
    history: HistoryBuffer,
    input_history: InputHistory,
    tick: u64,
    states: GameStateManager,
    fade: FadeTransition,
    dialog: DialogManager,
    menu: InventoryMenu,
    debug: DebugFlags,
}

impl FieldScene {
    pub(crate) fn new(
        settings: FieldSettings,
        maps: Box<dyn MapProvider>,
        registry: Arc<ItemRegistry>,
    ) -> Self {
        let party = Party::new(Arc::clone(&registry));
        let player = PlayerController::new(
            Vec2::ZERO,
            settings.player_speed,
            settings.animation_speed,
        );
        let history = HistoryBuffer::new(settings.history_capacity, settings.follower_delay_ticks);
        let fade = FadeTransition::new(settings.fade_speed);
        Self {
            settings,
            maps,
            registry,
            map: MapData::default(),
            map_path: String::new(),
            pending_map: None,
            party,
            player,
            followers: Vec::new(),
            history,
            input_history: InputHistory::default(),
            tick: 0,
            states: GameStateManager::default(),
            fade,
            dialog: DialogManager::default(),
            menu: InventoryMenu::default(),
            debug: DebugFlags::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn party(&self) -> &Party {
        &self.party
    }

    #[cfg(test)]
    pub(crate) fn player(&self) -> &PlayerController {
        &self.player
    }

    #[cfg(test)]
    pub(crate) fn followers(&self) -> &[Follower] {
        &self.followers
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    #[cfg(test)]
    pub(crate) fn input_history(&self) -> &InputHistory {
        &self.input_history
    }

    #[cfg(test)]
    pub(crate) fn states(&self) -> &GameStateManager {
        &self.states
    }

    #[cfg(test)]
    pub(crate) fn map_path(&self) -> &str {
        &self.map_path
    }

    pub(crate) fn is_fading(&self) -> bool {
        self.fade.is_active()
    }

    #[cfg(test)]
    pub(crate) fn dialog(&self) -> &DialogManager {
        &self.dialog
    }

    #[cfg(test)]
    pub(crate) fn menu(&self) -> &InventoryMenu {
        &self.menu
    }

    fn reset_runtime(&mut self) {
        self.party = Party::new(Arc::clone(&self.registry));
        for name in &self.settings.initial_party {
            if let outcome @ (RecruitOutcome::UnknownName | RecruitOutcome::AlreadyInParty) =
                self.party.recruit(name)
            {
                warn!(name = %name, ?outcome, "initial_party_member_skipped");
            }
        }
        self.player = PlayerController::new(
            Vec2::ZERO,
            self.settings.player_speed,
            self.settings.animation_speed,
        );
        self.history = HistoryBuffer::new(
            self.settings.history_capacity,
            self.settings.follower_delay_ticks,
        );
        self.input_history.clear();
        self.tick = 0;
        self.states.reset();
        self.fade = FadeTransition::new(self.settings.fade_speed);
        self.pending_map = None;
        self.dialog.close();
        self.menu.close();
        self.debug = DebugFlags::default();
        self.followers.clear();
        self.sync_followers();
    }

    /// Puts the leader on the map's start point, drops the recorded history
    /// and stacks every follower on the leader.
    fn place_party_at_start(&mut self) {
        self.player.place_at(self.map.start_point_or_origin());
        self.history.clear();
        let feet = self.player.body().feet();
        for follower in &mut self.followers {
            follower.teleport_to(feet);
        }
    }

    /// Keeps one follower per non-leader party member, in party order.
    fn sync_followers(&mut self) {
        let feet = self.player.body().feet();
        let mut previous = std::mem::take(&mut self.followers);
        for member in self.party.followers() {
            let Some(key) = member.sprite_key() else {
                continue;
            };
            let follower = match previous.iter().position(|f| f.sprite_key() == key) {
                Some(index) => previous.swap_remove(index),
                None => Follower::new(key, feet),
            };
            self.followers.push(follower);
        }
    }

    fn leader_sprite_key(&self) -> &str {
        self.party.leader().sprite_key().unwrap_or("player")
    }

    fn camera_target(&self, world: &SceneWorld) -> Vec2 {
        let sheet = world.assets().spritesheet(self.leader_sprite_key());
        self.player.body().feet() - Vec2::new(0.0, sheet.frame_height as f32 * 0.5)
    }

    /// Movement keeps running under the fade. Menus, pause and zone
    /// interaction wait until it is over.
    fn update_field(&mut self, dt_seconds: f32, input: &InputSnapshot, world: &SceneWorld) {
        let fading = self.fade.is_active();
        if !fading && input.was_pressed(InputAction::ToggleInventory) {
            self.menu.open(&mut self.party);
            self.states.push(GameState::InventoryOpen);
            return;
        }
        if !fading && input.was_pressed(InputAction::Cancel) {
            self.states.push(GameState::Paused);
            return;
        }

        self.input_history
            .record(self.tick, DirectionKeys::from_input(input));
        let axes = self.input_history.input_at_tick(self.tick).axes();
        let frame_count = world
            .assets()
            .spritesheet(self.leader_sprite_key())
            .frame_count(self.player.facing());
        self.player.update(
            axes,
            dt_seconds,
            &self.map.obstacles,
            self.debug.noclip,
            frame_count,
        );
        self.history.record(self.player.snapshot());

        if !fading && input.was_pressed(InputAction::Interact) {
            self.interact();
        }
    }

    fn update_followers(&mut self, dt_seconds: f32, world: &SceneWorld) {
        for follower in &mut self.followers {
            let frame_count = world
                .assets()
                .spritesheet(follower.sprite_key())
                .frame_count(follower.facing());
            follower.update(
                &self.history,
                dt_seconds,
                self.settings.follower_max_speed,
                frame_count,
            );
        }
    }

    /// First zone under the interaction rect wins.
    fn interact(&mut self) {
        let reach = self.player.interaction_rect();
        let Some(zone) = self.map.zones.iter().find(|zone| zone.rect.intersects(&reach)) else {
            return;
        };
        match &zone.kind {
            ZoneKind::NextLevel { next_map } => {
                let next_map = next_map.clone();
                self.begin_level_change(next_map);
            }
            ZoneKind::Dialog(dialog_zone) => {
                if self.dialog.open_zone(dialog_zone) {
                    self.states.push(GameState::DialogActive);
                }
            }
        }
    }

    fn begin_level_change(&mut self, next_map: String) {
        if !self.fade.start() {
            return;
        }
        info!(from = %self.map_path, to = %next_map, "transition_started");
        self.pending_map = Some(next_map);
        self.states.set(GameState::Transitioning);
    }

    /// Runs at full black. A map that fails to load keeps the current world.
    fn finish_level_change(&mut self, world: &mut SceneWorld) {
        if let Some(next_map) = self.pending_map.take() {
            match self.maps.load(&next_map) {
                Ok(map) => {
                    let facing = self.player.facing().opposite();
                    self.map = map;
                    self.map_path = next_map;
                    self.place_party_at_start();
                    self.player.set_facing(facing);
                    let target = self.camera_target(world);
                    world.camera_mut().snap_to(target);
                    info!(map = %self.map_path, "transition_midpoint_map_swapped");
                }
                Err(error) => {
                    warn!(map = %next_map, error = %error, "transition_map_load_failed");
                }
            }
        }
        self.states.replace(GameState::Transitioning, GameState::Playing);
    }

    fn update_dialog(&mut self, input: &InputSnapshot, world: &SceneWorld) {
        if let Some(sound_key) = self.dialog.tick() {
            let sound = world.assets().sound(&sound_key);
            trace!(sound = %sound.key, silent = sound.is_silent(), "dialog_blip");
        }
        if input.was_pressed(InputAction::SkipDialog) {
            self.dialog.skip();
        } else if input.was_pressed(InputAction::Confirm)
            || input.was_pressed(InputAction::Interact)
        {
            self.dialog.confirm();
        }
        if !self.dialog.is_open() {
            self.states.pop();
        }
    }

    fn update_menu(&mut self, input: &InputSnapshot) {
        if self.menu.handle_input(input, &mut self.party) == MenuSignal::Close {
            self.states.pop();
        }
    }

    fn teleport_to_start(&mut self, world: &mut SceneWorld) -> SceneDebugCommandResult {
        self.place_party_at_start();
        let target = self.camera_target(world);
        world.camera_mut().snap_to(target);
        SceneDebugCommandResult::Success("teleported to start point".to_string())
    }

    fn character_sprite(
        world: &SceneWorld,
        sheet_key: &str,
        feet: Vec2,
        facing: Facing,
        frame: u32,
    ) -> SpriteInstance {
        let sheet = world.assets().spritesheet(sheet_key);
        let size = Vec2::new(sheet.frame_width as f32, sheet.frame_height as f32);
        SpriteInstance {
            visual: SpriteVisual::SheetFrame {
                sheet_key: sheet_key.to_string(),
                facing,
                frame,
            },
            position: feet - Vec2::new(size.x * 0.5, size.y),
            size,
            layer: RenderLayer::Object,
            sort_bias: 0.0,
        }
    }

    fn push_debug_overlays(&self, world: &mut SceneWorld) {
        if self.debug.show_hitboxes {
            for obstacle in &self.map.obstacles {
                world.push_debug_rect(*obstacle, HITBOX_COLOR);
            }
            world.push_debug_rect(self.player.body().hitbox(), HITBOX_COLOR);
            world.push_debug_rect(self.player.interaction_rect(), REACH_COLOR);
        }
        if self.debug.show_zones {
            for zone in &self.map.zones {
                world.push_debug_rect(zone.rect, ZONE_COLOR);
            }
        }
    }
}

fn tile_sprite(tile: &TileSprite, layer: RenderLayer, sort_bias: f32) -> SpriteInstance {
    SpriteInstance {
        visual: SpriteVisual::ImageRegion {
            image: Arc::clone(&tile.image),
            source: tile.source,
        },
        position: tile.position,
        size: tile.size,
        layer,
        sort_bias,
    }
}

impl Scene for FieldScene {
    fn load(&mut self, world: &mut SceneWorld) -> Result<(), SceneLoadError> {
        let start_map = self.settings.start_map.clone();
        let map = self
            .maps
            .load(&start_map)
            .map_err(|source| SceneLoadError::Map {
                path: start_map.clone(),
                source,
            })?;

        self.reset_runtime();
        self.map = map;
        self.map_path = start_map;
        self.place_party_at_start();

        world.set_clear_color(FIELD_CLEAR_COLOR);
        world
            .camera_mut()
            .set_smoothing(self.settings.camera_smoothing);
        let target = self.camera_target(world);
        world.camera_mut().snap_to(target);

        info!(
            map = %self.map_path,
            party = self.party.len(),
            history_capacity = self.history.capacity(),
            "field_scene_loaded"
        );
        Ok(())
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        self.tick += 1;

        if self.fade.is_active() {
            match self.fade.update(fixed_dt_seconds) {
                FadeEvent::Midpoint => self.finish_level_change(world),
                FadeEvent::Finished => info!(map = %self.map_path, "transition_finished"),
                FadeEvent::None => {}
            }
        }

        match self.states.current() {
            GameState::Playing | GameState::Transitioning => {
                self.update_field(fixed_dt_seconds, input, world);
            }
            GameState::InventoryOpen => self.update_menu(input),
            GameState::DialogActive => self.update_dialog(input, world),
            GameState::Paused => {
                if input.was_pressed(InputAction::Cancel)
                    || input.was_pressed(InputAction::Confirm)
                {
                    self.states.pop();
                }
            }
            GameState::DebugMenu => {}
        }
        self.update_followers(fixed_dt_seconds, world);

        if self.states.take_changed() && !self.states.can_move_player() {
            self.player.halt();
        }
        debug_tools::apply_god_mode(&mut self.party, self.debug);

        let target = self.camera_target(world);
        world.camera_mut().follow(target);
        SceneCommand::None
    }

    fn render(&mut self, world: &mut SceneWorld) {
        world.set_clear_color(FIELD_CLEAR_COLOR);
        for tile in &self.map.ground_sprites {
            world.push_sprite(tile_sprite(tile, RenderLayer::Ground, 0.0));
        }
        for tile in &self.map.object_sprites {
            world.push_sprite(tile_sprite(tile, RenderLayer::Object, OBJECT_SORT_BIAS));
        }
        for follower in &self.followers {
            let sprite = Self::character_sprite(
                world,
                follower.sprite_key(),
                follower.position(),
                follower.facing(),
                follower.frame(),
            );
            world.push_sprite(sprite);
        }
        let leader = Self::character_sprite(
            world,
            self.leader_sprite_key(),
            self.player.body().feet(),
            self.player.facing(),
            self.player.frame() as u32,
        );
        world.push_sprite(leader);

        self.push_debug_overlays(world);

        world.push_panel(TextPanel {
            x: MAP_LABEL_POSITION.0,
            y: MAP_LABEL_POSITION.1,
            width: 0,
            lines: vec![format!("MAPA: {}", self.map_path)],
            highlighted_line: None,
        });
        if self.menu.is_open() {
            world.push_panel(self.menu.panel(&self.party));
        }
        let viewport = world.camera().viewport();
        if let Some(panel) = self.dialog.panel(viewport.width, viewport.height) {
            world.push_panel(panel);
        }
        if self.states.is(GameState::Paused) {
            world.push_panel(TextPanel {
                x: viewport.width as i32 / 2 - 20,
                y: viewport.height as i32 / 2 - 6,
                width: 0,
                lines: vec!["PAUSA".to_string()],
                highlighted_line: None,
            });
        }
        world.set_fade_alpha(self.fade.alpha());
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        self.dialog.close();
        self.menu.close();
        self.history.clear();
        info!(map = %self.map_path, "field_scene_unloaded");
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let fading = if self.is_fading() { " | fading" } else { "" };
        Some(format!(
            "{} | {:?} (depth {}) | party {} | history {}{fading}",
            self.map_path,
            self.states.current(),
            self.states.depth(),
            self.party.len(),
            self.history.len()
        ))
    }

    fn set_debug_console_open(&mut self, open: bool) {
        if open && !self.states.is(GameState::DebugMenu) {
            self.states.push(GameState::DebugMenu);
        } else if !open && self.states.is(GameState::DebugMenu) {
            self.states.pop();
        }
    }

    fn execute_debug_command(
        &mut self,
        command: SceneDebugCommand,
        world: &mut SceneWorld,
    ) -> SceneDebugCommandResult {
        let result = match debug_tools::execute(&command, &mut self.party, &mut self.debug) {
            Some(result) => result,
            None => self.teleport_to_start(world),
        };
        self.sync_followers();
        result
    }
}

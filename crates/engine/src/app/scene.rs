use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::assets::{AssetManifest, AssetProvider};
use crate::map::MapLoadError;

use super::{CameraRig, CameraSmoothing, InputSnapshot, Rect, SpriteInstance, Viewport};

const DEFAULT_CLEAR_COLOR: [u8; 4] = [12, 12, 16, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKey {
    Title,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(SceneKey),
    HardResetTo(SceneKey),
    Quit,
}

#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("failed to load map '{path}': {source}")]
    Map {
        path: String,
        #[source]
        source: MapLoadError,
    },
    #[error("scene setup failed: {0}")]
    Setup(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneDebugCommand {
    Recruit { name: String },
    DismissLast,
    HealAll,
    DamageAll { amount: i32 },
    GiveWeapons,
    GiveArmors,
    ClearInventory,
    GiveLegendary,
    UnequipAll,
    ToggleHitboxes,
    ToggleZones,
    ToggleNoclip,
    ToggleGodMode,
    TeleportToStart,
    MaxStats,
    ResetStats,
    PartyInfo,
    ItemCounts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneDebugCommandResult {
    Unsupported,
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugRect {
    pub rect: Rect,
    pub color: [u8; 4],
}

/// Screen-space text box. Coordinates are internal-resolution pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextPanel {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub lines: Vec<String>,
    pub highlighted_line: Option<usize>,
}

/// Everything a scene hands to the renderer for one frame, plus its camera.
///
/// Scenes rebuild the frame lists in `Scene::render` after `begin_frame`.
pub struct SceneWorld {
    camera: CameraRig,
    clear_color: [u8; 4],
    sprites: Vec<SpriteInstance>,
    debug_rects: Vec<DebugRect>,
    panels: Vec<TextPanel>,
    fade_alpha: u8,
    assets: Arc<AssetManifest>,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new(
            Viewport {
                width: 320,
                height: 240,
            },
            Arc::new(AssetManifest::default()),
        )
    }
}

impl SceneWorld {
    pub fn new(viewport: Viewport, assets: Arc<AssetManifest>) -> Self {
        Self {
            camera: CameraRig::new(viewport, CameraSmoothing::default()),
            clear_color: DEFAULT_CLEAR_COLOR,
            sprites: Vec::new(),
            debug_rects: Vec::new(),
            panels: Vec::new(),
            fade_alpha: 0,
            assets,
        }
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn assets(&self) -> &dyn AssetProvider {
        self.assets.as_ref()
    }

    pub(crate) fn set_assets(&mut self, assets: Arc<AssetManifest>) {
        self.assets = assets;
    }

    pub fn begin_frame(&mut self) {
        self.sprites.clear();
        self.debug_rects.clear();
        self.panels.clear();
        self.fade_alpha = 0;
    }

    pub fn set_clear_color(&mut self, color: [u8; 4]) {
        self.clear_color = color;
    }

    pub fn clear_color(&self) -> [u8; 4] {
        self.clear_color
    }

    pub fn push_sprite(&mut self, sprite: SpriteInstance) {
        self.sprites.push(sprite);
    }

    pub fn sprites(&self) -> &[SpriteInstance] {
        &self.sprites
    }

    pub fn push_debug_rect(&mut self, rect: Rect, color: [u8; 4]) {
        self.debug_rects.push(DebugRect { rect, color });
    }

    pub fn debug_rects(&self) -> &[DebugRect] {
        &self.debug_rects
    }

    pub fn push_panel(&mut self, panel: TextPanel) {
        self.panels.push(panel);
    }

    pub fn panels(&self) -> &[TextPanel] {
        &self.panels
    }

    pub fn set_fade_alpha(&mut self, alpha: u8) {
        self.fade_alpha = alpha;
    }

    pub fn fade_alpha(&self) -> u8 {
        self.fade_alpha
    }

    /// Drops all frame state and recenters the camera. Assets and viewport survive.
    pub fn clear(&mut self) {
        self.begin_frame();
        self.clear_color = DEFAULT_CLEAR_COLOR;
        let viewport = self.camera.viewport();
        let smoothing = self.camera.smoothing();
        self.camera = CameraRig::new(viewport, smoothing);
    }
}

pub trait Scene {
    /// Builds the scene's world. On error the scene must not be left half-loaded:
    /// the machine clears the world and keeps the previous scene active.
    fn load(&mut self, world: &mut SceneWorld) -> Result<(), SceneLoadError>;
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn render(&mut self, world: &mut SceneWorld);
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
    fn set_debug_console_open(&mut self, _open: bool) {}
    fn execute_debug_command(
        &mut self,
        _command: SceneDebugCommand,
        _world: &mut SceneWorld,
    ) -> SceneDebugCommandResult {
        SceneDebugCommandResult::Unsupported
    }
}

struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRuntime {
    fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    fn load(&mut self, key: SceneKey) -> Result<(), SceneLoadError> {
        let (scene, world) = (&mut self.scene, &mut self.world);
        match scene.load(world) {
            Ok(()) => {
                self.is_loaded = true;
                Ok(())
            }
            Err(load_error) => {
                error!(scene = ?key, error = %load_error, "scene_load_failed");
                world.clear();
                self.is_loaded = false;
                Err(load_error)
            }
        }
    }

    fn unload(&mut self) {
        if !self.is_loaded {
            return;
        }
        let (scene, world) = (&mut self.scene, &mut self.world);
        scene.unload(world);
        world.clear();
        self.is_loaded = false;
    }
}

pub(crate) struct SceneMachine {
    title: SceneRuntime,
    field: SceneRuntime,
    active_scene: SceneKey,
}

impl SceneMachine {
    pub(crate) fn new(
        title: Box<dyn Scene>,
        field: Box<dyn Scene>,
        active_scene: SceneKey,
    ) -> Self {
        Self {
            title: SceneRuntime::new(title),
            field: SceneRuntime::new(field),
            active_scene,
        }
    }

    pub(crate) fn active_scene(&self) -> SceneKey {
        self.active_scene
    }

    pub(crate) fn configure_worlds(&mut self, viewport: Viewport, assets: Arc<AssetManifest>) {
        for runtime in [&mut self.title, &mut self.field] {
            runtime.world.camera_mut().set_viewport(viewport);
            runtime.world.set_assets(Arc::clone(&assets));
        }
    }

    pub(crate) fn load_active(&mut self) -> Result<(), SceneLoadError> {
        let key = self.active_scene;
        let runtime = self.runtime_mut(key);
        if runtime.is_loaded {
            return Ok(());
        }
        runtime.load(key)
    }

    pub(crate) fn update_active(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
    ) -> SceneCommand {
        let runtime = self.active_runtime_mut();
        if !runtime.is_loaded {
            return SceneCommand::None;
        }
        let (scene, world) = (&mut runtime.scene, &mut runtime.world);
        scene.update(fixed_dt_seconds, input, world)
    }

    pub(crate) fn render_active(&mut self) {
        let runtime = self.active_runtime_mut();
        let (scene, world) = (&mut runtime.scene, &mut runtime.world);
        world.begin_frame();
        if runtime.is_loaded {
            scene.render(world);
        }
    }

    pub(crate) fn active_world(&self) -> &SceneWorld {
        &self.active_runtime_ref().world
    }

    pub(crate) fn debug_title_active(&self) -> Option<String> {
        let runtime = self.active_runtime_ref();
        runtime.scene.debug_title(&runtime.world)
    }

    pub(crate) fn set_debug_console_open_active(&mut self, open: bool) {
        self.active_runtime_mut().scene.set_debug_console_open(open);
    }

    pub(crate) fn execute_debug_command_active(
        &mut self,
        command: SceneDebugCommand,
    ) -> SceneDebugCommandResult {
        let runtime = self.active_runtime_mut();
        runtime
            .scene
            .execute_debug_command(command, &mut runtime.world)
    }

    /// Activates `next_scene`, loading it first if needed. A failed load keeps
    /// the current scene active.
    pub(crate) fn switch_to(&mut self, next_scene: SceneKey) -> Result<bool, SceneLoadError> {
        if self.active_scene == next_scene {
            return Ok(false);
        }
        let runtime = self.runtime_mut(next_scene);
        if !runtime.is_loaded {
            runtime.load(next_scene)?;
        }
        self.active_scene = next_scene;
        info!(scene = ?next_scene, "scene_switched");
        Ok(true)
    }

    /// Unloads and reloads `next_scene`. If the active scene fails to come
    /// back, the other scene takes over.
    pub(crate) fn hard_reset_to(&mut self, next_scene: SceneKey) -> Result<bool, SceneLoadError> {
        let runtime = self.runtime_mut(next_scene);
        runtime.unload();
        if let Err(load_error) = runtime.load(next_scene) {
            if self.active_scene == next_scene {
                self.fall_back_from(next_scene);
            }
            return Err(load_error);
        }
        let changed = self.active_scene != next_scene;
        self.active_scene = next_scene;
        info!(scene = ?next_scene, "scene_reset");
        Ok(changed)
    }

    fn fall_back_from(&mut self, failed: SceneKey) {
        let fallback = match failed {
            SceneKey::Title => SceneKey::Field,
            SceneKey::Field => SceneKey::Title,
        };
        let runtime = self.runtime_mut(fallback);
        if !runtime.is_loaded && runtime.load(fallback).is_err() {
            warn!(failed = ?failed, fallback = ?fallback, "scene_fallback_unavailable");
            return;
        }
        self.active_scene = fallback;
        warn!(failed = ?failed, fallback = ?fallback, "scene_fell_back");
    }

    pub(crate) fn shutdown_all(&mut self) {
        self.title.unload();
        self.field.unload();
    }

    fn active_runtime_mut(&mut self) -> &mut SceneRuntime {
        self.runtime_mut(self.active_scene)
    }

    fn active_runtime_ref(&self) -> &SceneRuntime {
        self.runtime_ref(self.active_scene)
    }

    fn runtime_mut(&mut self, key: SceneKey) -> &mut SceneRuntime {
        match key {
            SceneKey::Title => &mut self.title,
            SceneKey::Field => &mut self.field,
        }
    }

    fn runtime_ref(&self, key: SceneKey) -> &SceneRuntime {
        match key {
            SceneKey::Title => &self.title,
            SceneKey::Field => &self.field,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::app::{RenderLayer, SpriteVisual, Vec2};

    struct CountingScene {
        fail_load: bool,
        fail_reload: bool,
        own_loads: u32,
        step_x: f32,
        position_x: f32,
        loads: Rc<Cell<u32>>,
    }

    impl CountingScene {
        fn boxed(fail_load: bool, step_x: f32, loads: &Rc<Cell<u32>>) -> Box<dyn Scene> {
            Box::new(Self {
                fail_load,
                fail_reload: false,
                own_loads: 0,
                step_x,
                position_x: 0.0,
                loads: Rc::clone(loads),
            })
        }

        /// Loads once, then fails every later load.
        fn failing_on_reload(step_x: f32, loads: &Rc<Cell<u32>>) -> Box<dyn Scene> {
            Box::new(Self {
                fail_load: false,
                fail_reload: true,
                own_loads: 0,
                step_x,
                position_x: 0.0,
                loads: Rc::clone(loads),
            })
        }
    }

    impl Scene for CountingScene {
        fn load(&mut self, world: &mut SceneWorld) -> Result<(), SceneLoadError> {
            self.loads.set(self.loads.get() + 1);
            self.own_loads += 1;
            self.position_x = 0.0;
            world.push_debug_rect(Rect::new(0.0, 0.0, 4.0, 4.0), [1, 2, 3, 255]);
            if self.fail_load || (self.fail_reload && self.own_loads > 1) {
                return Err(SceneLoadError::Setup("broken".to_string()));
            }
            Ok(())
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            _world: &mut SceneWorld,
        ) -> SceneCommand {
            self.position_x += self.step_x;
            SceneCommand::None
        }

        fn render(&mut self, world: &mut SceneWorld) {
            world.push_sprite(SpriteInstance {
                visual: SpriteVisual::Solid {
                    color: [255, 255, 255, 255],
                },
                position: Vec2::new(self.position_x, 0.0),
                size: Vec2::new(1.0, 1.0),
                layer: RenderLayer::Object,
                sort_bias: 0.0,
            });
        }

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    fn rendered_x(machine: &mut SceneMachine) -> f32 {
        machine.render_active();
        machine.active_world().sprites()[0].position.x
    }

    #[test]
    fn inactive_scene_does_not_advance() {
        let loads = Rc::new(Cell::new(0));
        let mut machine = SceneMachine::new(
            CountingScene::boxed(false, 1.0, &loads),
            CountingScene::boxed(false, 3.0, &loads),
            SceneKey::Title,
        );
        machine.load_active().expect("title loads");
        let _ = machine.update_active(1.0 / 60.0, &InputSnapshot::empty());
        assert_eq!(rendered_x(&mut machine), 1.0);

        assert!(machine.switch_to(SceneKey::Field).expect("field loads"));
        for _ in 0..10 {
            let _ = machine.update_active(1.0 / 60.0, &InputSnapshot::empty());
        }
        assert!(machine.switch_to(SceneKey::Title).expect("already loaded"));
        assert_eq!(rendered_x(&mut machine), 1.0);
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn failed_load_keeps_previous_scene_and_clears_world() {
        let loads = Rc::new(Cell::new(0));
        let mut machine = SceneMachine::new(
            CountingScene::boxed(false, 1.0, &loads),
            CountingScene::boxed(true, 1.0, &loads),
            SceneKey::Title,
        );
        machine.load_active().expect("title loads");
        let error = machine
            .switch_to(SceneKey::Field)
            .expect_err("field fails to load");
        assert!(matches!(error, SceneLoadError::Setup(_)));
        assert_eq!(machine.active_scene(), SceneKey::Title);
        assert!(machine.field.world.debug_rects().is_empty());
        assert!(!machine.field.is_loaded);
    }

    #[test]
    fn failed_reset_of_active_scene_hands_over_to_the_other_scene() {
        let loads = Rc::new(Cell::new(0));
        let mut machine = SceneMachine::new(
            CountingScene::boxed(false, 1.0, &loads),
            CountingScene::failing_on_reload(5.0, &loads),
            SceneKey::Field,
        );
        machine.load_active().expect("field loads");
        let _ = machine.update_active(1.0 / 60.0, &InputSnapshot::empty());
        assert_eq!(rendered_x(&mut machine), 5.0);

        let error = machine
            .hard_reset_to(SceneKey::Field)
            .expect_err("field reload fails");
        assert!(matches!(error, SceneLoadError::Setup(_)));
        assert!(!machine.field.is_loaded);
        assert!(machine.field.world.debug_rects().is_empty());
        assert_eq!(machine.active_scene(), SceneKey::Title);
        assert!(machine.title.is_loaded);

        let _ = machine.update_active(1.0 / 60.0, &InputSnapshot::empty());
        assert_eq!(rendered_x(&mut machine), 1.0);
        assert_eq!(loads.get(), 3);
    }

    #[test]
    fn unloaded_active_scene_is_neither_updated_nor_rendered() {
        let loads = Rc::new(Cell::new(0));
        let mut machine = SceneMachine::new(
            CountingScene::boxed(true, 1.0, &loads),
            CountingScene::failing_on_reload(5.0, &loads),
            SceneKey::Field,
        );
        machine.load_active().expect("field loads");
        assert!(machine.hard_reset_to(SceneKey::Field).is_err());
        assert_eq!(machine.active_scene(), SceneKey::Field);
        assert!(!machine.field.is_loaded);

        let command = machine.update_active(1.0 / 60.0, &InputSnapshot::empty());
        assert_eq!(command, SceneCommand::None);
        machine.render_active();
        assert!(machine.active_world().sprites().is_empty());
    }

    #[test]
    fn hard_reset_reloads_scene_state() {
        let loads = Rc::new(Cell::new(0));
        let mut machine = SceneMachine::new(
            CountingScene::boxed(false, 2.0, &loads),
            CountingScene::boxed(false, 1.0, &loads),
            SceneKey::Title,
        );
        machine.load_active().expect("title loads");
        let _ = machine.update_active(1.0 / 60.0, &InputSnapshot::empty());
        assert_eq!(rendered_x(&mut machine), 2.0);

        let changed = machine.hard_reset_to(SceneKey::Title).expect("reload");
        assert!(!changed);
        assert_eq!(rendered_x(&mut machine), 0.0);
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn switching_to_active_scene_is_a_no_op() {
        let loads = Rc::new(Cell::new(0));
        let mut machine = SceneMachine::new(
            CountingScene::boxed(false, 1.0, &loads),
            CountingScene::boxed(false, 1.0, &loads),
            SceneKey::Title,
        );
        machine.load_active().expect("title loads");
        assert!(!machine.switch_to(SceneKey::Title).expect("no-op"));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn begin_frame_resets_per_frame_lists_but_not_camera() {
        let mut world = SceneWorld::default();
        world.camera_mut().snap_to(Vec2::new(0.0, 0.0));
        world.push_debug_rect(Rect::new(0.0, 0.0, 1.0, 1.0), [0, 0, 0, 255]);
        world.push_panel(TextPanel::default());
        world.set_fade_alpha(40);
        world.begin_frame();
        assert!(world.debug_rects().is_empty());
        assert!(world.panels().is_empty());
        assert_eq!(world.fade_alpha(), 0);
        assert_eq!(world.camera().offset().x, 160);
    }
}

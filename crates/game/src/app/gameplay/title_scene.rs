use deswonder_engine::{
    InputAction, InputSnapshot, Scene, SceneCommand, SceneKey, SceneLoadError, SceneWorld,
    TextPanel,
};
use tracing::info;

const TITLE_CLEAR_COLOR: [u8; 4] = [8, 8, 16, 255];
const TITLE_LINES: [&str; 4] = ["DESWONDER", "", "ESPACIO: comenzar", "ESC: salir"];

#[derive(Debug, Default)]
pub(crate) struct TitleScene {
    ticks: u64,
}

impl Scene for TitleScene {
    fn load(&mut self, world: &mut SceneWorld) -> Result<(), SceneLoadError> {
        self.ticks = 0;
        world.set_clear_color(TITLE_CLEAR_COLOR);
        info!("title_scene_loaded");
        Ok(())
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        _world: &mut SceneWorld,
    ) -> SceneCommand {
        self.ticks += 1;
        if input.was_pressed(InputAction::Confirm) {
            return SceneCommand::SwitchTo(SceneKey::Field);
        }
        if input.was_pressed(InputAction::Cancel) {
            return SceneCommand::Quit;
        }
        SceneCommand::None
    }

    fn render(&mut self, world: &mut SceneWorld) {
        world.set_clear_color(TITLE_CLEAR_COLOR);
        let viewport = world.camera().viewport();
        world.push_panel(TextPanel {
            x: viewport.width as i32 / 2 - 40,
            y: viewport.height as i32 / 2 - 20,
            width: 80,
            lines: TITLE_LINES.iter().map(|line| line.to_string()).collect(),
            highlighted_line: None,
        });
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        info!(ticks = self.ticks, "title_scene_unloaded");
    }
}

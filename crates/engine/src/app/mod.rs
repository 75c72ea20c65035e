mod geometry;
mod input;
mod loop_runner;
mod rendering;
mod scene;
mod tools;

pub use geometry::{Facing, IVec2, Rect, Vec2};
pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::{
    build_draw_list, camera_offset_for_target, world_to_screen, CameraRig, CameraSmoothing,
    DrawCommand, RenderLayer, Renderer, SpriteInstance, SpriteVisual, Viewport,
};
pub use scene::{
    DebugRect, Scene, SceneCommand, SceneDebugCommand, SceneDebugCommandResult, SceneKey,
    SceneLoadError, SceneWorld, TextPanel,
};

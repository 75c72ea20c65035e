mod camera;
mod draw_list;
mod raster;
mod renderer;

pub use camera::{
    camera_offset_for_target, world_to_screen, CameraRig, CameraSmoothing, Viewport,
};
pub use draw_list::{build_draw_list, DrawCommand, RenderLayer, SpriteInstance, SpriteVisual};
pub(crate) use raster::{Canvas, LINE_ADVANCE};
pub use renderer::Renderer;

use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use winit::window::Window;

use crate::app::tools::{draw_console, ConsoleState};
use crate::app::{SceneWorld, SpriteInstance, SpriteVisual, TextPanel};
use crate::assets::AssetCache;

use super::camera::{world_to_screen, Viewport};
use super::draw_list::{build_draw_list, DrawCommand};
use super::raster::{text_width, Canvas, LINE_ADVANCE};

const PLACEHOLDER_COLOR: [u8; 4] = [220, 60, 200, 255];
const PANEL_BG_COLOR: [u8; 4] = [16, 16, 40, 220];
const PANEL_BORDER_COLOR: [u8; 4] = [230, 230, 240, 255];
const PANEL_TEXT_COLOR: [u8; 4] = [240, 240, 240, 255];
const PANEL_HIGHLIGHT_COLOR: [u8; 4] = [70, 70, 140, 255];
const PANEL_PADDING: i32 = 4;

/// Draws scene frames into a fixed internal-resolution buffer that `pixels`
/// scales onto the window surface.
pub struct Renderer {
    pixels: Pixels<'static>,
    viewport: Viewport,
    cache: AssetCache,
    draw_list: Vec<DrawCommand>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: Viewport) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), window);
        let pixels = Pixels::new(viewport.width, viewport.height, surface)?;
        Ok(Self {
            pixels,
            viewport,
            cache: AssetCache::default(),
            draw_list: Vec::new(),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resizes the window surface; the internal resolution never changes.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        console: Option<&ConsoleState>,
    ) -> Result<(), Error> {
        let frame = self.pixels.frame_mut();
        let mut canvas = Canvas::new(frame, self.viewport.width, self.viewport.height);
        compose_frame(&mut canvas, world, &mut self.cache, &mut self.draw_list);
        if let Some(console) = console {
            draw_console(&mut canvas, console);
        }
        self.pixels.render()
    }
}

/// Clear, sorted sprites, debug outlines, UI panels, then the fade overlay.
pub(crate) fn compose_frame(
    canvas: &mut Canvas,
    world: &SceneWorld,
    cache: &mut AssetCache,
    draw_list: &mut Vec<DrawCommand>,
) {
    canvas.clear(world.clear_color());
    let offset = world.camera().offset();
    let viewport = Viewport {
        width: canvas.width(),
        height: canvas.height(),
    };
    build_draw_list(world.sprites(), offset, viewport, draw_list);

    for command in draw_list.iter() {
        let sprite = &world.sprites()[command.sprite_index];
        draw_sprite(
            canvas,
            world,
            cache,
            sprite,
            command.screen_position.x,
            command.screen_position.y,
        );
    }

    for debug_rect in world.debug_rects() {
        let top_left = world_to_screen(debug_rect.rect.top_left(), offset);
        canvas.outline_rect(
            top_left.x,
            top_left.y,
            debug_rect.rect.width.round() as i32,
            debug_rect.rect.height.round() as i32,
            debug_rect.color,
        );
    }

    for panel in world.panels() {
        draw_panel(canvas, panel);
    }

    canvas.fade_to_black(world.fade_alpha());
}

fn draw_sprite(
    canvas: &mut Canvas,
    world: &SceneWorld,
    cache: &mut AssetCache,
    sprite: &SpriteInstance,
    x: i32,
    y: i32,
) {
    let width = sprite.size.x.round() as i32;
    let height = sprite.size.y.round() as i32;
    match &sprite.visual {
        SpriteVisual::SheetFrame {
            sheet_key,
            facing,
            frame,
        } => {
            let sheet = world.assets().spritesheet(sheet_key);
            let region = sheet.frame_region(*facing, *frame);
            let image = sheet.path.as_deref().and_then(|path| cache.get_or_load(path));
            match image {
                Some(image) => canvas.blit_region(image, region, x, y),
                None => canvas.fill_rect(x, y, width, height, PLACEHOLDER_COLOR),
            }
        }
        SpriteVisual::ImageRegion { image, source } => match cache.get_or_load(image) {
            Some(loaded) => canvas.blit_region(loaded, *source, x, y),
            None => canvas.fill_rect(x, y, width, height, PLACEHOLDER_COLOR),
        },
        SpriteVisual::Solid { color } => canvas.fill_rect(x, y, width, height, *color),
    }
}

fn draw_panel(canvas: &mut Canvas, panel: &TextPanel) {
    let content_width = panel
        .lines
        .iter()
        .map(|line| text_width(line))
        .max()
        .unwrap_or(0);
    let width = panel.width.max(content_width + 2 * PANEL_PADDING);
    let height = panel.lines.len() as i32 * LINE_ADVANCE + 2 * PANEL_PADDING;
    canvas.fill_rect(panel.x, panel.y, width, height, PANEL_BG_COLOR);
    canvas.outline_rect(panel.x, panel.y, width, height, PANEL_BORDER_COLOR);

    for (index, line) in panel.lines.iter().enumerate() {
        let line_y = panel.y + PANEL_PADDING + index as i32 * LINE_ADVANCE;
        if panel.highlighted_line == Some(index) {
            canvas.fill_rect(
                panel.x + 1,
                line_y - 1,
                width - 2,
                LINE_ADVANCE,
                PANEL_HIGHLIGHT_COLOR,
            );
        }
        canvas.draw_text(panel.x + PANEL_PADDING, line_y, line, PANEL_TEXT_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Facing, RenderLayer, Vec2};

    const WIDTH: u32 = 32;
    const HEIGHT: u32 = 24;

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * WIDTH + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    fn small_world() -> SceneWorld {
        let mut world = SceneWorld::default();
        world.camera_mut().set_viewport(Viewport {
            width: WIDTH,
            height: HEIGHT,
        });
        world.set_clear_color([0, 0, 0, 255]);
        world
    }

    fn solid(color: [u8; 4], y: f32, layer: RenderLayer) -> SpriteInstance {
        SpriteInstance {
            visual: SpriteVisual::Solid { color },
            position: Vec2::new(0.0, y),
            size: Vec2::new(8.0, 8.0),
            layer,
            sort_bias: 0.0,
        }
    }

    fn compose(world: &SceneWorld) -> Vec<u8> {
        let mut frame = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
        let mut canvas = Canvas::new(&mut frame, WIDTH, HEIGHT);
        let mut cache = AssetCache::default();
        let mut draw_list = Vec::new();
        compose_frame(&mut canvas, world, &mut cache, &mut draw_list);
        frame
    }

    #[test]
    fn lower_sprite_overdraws_higher_one() {
        let mut world = small_world();
        world.push_sprite(solid([0, 0, 255, 255], 4.0, RenderLayer::Object));
        world.push_sprite(solid([255, 0, 0, 255], 0.0, RenderLayer::Object));
        let frame = compose(&world);
        assert_eq!(pixel(&frame, 1, 5), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 1, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn ground_sprites_stay_under_objects() {
        let mut world = small_world();
        world.push_sprite(solid([0, 255, 0, 255], 0.0, RenderLayer::Object));
        world.push_sprite(solid([90, 90, 90, 255], 4.0, RenderLayer::Ground));
        let frame = compose(&world);
        assert_eq!(pixel(&frame, 1, 5), [0, 255, 0, 255]);
    }

    #[test]
    fn missing_sheet_draws_placeholder_box() {
        let mut world = small_world();
        world.push_sprite(SpriteInstance {
            visual: SpriteVisual::SheetFrame {
                sheet_key: "nobody".to_string(),
                facing: Facing::Down,
                frame: 0,
            },
            position: Vec2::new(2.0, 2.0),
            size: Vec2::new(4.0, 4.0),
            layer: RenderLayer::Object,
            sort_bias: 0.0,
        });
        let frame = compose(&world);
        assert_eq!(pixel(&frame, 3, 3), PLACEHOLDER_COLOR);
        assert_eq!(pixel(&frame, 7, 7), [0, 0, 0, 255]);
    }

    #[test]
    fn camera_offset_moves_sprites_and_debug_rects() {
        let mut world = small_world();
        world.camera_mut().snap_to(Vec2::new(20.0, 12.0));
        world.push_sprite(solid([255, 255, 255, 255], 10.0, RenderLayer::Object));
        let frame = compose(&world);
        // Offset is (-4, 0): the sprite at x 0..8 lands at -4..4.
        assert_eq!(pixel(&frame, 3, 12), [255, 255, 255, 255]);
        assert_eq!(pixel(&frame, 4, 12), [0, 0, 0, 255]);
    }

    #[test]
    fn full_fade_hides_everything() {
        let mut world = small_world();
        world.push_sprite(solid([255, 255, 255, 255], 0.0, RenderLayer::Object));
        world.set_fade_alpha(255);
        let frame = compose(&world);
        assert_eq!(pixel(&frame, 1, 1), [0, 0, 0, 255]);
    }
}

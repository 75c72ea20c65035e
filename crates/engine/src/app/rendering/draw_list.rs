use std::path::Path;
use std::sync::Arc;

use crate::app::{Facing, IVec2, Rect, Vec2};
use crate::assets::SourceRegion;

use super::camera::{world_to_screen, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderLayer {
    Ground,
    Object,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpriteVisual {
    SheetFrame {
        sheet_key: String,
        facing: Facing,
        frame: u32,
    },
    ImageRegion {
        image: Arc<Path>,
        source: SourceRegion,
    },
    Solid {
        color: [u8; 4],
    },
}

/// One world-space sprite submitted for a frame. `position` is the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteInstance {
    pub visual: SpriteVisual,
    pub position: Vec2,
    pub size: Vec2,
    pub layer: RenderLayer,
    pub sort_bias: f32,
}

impl SpriteInstance {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }

    /// Vertical center plus bias; larger keys draw later.
    pub fn sort_key(&self) -> f32 {
        self.position.y + self.size.y * 0.5 + self.sort_bias
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    pub sprite_index: usize,
    pub screen_position: IVec2,
}

/// Orders sprites for drawing: every ground sprite before any object sprite,
/// each pass sorted by `sort_key` ascending with submission order breaking ties.
/// Sprites entirely outside the viewport are culled.
pub fn build_draw_list(
    sprites: &[SpriteInstance],
    camera_offset: IVec2,
    viewport: Viewport,
    out: &mut Vec<DrawCommand>,
) {
    out.clear();
    for (sprite_index, sprite) in sprites.iter().enumerate() {
        let screen_position = world_to_screen(sprite.position, camera_offset);
        if !overlaps_viewport(screen_position, sprite.size, viewport) {
            continue;
        }
        out.push(DrawCommand {
            sprite_index,
            screen_position,
        });
    }
    out.sort_by(|a, b| {
        let sprite_a = &sprites[a.sprite_index];
        let sprite_b = &sprites[b.sprite_index];
        sprite_a
            .layer
            .cmp(&sprite_b.layer)
            .then_with(|| sprite_a.sort_key().total_cmp(&sprite_b.sort_key()))
    });
}

fn overlaps_viewport(screen_position: IVec2, size: Vec2, viewport: Viewport) -> bool {
    let width = size.x.ceil() as i32;
    let height = size.y.ceil() as i32;
    screen_position.x < viewport.width as i32
        && screen_position.y < viewport.height as i32
        && screen_position.x + width > 0
        && screen_position.y + height > 0
}

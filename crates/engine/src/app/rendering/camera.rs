use crate::app::{IVec2, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Integer half extents; odd sizes round down.
    pub fn half_size(self) -> IVec2 {
        IVec2 {
            x: (self.width / 2) as i32,
            y: (self.height / 2) as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSmoothing {
    pub enabled: bool,
    /// Fraction of the remaining distance covered per tick, in (0, 1].
    pub factor: f32,
}

impl Default for CameraSmoothing {
    fn default() -> Self {
        Self {
            enabled: false,
            factor: 0.15,
        }
    }
}

impl CameraSmoothing {
    fn effective_factor(self) -> f32 {
        if self.factor > 0.0 {
            self.factor.min(1.0)
        } else {
            1.0
        }
    }
}

/// Offset that centers `target` in the viewport, rounded once.
pub fn camera_offset_for_target(target: Vec2, viewport: Viewport) -> IVec2 {
    let half = viewport.half_size();
    IVec2 {
        x: (-(target.x - half.x as f32)).round() as i32,
        y: (-(target.y - half.y as f32)).round() as i32,
    }
}

/// Screen position of a world point under an integer camera offset.
pub fn world_to_screen(world: Vec2, offset: IVec2) -> IVec2 {
    (world + offset.as_vec2()).round()
}

/// Integer camera offset applied uniformly to everything drawn in the world.
///
/// Smoothing moves in whole pixels toward the rounded goal, so the offset never
/// holds a fractional value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    viewport: Viewport,
    smoothing: CameraSmoothing,
    offset: IVec2,
}

impl CameraRig {
    pub fn new(viewport: Viewport, smoothing: CameraSmoothing) -> Self {
        Self {
            viewport,
            smoothing,
            offset: IVec2::ZERO,
        }
    }

    pub fn offset(&self) -> IVec2 {
        self.offset
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn smoothing(&self) -> CameraSmoothing {
        self.smoothing
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_smoothing(&mut self, smoothing: CameraSmoothing) {
        self.smoothing = smoothing;
    }

    pub fn follow(&mut self, target: Vec2) {
        let goal = camera_offset_for_target(target, self.viewport);
        if !self.smoothing.enabled {
            self.offset = goal;
            return;
        }
        let factor = self.smoothing.effective_factor();
        self.offset = IVec2 {
            x: smooth_axis(self.offset.x, goal.x, factor),
            y: smooth_axis(self.offset.y, goal.y, factor),
        };
    }

    /// Jumps straight to the goal, for teleports and map changes.
    pub fn snap_to(&mut self, target: Vec2) {
        self.offset = camera_offset_for_target(target, self.viewport);
    }
}

fn smooth_axis(current: i32, goal: i32, factor: f32) -> i32 {
    let delta = goal - current;
    if delta == 0 {
        return current;
    }
    let step = (delta as f32 * factor).round() as i32;
    // At least one pixel per tick so the camera always settles.
    let step = if step == 0 { delta.signum() } else { step };
    current + step
}

use std::collections::VecDeque;

use deswonder_engine::{Facing, InputAction, InputSnapshot, Rect, Vec2};

use super::trajectory::Snapshot;

pub(crate) const PLAYER_HITBOX_SIZE: f32 = 15.0;
pub(crate) const DEFAULT_PLAYER_SPEED: f32 = 60.0;
pub(crate) const DEFAULT_ANIMATION_SPEED: f32 = 3.0;
pub(crate) const INPUT_HISTORY_CAPACITY: usize = 300;
const MOVING_THRESHOLD: f32 = 0.1;
const INTERACTION_REACH: f32 = 8.0;
const REACH_LENGTH: f32 = 10.0;
const REACH_THICKNESS: f32 = 2.0;

/// Authoritative hitbox. The drawn sprite and the feet point are derived
/// from it, never stored separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Body {
    hitbox: Rect,
}

impl Body {
    pub(crate) fn new(top_left: Vec2, size: Vec2) -> Self {
        Self {
            hitbox: Rect::new(top_left.x, top_left.y, size.x, size.y),
        }
    }

    pub(crate) fn hitbox(&self) -> Rect {
        self.hitbox
    }

    pub(crate) fn feet(&self) -> Vec2 {
        self.hitbox.mid_bottom()
    }

    #[cfg(test)]
    pub(crate) fn center(&self) -> Vec2 {
        self.hitbox.center()
    }

    pub(crate) fn set_top_left(&mut self, top_left: Vec2) {
        self.hitbox.x = top_left.x;
        self.hitbox.y = top_left.y;
    }

    /// Moves along X, resolves, then along Y, resolves. Returns the applied
    /// displacement.
    pub(crate) fn move_and_collide(
        &mut self,
        displacement: Vec2,
        obstacles: &[Rect],
        ignore_collisions: bool,
    ) -> Vec2 {
        let start = self.hitbox.top_left();
        self.hitbox.x += displacement.x;
        if !ignore_collisions {
            resolve_x(&mut self.hitbox, displacement.x, obstacles);
        }
        self.hitbox.y += displacement.y;
        if !ignore_collisions {
            resolve_y(&mut self.hitbox, displacement.y, obstacles);
        }
        self.hitbox.top_left() - start
    }
}

fn resolve_x(hitbox: &mut Rect, dx: f32, obstacles: &[Rect]) {
    for obstacle in obstacles {
        if !hitbox.intersects(obstacle) {
            continue;
        }
        if dx > 0.0 {
            hitbox.x = obstacle.left() - hitbox.width;
        } else if dx < 0.0 {
            hitbox.x = obstacle.right();
        }
    }
}

fn resolve_y(hitbox: &mut Rect, dy: f32, obstacles: &[Rect]) {
    for obstacle in obstacles {
        if !hitbox.intersects(obstacle) {
            continue;
        }
        if dy > 0.0 {
            hitbox.y = obstacle.top() - hitbox.height;
        } else if dy < 0.0 {
            hitbox.y = obstacle.bottom();
        }
    }
}

/// Interaction rect half a tile in front of the hitbox center.
pub(crate) fn interaction_rect(hitbox: Rect, facing: Facing) -> Rect {
    let center = hitbox.center() + facing.unit() * INTERACTION_REACH;
    match facing {
        Facing::Up | Facing::Down => Rect::from_center(center, REACH_THICKNESS, REACH_LENGTH),
        Facing::Left | Facing::Right => Rect::from_center(center, REACH_LENGTH, REACH_THICKNESS),
    }
}

/// Leader movement, facing and walk animation.
#[derive(Debug, Clone)]
pub(crate) struct PlayerController {
    body: Body,
    facing: Facing,
    frame: f32,
    direction: Vec2,
    is_moving: bool,
    speed: f32,
    animation_speed: f32,
}

impl PlayerController {
    pub(crate) fn new(top_left: Vec2, speed: f32, animation_speed: f32) -> Self {
        Self {
            body: Body::new(top_left, Vec2::new(PLAYER_HITBOX_SIZE, PLAYER_HITBOX_SIZE)),
            facing: Facing::Down,
            frame: 0.0,
            direction: Vec2::ZERO,
            is_moving: false,
            speed,
            animation_speed,
        }
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn frame(&self) -> f32 {
        self.frame
    }

    #[cfg(test)]
    pub(crate) fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub(crate) fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }

    /// Places the hitbox top-left at `top_left` and stops.
    pub(crate) fn place_at(&mut self, top_left: Vec2) {
        self.body.set_top_left(top_left);
        self.frame = 0.0;
        self.direction = Vec2::ZERO;
        self.is_moving = false;
    }

    /// Clears motion without moving, for ticks where input is gated.
    pub(crate) fn halt(&mut self) {
        self.direction = Vec2::ZERO;
        self.is_moving = false;
        self.frame = 0.0;
    }

    pub(crate) fn update(
        &mut self,
        axes: Vec2,
        dt_seconds: f32,
        obstacles: &[Rect],
        noclip: bool,
        frame_count: u32,
    ) {
        self.direction = axes.normalized_or_zero();
        if let Some(facing) = Facing::from_direction(self.direction) {
            self.facing = facing;
        }

        let moved =
            self.body
                .move_and_collide(self.direction * (self.speed * dt_seconds), obstacles, noclip);
        self.is_moving = moved.length() > MOVING_THRESHOLD;

        if self.is_moving {
            self.frame += self.animation_speed * dt_seconds;
            if self.frame >= frame_count.max(1) as f32 {
                self.frame = 0.0;
            }
        } else {
            self.frame = 0.0;
        }
    }

    pub(crate) fn interaction_rect(&self) -> Rect {
        interaction_rect(self.body.hitbox(), self.facing)
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            position: self.body.feet(),
            facing: self.facing,
            frame: self.frame,
            direction: self.direction,
            is_moving: self.is_moving,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DirectionKeys {
    pub(crate) left: bool,
    pub(crate) right: bool,
    pub(crate) up: bool,
    pub(crate) down: bool,
}

impl DirectionKeys {
    pub(crate) fn from_input(input: &InputSnapshot) -> Self {
        Self {
            left: input.is_down(InputAction::MoveLeft),
            right: input.is_down(InputAction::MoveRight),
            up: input.is_down(InputAction::MoveUp),
            down: input.is_down(InputAction::MoveDown),
        }
    }

    /// Opposite keys cancel out.
    pub(crate) fn axes(self) -> Vec2 {
        let axis = |negative: bool, positive: bool| f32::from(positive) - f32::from(negative);
        Vec2::new(axis(self.left, self.right), axis(self.up, self.down))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputRecord {
    tick: u64,
    keys: DirectionKeys,
}

/// Bounded per-tick record of the directional keys.
#[derive(Debug, Clone)]
pub(crate) struct InputHistory {
    records: VecDeque<InputRecord>,
    capacity: usize,
}

impl Default for InputHistory {
    fn default() -> Self {
        Self {
            records: VecDeque::with_capacity(INPUT_HISTORY_CAPACITY),
            capacity: INPUT_HISTORY_CAPACITY,
        }
    }
}

impl InputHistory {
    pub(crate) fn record(&mut self, tick: u64, keys: DirectionKeys) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(InputRecord { tick, keys });
    }

    /// Keys of the latest record at or before `tick`; all released when none.
    pub(crate) fn input_at_tick(&self, tick: u64) -> DirectionKeys {
        self.records
            .iter()
            .rev()
            .find(|record| record.tick <= tick)
            .map(|record| record.keys)
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}

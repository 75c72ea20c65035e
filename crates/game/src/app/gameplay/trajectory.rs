use std::collections::VecDeque;

use deswonder_engine::{Facing, Vec2};
use tracing::trace;

pub(crate) const DEFAULT_HISTORY_CAPACITY: usize = 500;
pub(crate) const DEFAULT_FOLLOWER_DELAY_TICKS: usize = 20;
pub(crate) const DEFAULT_FOLLOWER_MAX_SPEED: f32 = 200.0;
const FOLLOW_GAIN_PER_SECOND: f32 = 2.0;

/// Leader kinematic state for one tick. `position` is the feet point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Snapshot {
    pub(crate) position: Vec2,
    pub(crate) facing: Facing,
    pub(crate) frame: f32,
    pub(crate) direction: Vec2,
    pub(crate) is_moving: bool,
}

impl Snapshot {
    fn settled(self) -> Self {
        Self {
            frame: 0.0,
            direction: Vec2::ZERO,
            is_moving: false,
            ..self
        }
    }
}

/// Bounded leader history. Followers all read the same delayed index.
#[derive(Debug, Clone)]
pub(crate) struct HistoryBuffer {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
    delay: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_FOLLOWER_DELAY_TICKS)
    }
}

impl HistoryBuffer {
    /// The delay is at least one tick and capacity at least `delay + 1`, so
    /// the delayed index always points at a recorded snapshot.
    pub(crate) fn new(capacity: usize, delay: usize) -> Self {
        let delay = delay.max(1);
        let capacity = capacity.max(delay + 1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
            delay,
        }
    }

    /// Appends moving snapshots, evicting the oldest past capacity. A stopped
    /// tick instead settles the snapshot at the delayed index so followers
    /// come to rest on an idle frame.
    pub(crate) fn record(&mut self, snapshot: Snapshot) {
        if snapshot.is_moving {
            if self.snapshots.len() == self.capacity {
                self.snapshots.pop_front();
            }
            self.snapshots.push_back(snapshot);
            return;
        }
        if let Some(index) = self.delayed_index() {
            let delayed = &mut self.snapshots[index];
            if delayed.is_moving {
                trace!(index, direction = ?delayed.direction, "history_snapshot_settled");
            }
            *delayed = delayed.settled();
        }
    }

    pub(crate) fn delayed_index(&self) -> Option<usize> {
        (self.snapshots.len() > self.delay).then(|| self.snapshots.len() - self.delay)
    }

    pub(crate) fn delayed_snapshot(&self) -> Option<&Snapshot> {
        self.delayed_index().map(|index| &self.snapshots[index])
    }

    #[cfg(test)]
    pub(crate) fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn clear(&mut self) {
        self.snapshots.clear();
    }
}

/// A party member replaying the leader's delayed history.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Follower {
    sprite_key: String,
    position: Vec2,
    facing: Facing,
    frame: u32,
}

impl Follower {
    pub(crate) fn new(sprite_key: impl Into<String>, position: Vec2) -> Self {
        Self {
            sprite_key: sprite_key.into(),
            position,
            facing: Facing::Down,
            frame: 0,
        }
    }

    pub(crate) fn sprite_key(&self) -> &str {
        &self.sprite_key
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn frame(&self) -> u32 {
        self.frame
    }

    /// Steps toward the delayed snapshot at `min(max_speed, distance * 2)`,
    /// landing exactly on it instead of overshooting, and mirrors its
    /// animation. Without a delayed snapshot nothing changes.
    pub(crate) fn update(
        &mut self,
        history: &HistoryBuffer,
        dt_seconds: f32,
        max_speed: f32,
        frame_count: u32,
    ) {
        let Some(snapshot) = history.delayed_snapshot() else {
            return;
        };

        let delta = snapshot.position - self.position;
        let distance = delta.length();
        if distance > 0.0 {
            let speed = max_speed.min(distance * FOLLOW_GAIN_PER_SECOND);
            let step = speed * dt_seconds;
            if step >= distance {
                self.position = snapshot.position;
            } else {
                self.position += delta.normalized_or_zero() * step;
            }
        }

        self.facing = snapshot.facing;
        self.frame = (snapshot.frame.max(0.0) as u32) % frame_count.max(1);
    }

    pub(crate) fn teleport_to(&mut self, position: Vec2) {
        self.position = position;
        self.facing = Facing::Down;
        self.frame = 0;
    }
}

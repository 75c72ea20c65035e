use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// World-space vector in pixels. Y grows downward, matching screen space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Unit vector in the same direction, or zero for a zero-length input.
    pub fn normalized_or_zero(self) -> Self {
        let length = self.length();
        if length <= f32::EPSILON {
            Self::ZERO
        } else {
            Self {
                x: self.x / length,
                y: self.y / length,
            }
        }
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    pub fn round(self) -> IVec2 {
        IVec2 {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
        }
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IVec2 {
    pub x: i32,
    pub y: i32,
}

impl IVec2 {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2 {
            x: self.x as f32,
            y: self.y as f32,
        }
    }
}

impl Add for IVec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

/// Axis-aligned box. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_mid_bottom(mid_bottom: Vec2, width: f32, height: f32) -> Self {
        Self {
            x: mid_bottom.x - width * 0.5,
            y: mid_bottom.y - height,
            width,
            height,
        }
    }

    pub fn from_center(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            x: center.x - width * 0.5,
            y: center.y - height * 0.5,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.width * 0.5,
            y: self.y + self.height * 0.5,
        }
    }

    pub fn mid_bottom(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.width * 0.5,
            y: self.bottom(),
        }
    }

    pub fn top_left(&self) -> Vec2 {
        Vec2 {
            x: self.x,
            y: self.y,
        }
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
            ..*self
        }
    }

    /// Strict overlap: rects that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::Down, Facing::Right, Facing::Left, Facing::Up];

    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Row of the walk cycle for this facing in a character sheet.
    pub const fn sheet_row(self) -> u32 {
        match self {
            Self::Down => 0,
            Self::Right => 1,
            Self::Left => 2,
            Self::Up => 3,
        }
    }

    /// Facing for a movement direction, horizontal axis first. `None` for zero.
    pub fn from_direction(direction: Vec2) -> Option<Self> {
        if direction.x > 0.0 {
            Some(Self::Right)
        } else if direction.x < 0.0 {
            Some(Self::Left)
        } else if direction.y > 0.0 {
            Some(Self::Down)
        } else if direction.y < 0.0 {
            Some(Self::Up)
        } else {
            None
        }
    }

    pub const fn unit(self) -> Vec2 {
        match self {
            Self::Up => Vec2 { x: 0.0, y: -1.0 },
            Self::Down => Vec2 { x: 0.0, y: 1.0 },
            Self::Left => Vec2 { x: -1.0, y: 0.0 },
            Self::Right => Vec2 { x: 1.0, y: 0.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_or_zero_handles_zero_and_diagonal() {
        assert_eq!(Vec2::ZERO.normalized_or_zero(), Vec2::ZERO);
        let diagonal = Vec2::new(1.0, 1.0).normalized_or_zero();
        assert!((diagonal.length() - 1.0).abs() < 0.0001);
        assert!((diagonal.x - diagonal.y).abs() < 0.0001);
    }

    #[test]
    fn round_uses_nearest_integer() {
        assert_eq!(Vec2::new(1.4, -2.6).round(), IVec2::new(1, -3));
        assert_eq!(Vec2::new(2.5, -0.4).round(), IVec2::new(3, 0));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new(9.5, 9.5, 1.0, 1.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(b.intersects(&c));
    }

    #[test]
    fn mid_bottom_round_trips_through_constructor() {
        let rect = Rect::from_mid_bottom(Vec2::new(20.0, 40.0), 15.0, 15.0);
        assert_eq!(rect.mid_bottom(), Vec2::new(20.0, 40.0));
        assert_eq!(rect.top(), 25.0);
        assert_eq!(rect.left(), 12.5);
    }

    #[test]
    fn facing_prefers_horizontal_axis() {
        assert_eq!(
            Facing::from_direction(Vec2::new(-0.7, 0.7)),
            Some(Facing::Left)
        );
        assert_eq!(Facing::from_direction(Vec2::new(0.0, -1.0)), Some(Facing::Up));
        assert_eq!(Facing::from_direction(Vec2::ZERO), None);
    }

    #[test]
    fn opposite_facing_and_rows() {
        for facing in Facing::ALL {
            assert_eq!(facing.opposite().opposite(), facing);
        }
        assert_eq!(Facing::Down.sheet_row(), 0);
        assert_eq!(Facing::Up.sheet_row(), 3);
    }
}

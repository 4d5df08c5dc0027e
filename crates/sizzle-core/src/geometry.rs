//! Planar positions and hit areas for the kitchen floor.
//!
//! Screen-to-world projection happens outside the core; everything here is
//! already in world units. The vertical axis (`y`) is also the stacking axis
//! for container contents.

use crate::fixed::Fixed64;
use serde::{Deserialize, Serialize};

/// A point in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
    };

    pub fn new(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }

    /// Build from floats. Use only at construction/config boundaries.
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self {
            x: Fixed64::from_num(x),
            y: Fixed64::from_num(y),
        }
    }

    /// Squared euclidean distance, saturating instead of overflowing.
    pub fn distance_squared(&self, other: &Position) -> Fixed64 {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// True if `other` lies within `radius` of this point (inclusive).
    pub fn within(&self, other: &Position, radius: Fixed64) -> bool {
        self.distance_squared(other) <= radius.saturating_mul(radius)
    }

    /// This point shifted up the stacking axis by `dy`.
    pub fn raised(&self, dy: Fixed64) -> Position {
        Position {
            x: self.x,
            y: self.y.saturating_add(dy),
        }
    }
}

/// An axis-aligned rectangle, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    /// Build from float corners `(x0, y0)`-`(x1, y1)`.
    pub fn from_f64(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min: Position::from_f64(x0, y0),
            max: Position::from_f64(x1, y1),
        }
    }

    pub fn contains(&self, p: &Position) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// A rectangle with no area cannot be hit.
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// Midpoint; used as the dock position for occupants.
    pub fn center(&self) -> Position {
        let two = Fixed64::from_num(2);
        Position {
            x: self.min.x + (self.max.x - self.min.x) / two,
            y: self.min.y + (self.max.y - self.min.y) / two,
        }
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_contains_is_inclusive() {
        let b = Bounds::from_f64(0.0, 0.0, 1.0, 1.0);
        assert!(b.contains(&Position::from_f64(0.0, 0.0)));
        assert!(b.contains(&Position::from_f64(1.0, 1.0)));
        assert!(b.contains(&Position::from_f64(0.5, 0.25)));
        assert!(!b.contains(&Position::from_f64(1.01, 0.5)));
    }

    #[test]
    fn bounds_center() {
        let b = Bounds::from_f64(2.0, 0.0, 3.0, 2.0);
        assert_eq!(b.center(), Position::from_f64(2.5, 1.0));
    }

    #[test]
    fn degenerate_bounds_are_empty() {
        assert!(Bounds::from_f64(1.0, 1.0, 1.0, 2.0).is_empty());
        assert!(!Bounds::from_f64(0.0, 0.0, 0.5, 0.5).is_empty());
    }

    #[test]
    fn within_radius() {
        let a = Position::from_f64(0.0, 0.0);
        assert!(a.within(&Position::from_f64(0.3, 0.4), Fixed64::from_num(0.5)));
        assert!(!a.within(&Position::from_f64(0.3, 0.5), Fixed64::from_num(0.5)));
    }

    #[test]
    fn far_points_do_not_overflow() {
        let a = Position::from_f64(-2.0e9, -2.0e9);
        let b = Position::from_f64(2.0e9, 2.0e9);
        assert!(!a.within(&b, Fixed64::from_num(1)));
    }

    #[test]
    fn overlap_detection() {
        let a = Bounds::from_f64(0.0, 0.0, 1.0, 1.0);
        let b = Bounds::from_f64(0.5, 0.5, 2.0, 2.0);
        let c = Bounds::from_f64(3.0, 3.0, 4.0, 4.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}

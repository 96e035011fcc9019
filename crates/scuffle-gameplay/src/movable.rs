//! Position, velocity and bounds shared by every simulated body.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;

/// A moving axis-aligned body.
///
/// The rectangle is centered on `position` with the full `size` as its
/// width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovableEntity {
    /// Center position in world space
    pub position: Vec2,
    /// Displacement applied per tick
    pub velocity: Vec2,
    /// Full width and height
    size: Vec2,
}

impl MovableEntity {
    /// Creates a body at rest.
    #[must_use]
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size: size.abs(),
        }
    }

    /// Returns the body's size.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Returns the body's current rectangle.
    #[must_use]
    pub fn rectangle(&self) -> Aabb {
        Aabb::from_center(self.position, self.size * 0.5)
    }

    /// Commits this tick's velocity to the position.
    ///
    /// Only the per-tick orchestration calls this, once per tick, after
    /// collision resolution has corrected the velocity.
    pub(crate) fn apply_velocity(&mut self) {
        self.position += self.velocity;
    }
}

//! Non-fighter entities: moving platforms and projectiles.

use glam::Vec2;
use scuffle_common::EntityId;

use crate::collision::{move_and_collide, ColliderSource, CollisionConfig, CollisionWorld};
use crate::combat::HitData;
use crate::geometry::Aabb;
use crate::movable::MovableEntity;

/// Countdown that flips a platform's velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patrol {
    /// Ticks between reversals
    pub period: u32,
    /// Ticks until the next reversal
    pub remaining: u32,
}

/// A projectile's hit payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    /// Fighter credited with the hit
    pub owner: EntityId,
    /// Owner's team
    pub team: u8,
    /// Hit applied on contact
    pub hit: HitData,
    /// Ticks left before it fizzles
    pub lifetime: u32,
}

impl Projectile {
    /// Launch direction derived from velocity (+1 right, -1 left).
    #[must_use]
    pub fn facing(velocity: Vec2) -> f32 {
        if velocity.x < 0.0 {
            -1.0
        } else {
            1.0
        }
    }
}

/// Object variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    /// Solid kinematic platform
    Platform(Option<Patrol>),
    /// Non-solid projectile
    Projectile(Projectile),
}

/// A world object.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    id: EntityId,
    body: MovableEntity,
    kind: ObjectKind,
    alive: bool,
}

impl WorldObject {
    /// Creates a platform covering `bounds`, moving at `velocity`.
    ///
    /// With `patrol_ticks` the velocity reverses every that many ticks.
    #[must_use]
    pub fn platform(id: EntityId, bounds: Aabb, velocity: Vec2, patrol_ticks: Option<u32>) -> Self {
        let mut body = MovableEntity::new(bounds.center(), bounds.size());
        body.velocity = velocity;
        let patrol = patrol_ticks.filter(|ticks| *ticks > 0).map(|period| Patrol {
            period,
            remaining: period,
        });
        Self {
            id,
            body,
            kind: ObjectKind::Platform(patrol),
            alive: true,
        }
    }

    /// Creates a projectile.
    #[must_use]
    pub fn projectile(id: EntityId, position: Vec2, size: Vec2, velocity: Vec2, projectile: Projectile) -> Self {
        let mut body = MovableEntity::new(position, size);
        body.velocity = velocity;
        Self {
            id,
            body,
            kind: ObjectKind::Projectile(projectile),
            alive: projectile.lifetime > 0,
        }
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Physical body.
    #[must_use]
    pub fn body(&self) -> &MovableEntity {
        &self.body
    }

    /// Current rectangle.
    #[must_use]
    pub fn rectangle(&self) -> Aabb {
        self.body.rectangle()
    }

    /// Variant data.
    #[must_use]
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Whether fighters collide with this object.
    #[must_use]
    pub fn is_solid(&self) -> bool {
        matches!(self.kind, ObjectKind::Platform(_))
    }

    /// Whether the object survives this tick.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Marks the object for removal at the end of the tick.
    pub fn expire(&mut self) {
        self.alive = false;
    }

    /// Moves the object one tick.
    ///
    /// Platforms move kinematically and ignore geometry. Projectiles
    /// resolve against the world and expire on contact or when their
    /// lifetime runs out.
    pub(crate) fn update(&mut self, world: &CollisionWorld, config: &CollisionConfig) {
        match &mut self.kind {
            ObjectKind::Platform(patrol) => {
                self.body.apply_velocity();
                if let Some(patrol) = patrol {
                    patrol.remaining -= 1;
                    if patrol.remaining == 0 {
                        patrol.remaining = patrol.period;
                        self.body.velocity = -self.body.velocity;
                    }
                }
            },
            ObjectKind::Projectile(projectile) => {
                projectile.lifetime = projectile.lifetime.saturating_sub(1);
                let flags = move_and_collide(
                    &mut self.body,
                    world,
                    config,
                    Some(ColliderSource::Object(self.id)),
                );
                if projectile.lifetime == 0 || !flags.is_empty() {
                    self.alive = false;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u16) -> EntityId {
        EntityId::from_raw(raw)
    }

    fn projectile(lifetime: u32) -> Projectile {
        Projectile {
            owner: id(1),
            team: 0,
            hit: HitData::new(3.0, 1.0),
            lifetime,
        }
    }

    #[test]
    fn test_platform_patrols() {
        let bounds = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(20.0, 4.0));
        let mut platform = WorldObject::platform(id(5), bounds, Vec2::new(1.0, 0.0), Some(3));
        let world = CollisionWorld::new();
        let config = CollisionConfig::default();

        for _ in 0..3 {
            platform.update(&world, &config);
        }
        assert_eq!(platform.rectangle().min.x, 3.0);
        assert_eq!(platform.body().velocity, Vec2::new(-1.0, 0.0));

        for _ in 0..3 {
            platform.update(&world, &config);
        }
        assert_eq!(platform.rectangle().min.x, 0.0);
        assert!(platform.is_solid());
    }

    #[test]
    fn test_projectile_expires_on_lifetime() {
        let mut shot = WorldObject::projectile(id(6), Vec2::ZERO, Vec2::splat(2.0), Vec2::new(2.0, 0.0), projectile(2));
        let world = CollisionWorld::new();
        let config = CollisionConfig::default();

        shot.update(&world, &config);
        assert!(shot.is_alive());
        shot.update(&world, &config);
        assert!(!shot.is_alive());
        assert!(!shot.is_solid());
    }

    #[test]
    fn test_projectile_expires_on_wall() {
        let wall = Aabb::new(Vec2::new(5.0, -10.0), Vec2::new(10.0, 10.0));
        let world = CollisionWorld::from_stage(&[wall]);
        let mut shot = WorldObject::projectile(id(6), Vec2::ZERO, Vec2::splat(2.0), Vec2::new(8.0, 0.0), projectile(30));

        shot.update(&world, &CollisionConfig::default());

        assert!(!shot.is_alive());
        assert!(shot.rectangle().max.x <= 5.0 + 1e-4);
    }

    #[test]
    fn test_zero_lifetime_projectile_is_dead() {
        let shot = WorldObject::projectile(id(6), Vec2::ZERO, Vec2::ONE, Vec2::X, projectile(0));
        assert!(!shot.is_alive());
    }
}

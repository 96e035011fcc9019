//! Simulation configuration.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audio::DEFAULT_DELAYED_SLOTS;
use crate::collision::CollisionConfig;
use crate::geometry::Aabb;

/// Match rules and pool sizes for one world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Gap under which a body still counts as touching a surface
    pub skin_width: f32,
    /// Ticks an airborne, out-of-hitstun defender keeps its combo
    pub combo_timeout_ticks: u32,
    /// Live hitbox slots
    pub hitbox_capacity: usize,
    /// Delayed sound slots
    pub delayed_sound_capacity: usize,
    /// Event bus capacity
    pub event_capacity: usize,
    /// Fighters whose center leaves this box are knocked out
    pub blast_zone: Aabb,
    /// Static stage geometry
    pub stage: Vec<Aabb>,
    /// Spawn positions, indexed by player slot
    pub spawn_points: Vec<Vec2>,
    /// Whether hitboxes hit teammates
    pub friendly_fire: bool,
    /// Stocks each fighter starts with
    pub default_stocks: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            skin_width: CollisionConfig::default().skin_width,
            combo_timeout_ticks: 60,
            hitbox_capacity: 64,
            delayed_sound_capacity: DEFAULT_DELAYED_SLOTS,
            event_capacity: 1024,
            blast_zone: Aabb::new(Vec2::new(-400.0, -400.0), Vec2::new(400.0, 300.0)),
            stage: vec![Aabb::new(Vec2::new(-150.0, 0.0), Vec2::new(150.0, 40.0))],
            spawn_points: vec![
                Vec2::new(-60.0, -40.0),
                Vec2::new(60.0, -40.0),
                Vec2::new(-20.0, -40.0),
                Vec2::new(20.0, -40.0),
            ],
            friendly_fire: false,
            default_stocks: 3,
        }
    }
}

impl SimConfig {
    /// Collision settings derived from this config.
    #[must_use]
    pub fn collision(&self) -> CollisionConfig {
        CollisionConfig {
            skin_width: self.skin_width,
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.skin_width = self.skin_width.clamp(0.0, 1.0);
        self.combo_timeout_ticks = self.combo_timeout_ticks.clamp(1, 600);

        // Pools
        self.hitbox_capacity = self.hitbox_capacity.clamp(1, 1024);
        self.delayed_sound_capacity = self.delayed_sound_capacity.clamp(1, 256);
        self.event_capacity = self.event_capacity.clamp(1, 65_536);

        // Rules
        self.default_stocks = self.default_stocks.clamp(1, 99);
        let zone = self.blast_zone;
        self.blast_zone = Aabb::new(zone.min.min(zone.max), zone.min.max(zone.max));

        if self.spawn_points.is_empty() {
            warn!("No spawn points configured, fighters cannot be spawned");
        }
    }
}

//! Hit resolution: damage, hitstun and knockback with combo scaling.
//!
//! This module provides:
//! - The growing-value curve shared by hitstun and launch potency
//! - Immutable hit descriptors ([`HitData`])
//! - Per-defender combo bookkeeping ([`ComboTracker`])
//! - The damage accumulator that applies hits ([`HealthHandler`])

use glam::Vec2;
use scuffle_common::EntityId;
use serde::{Deserialize, Serialize};

/// `min(max, base + growth * accumulated)`.
///
/// Non-decreasing in `accumulated` for non-negative `growth`, never above `max`.
#[must_use]
pub fn calculate_growing_value(base: f32, growth: f32, max: f32, accumulated: f32) -> f32 {
    (base + growth * accumulated).min(max)
}

/// How a hit sends the defender flying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LaunchType {
    /// Small flinch, defender stays in control shortly after
    #[default]
    Flinch,
    /// Full launch
    Launch,
    /// Downward spike
    Spike,
}

/// Immutable descriptor of one hit, produced by the attacker's hitbox.
///
/// Angles are in degrees: 0 sends the defender straight away from the
/// attacker, 90 sends it straight up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitData {
    /// Base damage before combo scaling
    pub damage: f32,
    /// Combo decay multiplier applied after this hit (1.0 = no decay)
    pub rate: f32,
    /// Base hitstun in ticks
    pub hitstun: f32,
    /// Hitstun added per point of accumulated damage
    pub hitstun_growth: f32,
    /// Hitstun cap
    pub max_hitstun: f32,
    /// Base launch speed
    pub launch_potency: f32,
    /// Launch speed added per point of combo damage
    pub launch_growth: f32,
    /// Launch speed cap
    pub max_launch_potency: f32,
    /// Launch angle for an unshielded hit
    pub launch_angle: f32,
    /// Stun applied to a shielding defender, in ticks
    pub shield_stun: u32,
    /// Push-back speed against a shield
    pub shield_potency: f32,
    /// Push-back angle against a shield
    pub shield_angle: f32,
    /// Launch type recorded on the combo
    pub launch_type: LaunchType,
}

impl Default for HitData {
    fn default() -> Self {
        Self {
            damage: 0.0,
            rate: 1.0,
            hitstun: 0.0,
            hitstun_growth: 0.0,
            max_hitstun: 0.0,
            launch_potency: 0.0,
            launch_growth: 0.0,
            max_launch_potency: 0.0,
            launch_angle: 0.0,
            shield_stun: 0,
            shield_potency: 0.0,
            shield_angle: 0.0,
            launch_type: LaunchType::Flinch,
        }
    }
}

impl HitData {
    /// Creates a hit with base damage and combo decay rate.
    #[must_use]
    pub fn new(damage: f32, rate: f32) -> Self {
        Self {
            damage,
            rate,
            ..Self::default()
        }
    }

    /// Sets the hitstun curve.
    #[must_use]
    pub fn with_hitstun(mut self, base: f32, growth: f32, max: f32) -> Self {
        self.hitstun = base;
        self.hitstun_growth = growth;
        self.max_hitstun = max;
        self
    }

    /// Sets the launch curve and angle.
    #[must_use]
    pub fn with_launch(mut self, potency: f32, growth: f32, max: f32, angle: f32) -> Self {
        self.launch_potency = potency;
        self.launch_growth = growth;
        self.max_launch_potency = max;
        self.launch_angle = angle;
        self
    }

    /// Sets the shield response.
    #[must_use]
    pub fn with_shield(mut self, stun: u32, potency: f32, angle: f32) -> Self {
        self.shield_stun = stun;
        self.shield_potency = potency;
        self.shield_angle = angle;
        self
    }

    /// Sets the launch type.
    #[must_use]
    pub fn with_launch_type(mut self, launch_type: LaunchType) -> Self {
        self.launch_type = launch_type;
        self
    }
}

/// Velocity for a launch at `angle` degrees, mirrored by `facing` (+1 or -1).
#[must_use]
pub fn launch_velocity(potency: f32, angle: f32, facing: f32) -> Vec2 {
    let (sin, cos) = angle.to_radians().sin_cos();
    Vec2::new(cos * facing.signum(), -sin) * potency
}

/// Damage bookkeeping for one uninterrupted combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboTracker {
    /// Hits landed in this combo
    pub hit_count: u16,
    /// Scaled damage dealt in this combo
    pub total_damage: f32,
    /// Product of every hit's decay rate so far
    pub total_rate: f32,
    /// Launch type of the latest hit
    pub launch_type: LaunchType,
    attacker_ids: Vec<u16>,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self {
            hit_count: 0,
            total_damage: 0.0,
            total_rate: 1.0,
            launch_type: LaunchType::default(),
            attacker_ids: Vec::new(),
        }
    }
}

impl ComboTracker {
    /// Creates an empty combo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hit and returns the damage it actually deals.
    ///
    /// The hit is scaled by the rate accumulated so far; its own `rate`
    /// only affects later hits.
    pub fn register_and_calculate_damage(
        &mut self,
        damage: f32,
        rate: f32,
        launch_type: LaunchType,
    ) -> f32 {
        let effective = damage * self.total_rate;
        self.total_damage += effective;
        self.total_rate *= rate;
        self.launch_type = launch_type;
        self.hit_count = self.hit_count.saturating_add(1);
        effective
    }

    /// Records an attacker, keeping first-hit order.
    pub fn add_attacker(&mut self, attacker: EntityId) {
        let raw = attacker.raw();
        if !self.attacker_ids.contains(&raw) {
            self.attacker_ids.push(raw);
        }
    }

    /// Attackers that contributed to this combo, in first-hit order.
    #[must_use]
    pub fn attacker_ids(&self) -> &[u16] {
        &self.attacker_ids
    }

    /// Whether the combo has any hits.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.hit_count > 0
    }

    /// Ends the combo.
    pub fn reset(&mut self) {
        self.hit_count = 0;
        self.total_damage = 0.0;
        self.total_rate = 1.0;
        self.launch_type = LaunchType::default();
        self.attacker_ids.clear();
    }
}

/// What a hit did to the defender. Applied by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    /// New velocity for the defender
    pub velocity: Vec2,
    /// Ticks the defender cannot act
    pub hitstun: u32,
    /// Damage actually added
    pub damage: f32,
    /// Whether the hit landed on a shield
    pub shielded: bool,
}

/// Accumulated damage and combo state of one fighter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthHandler {
    damage: f32,
    is_hit: bool,
    combo: ComboTracker,
}

impl HealthHandler {
    /// Creates a handler with no damage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated damage. Only [`HealthHandler::hit`] adds to it.
    #[must_use]
    pub fn damage(&self) -> f32 {
        self.damage
    }

    #[cfg(test)]
    pub(crate) fn with_damage(damage: f32) -> Self {
        Self {
            damage,
            ..Self::default()
        }
    }

    /// Applies a hit.
    ///
    /// A shielded hit only produces push-back and shield stun: damage and
    /// the combo tracker stay untouched. Otherwise hitstun grows with the
    /// damage accumulated before this hit, and launch potency grows with
    /// the combo's damage including it.
    pub fn hit(
        &mut self,
        hit: &HitData,
        attacker: EntityId,
        facing: f32,
        shielding: bool,
    ) -> HitOutcome {
        self.is_hit = true;

        if shielding {
            return HitOutcome {
                velocity: launch_velocity(hit.shield_potency, hit.shield_angle, facing),
                hitstun: hit.shield_stun,
                damage: 0.0,
                shielded: true,
            };
        }

        let hitstun =
            calculate_growing_value(hit.hitstun, hit.hitstun_growth, hit.max_hitstun, self.damage);

        let dealt = self
            .combo
            .register_and_calculate_damage(hit.damage, hit.rate, hit.launch_type);
        self.combo.add_attacker(attacker);
        self.damage += dealt;

        let potency = calculate_growing_value(
            hit.launch_potency,
            hit.launch_growth,
            hit.max_launch_potency,
            self.combo.total_damage,
        );

        HitOutcome {
            velocity: launch_velocity(potency, hit.launch_angle, facing),
            hitstun: hitstun.max(0.0).round() as u32,
            damage: dealt,
            shielded: false,
        }
    }

    /// Whether a hit was applied this tick.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.is_hit
    }

    /// Clears the per-tick hit flag.
    pub fn begin_tick(&mut self) {
        self.is_hit = false;
    }

    /// Current combo.
    #[must_use]
    pub fn combo(&self) -> &ComboTracker {
        &self.combo
    }

    /// Ends the current combo without touching accumulated damage.
    pub fn end_combo(&mut self) {
        self.combo.reset();
    }

    /// Clears everything (respawn).
    pub fn reset(&mut self) {
        self.damage = 0.0;
        self.is_hit = false;
        self.combo.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn attacker() -> EntityId {
        EntityId::from_raw(1)
    }

    #[test]
    fn test_combo_scaling_sequence() {
        let mut combo = ComboTracker::new();

        let first = combo.register_and_calculate_damage(10.0, 0.9, LaunchType::Flinch);
        assert_eq!(first, 10.0);
        assert_eq!(combo.total_damage, 10.0);
        assert!((combo.total_rate - 0.9).abs() < 1e-6);

        let second = combo.register_and_calculate_damage(10.0, 0.9, LaunchType::Launch);
        assert!((second - 9.0).abs() < 1e-5);
        assert!((combo.total_damage - 19.0).abs() < 1e-5);
        assert!((combo.total_rate - 0.81).abs() < 1e-6);
        assert_eq!(combo.launch_type, LaunchType::Launch);
        assert_eq!(combo.hit_count, 2);

        combo.reset();
        assert_eq!(combo.total_rate, 1.0);
        assert_eq!(combo.total_damage, 0.0);
        assert!(!combo.is_active());
    }

    #[test]
    fn test_attackers_are_recorded_once_in_order() {
        let mut combo = ComboTracker::new();
        combo.add_attacker(EntityId::from_raw(4));
        combo.add_attacker(EntityId::from_raw(2));
        combo.add_attacker(EntityId::from_raw(4));
        assert_eq!(combo.attacker_ids(), &[4, 2]);
    }

    #[test]
    fn test_growing_value_caps() {
        assert_eq!(calculate_growing_value(5.0, 0.5, 20.0, 0.0), 5.0);
        assert_eq!(calculate_growing_value(5.0, 0.5, 20.0, 10.0), 10.0);
        assert_eq!(calculate_growing_value(5.0, 0.5, 20.0, 100.0), 20.0);
    }

    #[test]
    fn test_hitstun_uses_pre_hit_damage() {
        let mut health = HealthHandler::with_damage(20.0);
        let hit = HitData::new(10.0, 1.0).with_hitstun(10.0, 1.0, 100.0);

        let outcome = health.hit(&hit, attacker(), 1.0, false);

        // 10 + 1 * 20, not 10 + 1 * 30.
        assert_eq!(outcome.hitstun, 30);
        assert_eq!(health.damage(), 30.0);
        assert!(health.is_hit());
    }

    #[test]
    fn test_launch_uses_launch_angle_and_facing() {
        let mut health = HealthHandler::new();
        let hit = HitData::new(0.0, 1.0)
            .with_launch(5.0, 0.0, 5.0, 90.0)
            .with_shield(3, 1.0, 0.0);

        let outcome = health.hit(&hit, attacker(), -1.0, false);
        assert!(outcome.velocity.x.abs() < 1e-5);
        assert!((outcome.velocity.y + 5.0).abs() < 1e-5);

        let hit = HitData::new(0.0, 1.0).with_launch(2.0, 0.0, 2.0, 0.0);
        let outcome = health.hit(&hit, attacker(), -1.0, false);
        assert!((outcome.velocity.x + 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_launch_potency_grows_with_combo_damage() {
        let mut health = HealthHandler::new();
        let hit = HitData::new(10.0, 1.0).with_launch(1.0, 0.1, 100.0, 0.0);

        let outcome = health.hit(&hit, attacker(), 1.0, false);

        assert!((outcome.velocity.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_shield_leaves_combo_untouched() {
        let mut health = HealthHandler::new();
        health.hit(&HitData::new(10.0, 0.9), attacker(), 1.0, false);
        let before = health.combo().clone();
        let damage_before = health.damage();

        let hit = HitData::new(50.0, 0.5).with_shield(7, 2.0, 0.0);
        let outcome = health.hit(&hit, attacker(), 1.0, true);

        assert!(outcome.shielded);
        assert_eq!(outcome.hitstun, 7);
        assert_eq!(outcome.damage, 0.0);
        assert!((outcome.velocity.x - 2.0).abs() < 1e-5);
        assert_eq!(health.combo(), &before);
        assert_eq!(health.damage(), damage_before);
    }

    #[test]
    fn test_begin_tick_clears_hit_flag() {
        let mut health = HealthHandler::new();
        health.hit(&HitData::new(1.0, 1.0), attacker(), 1.0, false);
        assert!(health.is_hit());
        health.begin_tick();
        assert!(!health.is_hit());
    }

    #[test]
    fn test_damage_survives_combo_end_until_reset() {
        let mut health = HealthHandler::new();
        health.hit(&HitData::new(8.0, 1.0), attacker(), 1.0, false);
        assert_eq!(health.damage(), 8.0);

        health.end_combo();
        assert_eq!(health.damage(), 8.0);
        assert!(!health.combo().is_active());

        health.reset();
        assert_eq!(health.damage(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_total_rate_non_increasing(rates in proptest::collection::vec(0.0f32..=1.0, 1..20)) {
            let mut combo = ComboTracker::new();
            let mut previous = combo.total_rate;
            for rate in rates {
                combo.register_and_calculate_damage(5.0, rate, LaunchType::Flinch);
                prop_assert!(combo.total_rate <= previous);
                previous = combo.total_rate;
            }
            combo.reset();
            prop_assert_eq!(combo.total_rate, 1.0);
        }

        #[test]
        fn prop_growing_value_monotone_and_capped(
            base in 0.0f32..50.0,
            growth in 0.0f32..5.0,
            max in 0.0f32..200.0,
            a in 0.0f32..300.0,
            b in 0.0f32..300.0,
        ) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let v_low = calculate_growing_value(base, growth, max, low);
            let v_high = calculate_growing_value(base, growth, max, high);
            prop_assert!(v_low <= v_high);
            prop_assert!(v_high <= max);
        }
    }
}

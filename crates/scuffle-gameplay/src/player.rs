//! Fighter state and its per-tick update steps.
//!
//! The world drives each fighter through the tick in a fixed order:
//! [`Player::begin_tick`], [`Player::act`], combat ([`Player::apply_hit`]),
//! [`Player::physics_step`] and [`Player::update_combo`].

use glam::Vec2;
use scuffle_common::{DefinitionId, EntityId, SimResult};
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionKind, ActionManager, HitboxWindow};
use crate::collision::{move_and_collide, CollisionConfig, CollisionWorld};
use crate::combat::{HealthHandler, HitData, HitOutcome};
use crate::definition::{AttackContext, FighterDefinition};
use crate::geometry::{Aabb, Direction, DirectionFlags};
use crate::input::{AttackDirection, Button, ButtonSet, Controller};
use crate::movable::MovableEntity;

/// Identity and placement for a fighter entering the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSpawn {
    /// Entity id
    pub id: EntityId,
    /// Controller port, also the spawn-point slot
    pub port: u8,
    /// Team; fighters on the same team do not hit each other unless friendly fire is on
    pub team: u8,
    /// Fighter definition
    pub definition: DefinitionId,
    /// Center position
    pub position: Vec2,
    /// Stocks to start with
    pub stocks: u8,
}

/// What the action step did this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionReport {
    /// Action that started this tick
    pub started: Option<ActionKind>,
    /// Hitbox window opening this tick
    pub opened: Option<HitboxWindow>,
    /// A jump fired
    pub jumped: bool,
    /// A dash fired
    pub dashed: bool,
}

/// A fighter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    id: EntityId,
    port: u8,
    team: u8,
    definition: DefinitionId,
    stocks: u8,
    body: MovableEntity,
    facing: f32,
    grounded: bool,
    gravity_enabled: bool,
    flags: DirectionFlags,
    controller: Controller,
    actions: ActionManager,
    health: HealthHandler,
    hitstun: u32,
    shielding: bool,
    stun_shielded: bool,
    combo_idle_ticks: u32,
}

fn approach(value: f32, target: f32, step: f32) -> f32 {
    if value < target {
        (value + step).min(target)
    } else {
        (value - step).max(target)
    }
}

impl Player {
    /// Creates a fighter at rest, facing right.
    #[must_use]
    pub fn new(spawn: &PlayerSpawn, definition: &FighterDefinition) -> Self {
        Self {
            id: spawn.id,
            port: spawn.port,
            team: spawn.team,
            definition: spawn.definition,
            stocks: spawn.stocks,
            body: MovableEntity::new(spawn.position, definition.size),
            facing: 1.0,
            grounded: false,
            gravity_enabled: true,
            flags: DirectionFlags::EMPTY,
            controller: Controller::new(),
            actions: ActionManager::new(definition.idle_frames),
            health: HealthHandler::new(),
            hitstun: 0,
            shielding: false,
            stun_shielded: false,
            combo_idle_ticks: 0,
        }
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Controller port.
    #[must_use]
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Team.
    #[must_use]
    pub fn team(&self) -> u8 {
        self.team
    }

    /// Fighter definition id.
    #[must_use]
    pub fn definition(&self) -> DefinitionId {
        self.definition
    }

    /// Stocks left.
    #[must_use]
    pub fn stocks(&self) -> u8 {
        self.stocks
    }

    /// Physical body.
    #[must_use]
    pub fn body(&self) -> &MovableEntity {
        &self.body
    }

    /// Center position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Velocity.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.body.velocity
    }

    /// Current rectangle.
    #[must_use]
    pub fn rectangle(&self) -> Aabb {
        self.body.rectangle()
    }

    /// Hurtbox, or `None` while intangible.
    #[must_use]
    pub fn hurtbox(&self) -> Option<Aabb> {
        (!self.actions.current().is_intangible()).then_some(self.body.rectangle())
    }

    /// +1 facing right, -1 facing left.
    #[must_use]
    pub fn facing(&self) -> f32 {
        self.facing
    }

    /// Standing on geometry after the last physics step.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Sides blocked during the last physics step.
    #[must_use]
    pub fn contact_flags(&self) -> DirectionFlags {
        self.flags
    }

    /// Control states.
    #[must_use]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Action state machine.
    #[must_use]
    pub fn actions(&self) -> &ActionManager {
        &self.actions
    }

    /// Damage and combo state.
    #[must_use]
    pub fn health(&self) -> &HealthHandler {
        &self.health
    }

    /// Remaining hitstun ticks.
    #[must_use]
    pub fn hitstun(&self) -> u32 {
        self.hitstun
    }

    /// Whether the shield is up.
    #[must_use]
    pub fn is_shielding(&self) -> bool {
        self.shielding
    }

    /// Enables or disables gravity for this fighter.
    pub fn set_gravity_enabled(&mut self, enabled: bool) {
        self.gravity_enabled = enabled;
    }

    /// Moves the fighter, keeping its velocity.
    pub fn set_position(&mut self, position: Vec2) {
        self.body.position = position;
    }

    /// Overrides the velocity.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.body.velocity = velocity;
    }

    /// Clears per-tick flags and samples this tick's input.
    pub fn begin_tick(&mut self, held: ButtonSet) {
        self.health.begin_tick();
        self.controller.update(held);
    }

    /// Advances the action state machine and applies control.
    ///
    /// Finished startups fire their impulse; a new action may start from
    /// this tick's input; the active action's hitbox window is reported
    /// on the frame it opens.
    pub fn act(&mut self, definition: &FighterDefinition) -> SimResult<ActionReport> {
        let mut report = ActionReport::default();

        match self.actions.update() {
            Some(ActionKind::JumpStartup) => {
                self.body.velocity.y = -definition.jump_velocity;
                self.grounded = false;
                report.jumped = true;
            },
            Some(ActionKind::DashStartup) => {
                self.body.velocity.x = definition.dash_speed * self.facing;
                report.dashed = true;
            },
            _ => {},
        }

        if self.hitstun > 0 {
            self.hitstun -= 1;
            self.shielding = self.stun_shielded;
            if self.grounded {
                self.body.velocity.x = approach(self.body.velocity.x, 0.0, definition.friction);
            }
            return Ok(report);
        }
        self.stun_shielded = false;

        let horizontal = self.controller.horizontal();
        self.shielding =
            self.grounded && self.controller.is_down(Button::Shield) && self.actions.can_start();
        if self.shielding {
            self.body.velocity.x = approach(self.body.velocity.x, 0.0, definition.friction);
            return Ok(report);
        }

        self.apply_control(definition, horizontal);

        if self.actions.can_start() {
            if let Some(action) = self.next_action(definition, horizontal)? {
                let kind = action.kind;
                if self.actions.try_start(action) {
                    report.started = Some(kind);
                }
            }
        }

        report.opened = self.actions.current().opening_window().copied();
        Ok(report)
    }

    fn apply_control(&mut self, definition: &FighterDefinition, horizontal: f32) {
        let velocity = &mut self.body.velocity;
        if self.grounded && (horizontal == 0.0 || !self.actions.is_idle()) {
            velocity.x = approach(velocity.x, 0.0, definition.friction);
            return;
        }
        if horizontal == 0.0 {
            return;
        }

        let (max_speed, acceleration) = if self.grounded {
            (definition.walk_speed, definition.ground_acceleration)
        } else {
            (definition.air_speed, definition.air_acceleration)
        };
        velocity.x = approach(velocity.x, horizontal * max_speed, acceleration);
        if self.grounded {
            self.facing = horizontal;
        }
    }

    fn next_action(
        &mut self,
        definition: &FighterDefinition,
        horizontal: f32,
    ) -> SimResult<Option<Action>> {
        if self.controller.just_pressed(Button::Attack) {
            let direction = self.controller.attack_direction();
            let action = definition.resolve_attack(&AttackContext {
                grounded: self.grounded,
                direction,
            })?;
            if action.is_some() && direction == AttackDirection::Side {
                self.facing = horizontal;
            }
            return Ok(action);
        }
        if self.grounded && self.controller.just_pressed(Button::Jump) {
            return definition.action(ActionKind::JumpStartup).map(Some);
        }
        if self.grounded && self.controller.just_pressed(Button::Dash) {
            return definition.action(ActionKind::DashStartup).map(Some);
        }
        Ok(None)
    }

    /// Applies a landed hit.
    ///
    /// An unshielded hit interrupts the current action.
    pub fn apply_hit(&mut self, hit: &HitData, attacker: EntityId, facing: f32) -> HitOutcome {
        let outcome = self.health.hit(hit, attacker, facing, self.shielding);
        self.body.velocity = outcome.velocity;
        self.hitstun = outcome.hitstun;
        self.stun_shielded = outcome.shielded;
        self.combo_idle_ticks = 0;
        if !outcome.shielded {
            self.actions.reset();
        }
        outcome
    }

    /// Applies gravity, resolves collisions and commits the position.
    ///
    /// Returns `true` when the fighter landed this tick.
    pub fn physics_step(
        &mut self,
        definition: &FighterDefinition,
        world: &CollisionWorld,
        config: &CollisionConfig,
    ) -> bool {
        let velocity = &mut self.body.velocity;
        if self.gravity_enabled && velocity.y < definition.max_fall_speed {
            velocity.y = (velocity.y + definition.gravity).min(definition.max_fall_speed);
        }

        let was_grounded = self.grounded;
        self.flags = move_and_collide(&mut self.body, world, config, None);
        self.grounded = self.flags.contains(Direction::Up);
        self.grounded && !was_grounded
    }

    /// Ends the combo once the fighter is out of hitstun and grounded, or
    /// has stayed airborne for `timeout` ticks.
    ///
    /// Returns the hit count and damage of the ended combo.
    pub fn update_combo(&mut self, timeout: u32) -> Option<(u16, f32)> {
        let combo = self.health.combo();
        if !combo.is_active() || self.hitstun > 0 {
            self.combo_idle_ticks = 0;
            return None;
        }

        if !self.grounded {
            self.combo_idle_ticks += 1;
            if self.combo_idle_ticks < timeout {
                return None;
            }
        }

        let ended = (combo.hit_count, combo.total_damage);
        self.health.end_combo();
        self.combo_idle_ticks = 0;
        Some(ended)
    }

    /// Takes one stock away; returns how many are left.
    pub(crate) fn lose_stock(&mut self) -> u8 {
        self.stocks = self.stocks.saturating_sub(1);
        self.stocks
    }

    /// Clears all per-fighter state before returning to the pool.
    pub(crate) fn reset(&mut self) {
        self.id = EntityId::NULL;
        self.port = 0;
        self.team = 0;
        self.stocks = 0;
        self.body = MovableEntity::new(Vec2::ZERO, self.body.size());
        self.facing = 1.0;
        self.grounded = false;
        self.gravity_enabled = true;
        self.flags = DirectionFlags::EMPTY;
        self.controller.reset();
        self.actions.reset();
        self.health.reset();
        self.hitstun = 0;
        self.shielding = false;
        self.stun_shielded = false;
        self.combo_idle_ticks = 0;
    }

    /// Re-initializes a pooled fighter.
    pub(crate) fn reinit(&mut self, spawn: &PlayerSpawn, definition: &FighterDefinition) {
        self.reset();
        self.id = spawn.id;
        self.port = spawn.port;
        self.team = spawn.team;
        self.definition = spawn.definition;
        self.stocks = spawn.stocks;
        self.body = MovableEntity::new(spawn.position, definition.size);
        self.actions = ActionManager::new(definition.idle_frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::brawler;

    fn spawn_at(position: Vec2) -> PlayerSpawn {
        PlayerSpawn {
            id: EntityId::from_raw(1),
            port: 0,
            team: 0,
            definition: DefinitionId::new(1),
            position,
            stocks: 3,
        }
    }

    fn floor() -> CollisionWorld {
        CollisionWorld::from_stage(&[Aabb::new(Vec2::new(-200.0, 0.0), Vec2::new(200.0, 20.0))])
    }

    /// Brawler standing exactly on the floor.
    fn standing() -> (Player, FighterDefinition) {
        let def = brawler();
        let mut player = Player::new(&spawn_at(Vec2::new(0.0, -def.size.y * 0.5)), &def);
        player.physics_step(&def, &floor(), &CollisionConfig::default());
        (player, def)
    }

    fn tick(player: &mut Player, def: &FighterDefinition, held: ButtonSet) -> ActionReport {
        player.begin_tick(held);
        let report = player.act(def).expect("act");
        player.physics_step(def, &floor(), &CollisionConfig::default());
        report
    }

    #[test]
    fn test_standing_is_grounded_and_still() {
        let (mut player, def) = standing();
        assert!(player.is_grounded());
        let before = player.position();

        tick(&mut player, &def, ButtonSet::EMPTY);

        assert!(player.is_grounded());
        assert_eq!(player.position(), before);
        assert_eq!(player.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_fall_reaches_terminal_velocity() {
        let mut def = brawler();
        def.gravity = 0.1;
        def.max_fall_speed = 4.0;
        let mut player = Player::new(&spawn_at(Vec2::ZERO), &def);

        for _ in 0..50 {
            player.physics_step(&def, &CollisionWorld::new(), &CollisionConfig::default());
        }

        assert_eq!(player.velocity().y, 4.0);
        assert!(!player.is_grounded());
    }

    #[test]
    fn test_gravity_can_be_disabled() {
        let def = brawler();
        let mut player = Player::new(&spawn_at(Vec2::ZERO), &def);
        player.set_gravity_enabled(false);
        player.physics_step(&def, &CollisionWorld::new(), &CollisionConfig::default());
        assert_eq!(player.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_jump_fires_after_startup() {
        let (mut player, def) = standing();
        let jump = ButtonSet::EMPTY.with(Button::Jump);

        let report = tick(&mut player, &def, jump);
        assert_eq!(report.started, Some(ActionKind::JumpStartup));

        let mut jumped = false;
        for _ in 0..def.jump_startup_frames {
            jumped |= tick(&mut player, &def, jump).jumped;
        }
        assert!(jumped);
        assert!(player.velocity().y < 0.0);
        assert!(!player.is_grounded());
        assert!(player.actions().is_idle());
    }

    #[test]
    fn test_attack_opens_hitbox_on_start_frame() {
        let (mut player, def) = standing();
        let data = def.move_data(ActionKind::GroundNeutral).expect("move");
        let start = data.hitbox.expect("hitbox").start;

        let report = tick(&mut player, &def, ButtonSet::EMPTY.with(Button::Attack));
        assert_eq!(report.started, Some(ActionKind::GroundNeutral));

        let mut opened_at = None;
        for frame in 1..data.duration {
            if tick(&mut player, &def, ButtonSet::EMPTY).opened.is_some() {
                opened_at = Some(frame);
            }
        }
        assert_eq!(opened_at, Some(start));
    }

    #[test]
    fn test_side_attack_turns_fighter() {
        let (mut player, def) = standing();
        let held = ButtonSet::EMPTY.with(Button::Left).with(Button::Attack);

        let report = tick(&mut player, &def, held);

        assert_eq!(report.started, Some(ActionKind::GroundSide));
        assert_eq!(player.facing(), -1.0);
    }

    #[test]
    fn test_attack_cannot_be_interrupted_by_jump() {
        let (mut player, def) = standing();
        tick(&mut player, &def, ButtonSet::EMPTY.with(Button::Attack));
        let report = tick(&mut player, &def, ButtonSet::EMPTY.with(Button::Jump));
        assert_eq!(report.started, None);
        assert_eq!(player.actions().current().kind, ActionKind::GroundNeutral);
    }

    #[test]
    fn test_walk_accelerates_to_walk_speed() {
        let (mut player, def) = standing();
        let right = ButtonSet::EMPTY.with(Button::Right);
        for _ in 0..20 {
            tick(&mut player, &def, right);
        }
        assert_eq!(player.velocity().x, def.walk_speed);
        assert_eq!(player.facing(), 1.0);
    }

    #[test]
    fn test_hit_sets_hitstun_and_resets_action() {
        let (mut player, def) = standing();
        tick(&mut player, &def, ButtonSet::EMPTY.with(Button::Attack));

        let hit = HitData::new(10.0, 0.9)
            .with_hitstun(5.0, 0.0, 5.0)
            .with_launch(3.0, 0.0, 3.0, 90.0);
        let outcome = player.apply_hit(&hit, EntityId::from_raw(2), 1.0);

        assert!(!outcome.shielded);
        assert_eq!(player.hitstun(), 5);
        assert!(player.actions().is_idle());
        assert!(player.health().is_hit());

        // No actions while stunned.
        let report = tick(&mut player, &def, ButtonSet::EMPTY.with(Button::Attack));
        assert_eq!(report.started, None);
        assert_eq!(player.hitstun(), 4);
    }

    #[test]
    fn test_shield_blocks_combo() {
        let (mut player, def) = standing();
        tick(&mut player, &def, ButtonSet::EMPTY.with(Button::Shield));
        assert!(player.is_shielding());

        let hit = HitData::new(10.0, 0.9).with_shield(3, 1.0, 0.0);
        let outcome = player.apply_hit(&hit, EntityId::from_raw(2), 1.0);

        assert!(outcome.shielded);
        assert_eq!(player.health().damage(), 0.0);
        assert!(!player.health().combo().is_active());
        assert_eq!(player.hitstun(), 3);
    }

    #[test]
    fn test_combo_ends_on_ground_after_hitstun() {
        let (mut player, def) = standing();
        let hit = HitData::new(5.0, 0.9).with_hitstun(1.0, 0.0, 1.0);
        player.apply_hit(&hit, EntityId::from_raw(2), 1.0);
        assert!(player.health().combo().is_active());

        // Still stunned this tick.
        assert_eq!(player.update_combo(60), None);

        tick(&mut player, &def, ButtonSet::EMPTY);
        assert_eq!(player.hitstun(), 0);
        assert_eq!(player.update_combo(60), Some((1, 5.0)));
        assert_eq!(player.health().combo().total_rate, 1.0);
        assert_eq!(player.health().damage(), 5.0);
    }

    #[test]
    fn test_combo_times_out_in_air() {
        let def = brawler();
        let mut player = Player::new(&spawn_at(Vec2::new(0.0, -500.0)), &def);
        player.apply_hit(&HitData::new(5.0, 0.9), EntityId::from_raw(2), 1.0);

        assert_eq!(player.update_combo(3), None);
        assert_eq!(player.update_combo(3), None);
        assert_eq!(player.update_combo(3), Some((1, 5.0)));
    }

    #[test]
    fn test_reset_clears_state() {
        let (mut player, def) = standing();
        let hit = HitData::new(5.0, 0.9).with_hitstun(9.0, 0.0, 9.0);
        player.apply_hit(&hit, EntityId::from_raw(2), 1.0);

        player.reset();

        assert_eq!(player.id(), EntityId::NULL);
        assert_eq!(player.stocks(), 0);
        assert_eq!(player.team(), 0);
        assert_eq!(player.hitstun(), 0);
        assert_eq!(player.health().damage(), 0.0);
        assert!(player.actions().is_idle());

        let spawn = PlayerSpawn {
            team: 2,
            ..spawn_at(Vec2::new(5.0, -100.0))
        };
        player.reinit(&spawn, &def);
        assert_eq!(player.id(), spawn.id);
        assert_eq!(player.team(), 2);
        assert_eq!(player.stocks(), 3);
        assert_eq!(player.position(), Vec2::new(5.0, -100.0));
    }
}

//! Fighter definitions: tunables, move data and attack resolution.
//!
//! Definitions are read-only content. A fighter looks its definition up
//! by [`DefinitionId`] when it spawns and never mutates it.

use ahash::AHashMap;
use glam::Vec2;
use scuffle_common::{DefinitionId, SimError, SimResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{Action, ActionKind, ActionTags, HitboxWindow};
use crate::combat::{HitData, LaunchType};
use crate::input::AttackDirection;

/// Frame data for one move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveData {
    /// Action this data drives
    pub kind: ActionKind,
    /// Frame count
    pub duration: u32,
    /// Tags added to the variant's defaults
    #[serde(default)]
    pub tags: ActionTags,
    /// Hitbox window, if the move hits
    #[serde(default)]
    pub hitbox: Option<HitboxWindow>,
}

/// State sampled when an attack button is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackContext {
    /// Standing on ground
    pub grounded: bool,
    /// Held direction
    pub direction: AttackDirection,
}

/// Chooses the melee variant for an attack press, `None` to ignore it.
pub type AttackResolver = fn(&AttackContext) -> Option<ActionKind>;

fn resolve_full_set(ctx: &AttackContext) -> Option<ActionKind> {
    Some(match (ctx.grounded, ctx.direction) {
        (true, AttackDirection::Neutral) => ActionKind::GroundNeutral,
        (true, AttackDirection::Down) => ActionKind::GroundDown,
        (true, AttackDirection::Side) => ActionKind::GroundSide,
        (false, AttackDirection::Neutral) => ActionKind::AirNeutral,
        (false, AttackDirection::Down) => ActionKind::AirDown,
        (false, AttackDirection::Side) => ActionKind::AirSide,
    })
}

fn resolve_zoner(ctx: &AttackContext) -> Option<ActionKind> {
    match (ctx.grounded, ctx.direction) {
        (true, AttackDirection::Side) => Some(ActionKind::GroundSide),
        (true, _) => Some(ActionKind::GroundNeutral),
        (false, AttackDirection::Down) => Some(ActionKind::AirDown),
        (false, AttackDirection::Neutral) => Some(ActionKind::AirNeutral),
        (false, AttackDirection::Side) => None,
    }
}

/// Attack-resolution capability of a fighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Every ground and air direction has its own move
    Brawler,
    /// Ground down folds into neutral; no air side attack
    Zoner,
}

impl Archetype {
    const RESOLVERS: [AttackResolver; 2] = [resolve_full_set, resolve_zoner];

    /// Function used to resolve attack presses.
    #[must_use]
    pub fn resolver(self) -> AttackResolver {
        Self::RESOLVERS[self as usize]
    }

    /// Every melee variant the resolver can produce, in resolution order.
    #[must_use]
    pub fn reachable_actions(self) -> Vec<ActionKind> {
        let resolve = self.resolver();
        let mut kinds = Vec::new();
        for grounded in [true, false] {
            for direction in [
                AttackDirection::Neutral,
                AttackDirection::Down,
                AttackDirection::Side,
            ] {
                if let Some(kind) = resolve(&AttackContext {
                    grounded,
                    direction,
                }) {
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
            }
        }
        kinds
    }
}

/// Immutable tunables for one fighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterDefinition {
    /// Display name
    pub name: String,
    /// Collision size (full width/height)
    pub size: Vec2,
    /// Max grounded horizontal speed
    pub walk_speed: f32,
    /// Max airborne horizontal speed
    pub air_speed: f32,
    /// Grounded horizontal acceleration per tick
    pub ground_acceleration: f32,
    /// Airborne horizontal acceleration per tick
    pub air_acceleration: f32,
    /// Grounded deceleration per tick without input
    pub friction: f32,
    /// Upward speed set when a jump fires
    pub jump_velocity: f32,
    /// Jump startup length
    pub jump_startup_frames: u32,
    /// Horizontal speed set when a dash fires
    pub dash_speed: f32,
    /// Dash startup length
    pub dash_startup_frames: u32,
    /// Downward acceleration per tick
    pub gravity: f32,
    /// Terminal fall speed
    pub max_fall_speed: f32,
    /// Idle loop length
    pub idle_frames: u32,
    /// Attack resolution capability
    pub archetype: Archetype,
    /// Melee frame data
    pub moves: Vec<MoveData>,
}

impl FighterDefinition {
    /// Parses a definition from RON.
    pub fn from_ron(source: &str) -> SimResult<Self> {
        ron::from_str(source).map_err(|e| SimError::InvalidDefinition(e.to_string()))
    }

    /// Checks that every action the archetype can produce has frame data.
    pub fn validate(&self) -> SimResult<()> {
        if self.size.x <= 0.0 || self.size.y <= 0.0 {
            return Err(SimError::InvalidDefinition(format!(
                "'{}' has a non-positive size",
                self.name
            )));
        }
        if self.gravity < 0.0 || self.max_fall_speed < 0.0 {
            return Err(SimError::InvalidDefinition(format!(
                "'{}' has negative gravity or fall speed",
                self.name
            )));
        }

        for kind in self.archetype.reachable_actions() {
            let data = self.move_data(kind)?;
            if let Some(window) = &data.hitbox {
                if window.start >= data.duration {
                    return Err(SimError::InvalidDefinition(format!(
                        "'{}' {} hitbox starts after the move ends",
                        self.name, kind
                    )));
                }
            }
        }
        Ok(())
    }

    /// Frame data for a melee variant.
    pub fn move_data(&self, kind: ActionKind) -> SimResult<&MoveData> {
        self.moves
            .iter()
            .find(|m| m.kind == kind)
            .ok_or_else(|| SimError::MissingMove {
                definition: self.name.clone(),
                action: kind.move_id().to_string(),
            })
    }

    /// Builds a fresh action of the given kind.
    pub fn action(&self, kind: ActionKind) -> SimResult<Action> {
        let action = match kind {
            ActionKind::Idle => Action::new(kind, self.idle_frames),
            ActionKind::JumpStartup => Action::new(kind, self.jump_startup_frames),
            ActionKind::DashStartup => Action::new(kind, self.dash_startup_frames),
            _ => {
                let data = self.move_data(kind)?;
                let action = Action::new(kind, data.duration).with_tags(data.tags);
                match data.hitbox {
                    Some(window) => action.with_hitbox(window),
                    None => action,
                }
            },
        };
        Ok(action)
    }

    /// Resolves an attack press into an action.
    pub fn resolve_attack(&self, ctx: &AttackContext) -> SimResult<Option<Action>> {
        match (self.archetype.resolver())(ctx) {
            Some(kind) => self.action(kind).map(Some),
            None => Ok(None),
        }
    }
}

fn melee(kind: ActionKind, duration: u32, start: u32, offset: Vec2, size: Vec2, hit: HitData) -> MoveData {
    MoveData {
        kind,
        duration,
        tags: ActionTags::NONE,
        hitbox: Some(HitboxWindow {
            start,
            active: 3,
            offset,
            size,
            hit,
        }),
    }
}

/// Close-range fighter with a full move set.
#[must_use]
pub fn brawler() -> FighterDefinition {
    let jab = HitData::new(6.0, 0.9)
        .with_hitstun(8.0, 0.2, 30.0)
        .with_launch(2.0, 0.05, 8.0, 20.0)
        .with_shield(4, 1.0, 0.0);
    let sweep = HitData::new(9.0, 0.85)
        .with_hitstun(12.0, 0.3, 40.0)
        .with_launch(3.0, 0.08, 12.0, 70.0)
        .with_shield(6, 1.5, 0.0)
        .with_launch_type(LaunchType::Launch);
    let spike = HitData::new(11.0, 0.8)
        .with_hitstun(14.0, 0.3, 45.0)
        .with_launch(3.5, 0.1, 14.0, -80.0)
        .with_shield(8, 1.0, 0.0)
        .with_launch_type(LaunchType::Spike);

    FighterDefinition {
        name: "brawler".to_string(),
        size: Vec2::new(16.0, 32.0),
        walk_speed: 3.0,
        air_speed: 2.5,
        ground_acceleration: 0.5,
        air_acceleration: 0.25,
        friction: 0.4,
        jump_velocity: 7.0,
        jump_startup_frames: 3,
        dash_speed: 6.0,
        dash_startup_frames: 2,
        gravity: 0.35,
        max_fall_speed: 8.0,
        idle_frames: 30,
        archetype: Archetype::Brawler,
        moves: vec![
            melee(ActionKind::GroundNeutral, 12, 3, Vec2::new(14.0, 0.0), Vec2::new(14.0, 10.0), jab),
            melee(ActionKind::GroundDown, 16, 5, Vec2::new(12.0, 12.0), Vec2::new(20.0, 8.0), sweep),
            melee(ActionKind::GroundSide, 20, 6, Vec2::new(18.0, 0.0), Vec2::new(20.0, 12.0), sweep),
            melee(ActionKind::AirNeutral, 14, 3, Vec2::ZERO, Vec2::new(28.0, 28.0), jab),
            melee(ActionKind::AirDown, 22, 8, Vec2::new(0.0, 20.0), Vec2::new(14.0, 14.0), spike),
            melee(ActionKind::AirSide, 18, 5, Vec2::new(16.0, -2.0), Vec2::new(18.0, 12.0), sweep),
        ],
    }
}

/// Lighter fighter with a reduced melee set.
#[must_use]
pub fn zoner() -> FighterDefinition {
    let poke = HitData::new(4.0, 0.95)
        .with_hitstun(6.0, 0.15, 24.0)
        .with_launch(1.5, 0.04, 6.0, 30.0)
        .with_shield(3, 0.8, 0.0);
    let kick = HitData::new(8.0, 0.85)
        .with_hitstun(10.0, 0.25, 36.0)
        .with_launch(2.5, 0.07, 10.0, 45.0)
        .with_shield(5, 1.2, 0.0)
        .with_launch_type(LaunchType::Launch);

    FighterDefinition {
        name: "zoner".to_string(),
        size: Vec2::new(14.0, 28.0),
        walk_speed: 2.5,
        air_speed: 2.8,
        ground_acceleration: 0.4,
        air_acceleration: 0.3,
        friction: 0.3,
        jump_velocity: 7.5,
        jump_startup_frames: 4,
        dash_speed: 5.0,
        dash_startup_frames: 3,
        gravity: 0.3,
        max_fall_speed: 7.0,
        idle_frames: 40,
        archetype: Archetype::Zoner,
        moves: vec![
            melee(ActionKind::GroundNeutral, 10, 2, Vec2::new(12.0, 0.0), Vec2::new(12.0, 8.0), poke),
            melee(ActionKind::GroundSide, 18, 6, Vec2::new(18.0, 4.0), Vec2::new(18.0, 10.0), kick),
            melee(ActionKind::AirNeutral, 12, 3, Vec2::ZERO, Vec2::new(24.0, 24.0), poke),
            melee(ActionKind::AirDown, 20, 7, Vec2::new(0.0, 18.0), Vec2::new(12.0, 12.0), kick),
        ],
    }
}

/// Read-only lookup of fighter definitions by id.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: AHashMap<DefinitionId, FighterDefinition>,
}

impl DefinitionRegistry {
    /// Id of the built-in brawler.
    pub const BRAWLER: DefinitionId = DefinitionId::new(1);
    /// Id of the built-in zoner.
    pub const ZONER: DefinitionId = DefinitionId::new(2);

    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in fighters.
    pub fn with_builtins() -> SimResult<Self> {
        let mut registry = Self::new();
        registry.register(Self::BRAWLER, brawler())?;
        registry.register(Self::ZONER, zoner())?;
        Ok(registry)
    }

    /// Validates and stores a definition, replacing any previous one.
    pub fn register(&mut self, id: DefinitionId, definition: FighterDefinition) -> SimResult<()> {
        definition.validate()?;
        debug!("Registered fighter definition '{}' as {}", definition.name, id);
        self.definitions.insert(id, definition);
        Ok(())
    }

    /// Looks a definition up.
    pub fn get(&self, id: DefinitionId) -> SimResult<&FighterDefinition> {
        self.definitions
            .get(&id)
            .ok_or(SimError::UnknownDefinition(id))
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_validate() {
        let registry = DefinitionRegistry::with_builtins().expect("builtins");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(DefinitionRegistry::ZONER).expect("zoner").name, "zoner");
    }

    #[test]
    fn test_unknown_definition() {
        let registry = DefinitionRegistry::new();
        let err = registry.get(DefinitionId::new(99)).unwrap_err();
        assert_eq!(err, SimError::UnknownDefinition(DefinitionId::new(99)));
    }

    #[test]
    fn test_missing_move_rejected_at_registration() {
        let mut def = brawler();
        def.moves.retain(|m| m.kind != ActionKind::AirSide);

        let err = DefinitionRegistry::new()
            .register(DefinitionId::new(5), def)
            .unwrap_err();
        assert!(matches!(err, SimError::MissingMove { ref action, .. } if action == "air_side"));
    }

    #[test]
    fn test_zoner_does_not_need_unreachable_moves() {
        let reachable = Archetype::Zoner.reachable_actions();
        assert!(!reachable.contains(&ActionKind::GroundDown));
        assert!(!reachable.contains(&ActionKind::AirSide));
        assert!(zoner().validate().is_ok());
    }

    #[test]
    fn test_resolve_attack_variants() {
        let def = brawler();
        let action = def
            .resolve_attack(&AttackContext {
                grounded: false,
                direction: AttackDirection::Down,
            })
            .expect("resolve")
            .expect("action");
        assert_eq!(action.kind, ActionKind::AirDown);
        assert_eq!(action.frame, 0);
        assert!(action.hitbox.is_some());

        let none = zoner()
            .resolve_attack(&AttackContext {
                grounded: false,
                direction: AttackDirection::Side,
            })
            .expect("resolve");
        assert!(none.is_none());
    }

    #[test]
    fn test_startup_actions_use_tunables() {
        let def = brawler();
        assert_eq!(def.action(ActionKind::JumpStartup).expect("jump").duration, 3);
        assert_eq!(def.action(ActionKind::DashStartup).expect("dash").duration, 2);
        let idle = def.action(ActionKind::Idle).expect("idle");
        assert!(idle.tags.contains(ActionTags::LOOPING));
    }

    #[test]
    fn test_from_ron() {
        let text = ron::to_string(&zoner()).expect("serialize");
        let parsed = FighterDefinition::from_ron(&text).expect("parse");
        assert_eq!(parsed, zoner());

        let err = FighterDefinition::from_ron("(name: \"broken\")").unwrap_err();
        assert!(matches!(err, SimError::InvalidDefinition(_)));
    }

    #[test]
    fn test_hitbox_after_move_end_rejected() {
        let mut def = zoner();
        if let Some(window) = def.moves[0].hitbox.as_mut() {
            window.start = 50;
        }
        assert!(matches!(def.validate(), Err(SimError::InvalidDefinition(_))));
    }
}

//! The simulation world and its fixed-order tick.
//!
//! A tick runs to completion in this order:
//! 1. world objects move (platforms, projectiles)
//! 2. the collider snapshot for the tick is taken
//! 3. each fighter samples input and advances its action
//! 4. combat: every overlap is collected first, then applied
//! 5. each fighter runs gravity, collision and commit
//! 6. fighters outside the blast zone are knocked out
//! 7. hitbox and delayed-sound countdowns advance
//!
//! Fighters and objects are visited in registration order, so two worlds
//! fed the same spawns and inputs stay identical tick for tick.

use glam::Vec2;
use scuffle_common::{DefinitionId, EntityId, EntityIdAllocator, SimError, SimResult, SoundId};
use tracing::{debug, info, trace};

use crate::audio::AudioQueue;
use crate::collision::{ColliderSource, CollisionWorld};
use crate::combat::HitData;
use crate::config::SimConfig;
use crate::definition::{DefinitionRegistry, FighterDefinition};
use crate::events::{EventBus, GameEvent};
use crate::geometry::Aabb;
use crate::hitbox::{Hitbox, HitboxPool};
use crate::input::InputSource;
use crate::player::{Player, PlayerSpawn};
use crate::world_object::{ObjectKind, Projectile, WorldObject};

/// Sounds every world registers at construction.
pub const DEFAULT_SOUNDS: [&str; 6] = ["hit", "shield", "jump", "land", "ko", "respawn"];

/// Ticks between a KO and the respawn jingle.
const RESPAWN_SOUND_DELAY: u32 = 30;

/// What kind of entity a render state describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// Fighter
    Fighter,
    /// Platform
    Platform,
    /// Projectile
    Projectile,
}

/// Per-entity snapshot for the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Entity id
    pub id: EntityId,
    /// Entity kind
    pub kind: RenderKind,
    /// Current rectangle
    pub rectangle: Aabb,
    /// Animation lookup key
    pub move_id: &'static str,
    /// Active action frame
    pub frame: u32,
    /// Active action length
    pub duration: u32,
    /// +1 facing right, -1 facing left
    pub facing: f32,
}

#[derive(Debug, Clone, Copy)]
enum HitSource {
    Hitbox(usize),
    Projectile(usize),
}

#[derive(Debug, Clone, Copy)]
struct PendingHit {
    source: HitSource,
    attacker: EntityId,
    defender: usize,
    hit: HitData,
    facing: f32,
}

/// The simulation world.
#[derive(Debug)]
pub struct World {
    config: SimConfig,
    definitions: DefinitionRegistry,
    players: Vec<Player>,
    player_pool: Vec<Player>,
    objects: Vec<WorldObject>,
    hitboxes: HitboxPool,
    audio: AudioQueue,
    events: EventBus,
    ids: EntityIdAllocator,
    tick: u64,
    paused: bool,
}

impl World {
    /// Creates an empty world. The config is validated first.
    #[must_use]
    pub fn new(mut config: SimConfig, definitions: DefinitionRegistry) -> Self {
        config.validate();

        let mut audio = AudioQueue::new(config.delayed_sound_capacity);
        for name in DEFAULT_SOUNDS {
            audio.register(name);
        }

        Self {
            hitboxes: HitboxPool::new(config.hitbox_capacity),
            events: EventBus::new(config.event_capacity),
            audio,
            definitions,
            players: Vec::new(),
            player_pool: Vec::new(),
            objects: Vec::new(),
            ids: EntityIdAllocator::new(),
            tick: 0,
            paused: false,
            config,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Fighter definitions.
    #[must_use]
    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    /// Simulated ticks so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Fighters in registration order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Looks a fighter up.
    #[must_use]
    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    /// Looks a fighter up mutably.
    pub fn player_mut(&mut self, id: EntityId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id() == id)
    }

    /// Objects in registration order.
    #[must_use]
    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    /// Live hitboxes.
    #[must_use]
    pub fn hitboxes(&self) -> &HitboxPool {
        &self.hitboxes
    }

    /// Fighters waiting in the pool for reuse.
    #[must_use]
    pub fn pooled_players(&self) -> usize {
        self.player_pool.len()
    }

    /// Event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Sound queue.
    #[must_use]
    pub fn audio(&self) -> &AudioQueue {
        &self.audio
    }

    /// Sound queue, for registering sounds and queueing requests.
    pub fn audio_mut(&mut self) -> &mut AudioQueue {
        &mut self.audio
    }

    /// Takes every sound due this tick.
    ///
    /// Call once per tick, like draining [`World::events`]. Undrained
    /// sounds are capped at [`crate::audio::READY_CAPACITY`].
    pub fn drain_sounds(&mut self) -> Vec<SoundId> {
        self.audio.drain_ready()
    }

    /// Whether the simulation is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pauses or resumes the simulation.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            info!("Simulation {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    fn allocate_id(&mut self) -> SimResult<EntityId> {
        self.ids.allocate().ok_or(SimError::IdsExhausted)
    }

    fn spawn_point(&self, slot: u8) -> SimResult<Vec2> {
        self.config
            .spawn_points
            .get(slot as usize)
            .copied()
            .ok_or(SimError::NoSpawnPoint(slot as usize))
    }

    fn take_pooled(
        pool: &mut Vec<Player>,
        spawn: &PlayerSpawn,
        definition: &FighterDefinition,
    ) -> Player {
        match pool.pop() {
            Some(mut player) => {
                player.reinit(spawn, definition);
                player
            },
            None => Player::new(spawn, definition),
        }
    }

    /// Adds a fighter on `port` at that port's spawn point.
    pub fn spawn_player(
        &mut self,
        definition: DefinitionId,
        port: u8,
        team: u8,
    ) -> SimResult<EntityId> {
        let position = self.spawn_point(port)?;
        let fighter = self.definitions.get(definition)?;
        let id = self.ids.allocate().ok_or(SimError::IdsExhausted)?;

        let spawn = PlayerSpawn {
            id,
            port,
            team,
            definition,
            position,
            stocks: self.config.default_stocks,
        };
        let player = Self::take_pooled(&mut self.player_pool, &spawn, fighter);
        self.players.push(player);

        info!("Spawned {} ({}) on port {}", id, fighter.name, port);
        self.events.publish(GameEvent::EntitySpawned { entity_id: id });
        Ok(id)
    }

    /// Adds a solid platform.
    pub fn spawn_platform(
        &mut self,
        bounds: Aabb,
        velocity: Vec2,
        patrol_ticks: Option<u32>,
    ) -> SimResult<EntityId> {
        let id = self.allocate_id()?;
        self.objects
            .push(WorldObject::platform(id, bounds, velocity, patrol_ticks));
        self.events.publish(GameEvent::EntitySpawned { entity_id: id });
        Ok(id)
    }

    /// Fires a projectile credited to `owner`.
    pub fn spawn_projectile(
        &mut self,
        owner: EntityId,
        position: Vec2,
        size: Vec2,
        velocity: Vec2,
        hit: HitData,
        lifetime: u32,
    ) -> SimResult<EntityId> {
        let team = self
            .player(owner)
            .map(Player::team)
            .ok_or(SimError::UnknownEntity(owner))?;
        let id = self.allocate_id()?;
        let projectile = Projectile {
            owner,
            team,
            hit,
            lifetime,
        };
        self.objects
            .push(WorldObject::projectile(id, position, size, velocity, projectile));
        self.events.publish(GameEvent::EntitySpawned { entity_id: id });
        Ok(id)
    }

    /// Removes an entity: fighters lose a stock (and respawn if any are left),
    /// objects despawn.
    pub fn kill(&mut self, id: EntityId) -> SimResult<()> {
        if self.players.iter().any(|p| p.id() == id) {
            return self.knock_out(id);
        }
        let index = self
            .objects
            .iter()
            .position(|o| o.id() == id)
            .ok_or(SimError::UnknownEntity(id))?;
        self.objects.remove(index);
        self.events.publish(GameEvent::EntityKilled {
            entity_id: id,
            stocks_left: 0,
        });
        Ok(())
    }

    fn knock_out(&mut self, id: EntityId) -> SimResult<()> {
        let index = self
            .players
            .iter()
            .position(|p| p.id() == id)
            .ok_or(SimError::UnknownEntity(id))?;

        let mut player = self.players.remove(index);
        let stocks_left = player.lose_stock();
        let spawn = PlayerSpawn {
            id,
            port: player.port(),
            team: player.team(),
            definition: player.definition(),
            position: Vec2::ZERO,
            stocks: stocks_left,
        };

        info!("{} knocked out, {} stocks left", id, stocks_left);
        self.hitboxes.remove_owned_by(id);
        self.events.publish(GameEvent::EntityKilled {
            entity_id: id,
            stocks_left,
        });
        self.audio.play("ko")?;

        player.reset();
        self.player_pool.push(player);

        if stocks_left == 0 {
            return Ok(());
        }

        let spawn = PlayerSpawn {
            position: self.spawn_point(spawn.port)?,
            ..spawn
        };
        let fighter = self.definitions.get(spawn.definition)?;
        let player = Self::take_pooled(&mut self.player_pool, &spawn, fighter);
        self.players.insert(index, player);

        debug!("Respawned {} from pool", id);
        self.events.publish(GameEvent::EntitySpawned { entity_id: id });
        if !self.audio.play_delayed("respawn", RESPAWN_SOUND_DELAY)? {
            debug!("Respawn sound dropped");
        }
        Ok(())
    }

    /// Per-entity render snapshot, fighters first, in registration order.
    #[must_use]
    pub fn render_states(&self) -> Vec<RenderState> {
        let fighters = self.players.iter().map(|player| {
            let action = player.actions().current();
            RenderState {
                id: player.id(),
                kind: RenderKind::Fighter,
                rectangle: player.rectangle(),
                move_id: action.kind.move_id(),
                frame: action.frame,
                duration: action.duration,
                facing: player.facing(),
            }
        });
        let objects = self.objects.iter().map(|object| {
            let (kind, move_id, facing) = match object.kind() {
                ObjectKind::Platform(_) => (RenderKind::Platform, "platform", 1.0),
                ObjectKind::Projectile(_) => (
                    RenderKind::Projectile,
                    "projectile",
                    Projectile::facing(object.body().velocity),
                ),
            };
            RenderState {
                id: object.id(),
                kind,
                rectangle: object.rectangle(),
                move_id,
                frame: 0,
                duration: 0,
                facing,
            }
        });
        fighters.chain(objects).collect()
    }

    fn collision_snapshot(&self) -> CollisionWorld {
        let mut world = CollisionWorld::from_stage(&self.config.stage);
        for object in self.objects.iter().filter(|o| o.is_solid()) {
            world.push(ColliderSource::Object(object.id()), object.rectangle());
        }
        world
    }

    /// Runs one simulation tick. A paused world does nothing.
    pub fn tick<I: InputSource + ?Sized>(&mut self, input: &I) -> SimResult<()> {
        if self.paused {
            trace!("Tick skipped while paused");
            return Ok(());
        }
        self.tick += 1;
        let collision = self.config.collision();

        // Objects
        let stage = CollisionWorld::from_stage(&self.config.stage);
        for object in &mut self.objects {
            object.update(&stage, &collision);
        }
        let colliders = self.collision_snapshot();

        // Input and actions
        for player in &mut self.players {
            let definition = self.definitions.get(player.definition())?;
            player.begin_tick(input.buttons(player.port()));
            let report = player.act(definition)?;

            if let Some(action) = report.started {
                self.events.publish(GameEvent::ActionStarted {
                    entity_id: player.id(),
                    action,
                });
            }
            if report.jumped {
                self.audio.play("jump")?;
            }
            if let Some(window) = report.opened {
                self.hitboxes
                    .try_spawn(Hitbox::from_window(player.id(), &window, player.facing()));
            }
        }

        self.resolve_combat()?;

        // Physics
        for player in &mut self.players {
            let definition = self.definitions.get(player.definition())?;
            if player.physics_step(definition, &colliders, &collision) {
                self.events.publish(GameEvent::Landed {
                    entity_id: player.id(),
                });
                self.audio.play("land")?;
            }
            if let Some((hits, damage)) = player.update_combo(self.config.combo_timeout_ticks) {
                trace!("{} combo ended: {} hits, {:.1} damage", player.id(), hits, damage);
                self.events.publish(GameEvent::ComboEnded {
                    entity_id: player.id(),
                    hits,
                    damage,
                });
            }
        }

        self.remove_dead_objects();

        let knocked_out: Vec<EntityId> = self
            .players
            .iter()
            .filter(|p| self.config.blast_zone.excludes(p.position()))
            .map(Player::id)
            .collect();
        for id in knocked_out {
            self.knock_out(id)?;
        }

        self.hitboxes.tick();
        self.audio.tick();
        Ok(())
    }

    fn can_hit(&self, attacker: &Player, defender: &Player) -> bool {
        self.can_hit_team(attacker.id(), attacker.team(), defender)
    }

    fn can_hit_team(&self, attacker: EntityId, team: u8, defender: &Player) -> bool {
        defender.id() != attacker && (self.config.friendly_fire || defender.team() != team)
    }

    fn collect_hits(&self) -> Vec<PendingHit> {
        let mut pending: Vec<PendingHit> = Vec::new();
        let targeted =
            |pending: &[PendingHit], defender: usize| pending.iter().any(|p| p.defender == defender);

        for (slot, hitbox) in self.hitboxes.slots() {
            let Some(owner) = self.player(hitbox.owner) else {
                continue;
            };
            let bounds = hitbox.bounds(owner.position());

            for (index, defender) in self.players.iter().enumerate() {
                if !self.can_hit(owner, defender)
                    || hitbox.has_hit(defender.id())
                    || targeted(&pending, index)
                {
                    continue;
                }
                if defender.hurtbox().is_some_and(|hurtbox| bounds.overlaps(&hurtbox)) {
                    pending.push(PendingHit {
                        source: HitSource::Hitbox(slot),
                        attacker: owner.id(),
                        defender: index,
                        hit: hitbox.hit,
                        facing: hitbox.facing,
                    });
                }
            }
        }

        for (object_index, object) in self.objects.iter().enumerate() {
            let ObjectKind::Projectile(projectile) = object.kind() else {
                continue;
            };
            if !object.is_alive() {
                continue;
            }
            let bounds = object.rectangle();
            let target = self.players.iter().enumerate().find(|(index, defender)| {
                self.can_hit_team(projectile.owner, projectile.team, defender)
                    && !targeted(&pending, *index)
                    && defender.hurtbox().is_some_and(|hurtbox| bounds.overlaps(&hurtbox))
            });
            if let Some((index, _)) = target {
                pending.push(PendingHit {
                    source: HitSource::Projectile(object_index),
                    attacker: projectile.owner,
                    defender: index,
                    hit: projectile.hit,
                    facing: Projectile::facing(object.body().velocity),
                });
            }
        }

        pending
    }

    /// Applies every overlap found this tick. Each defender takes at most
    /// one hit per tick; trades land on both sides.
    fn resolve_combat(&mut self) -> SimResult<()> {
        for pending in self.collect_hits() {
            let defender = &mut self.players[pending.defender];
            let defender_id = defender.id();

            match pending.source {
                HitSource::Hitbox(slot) => {
                    if let Some(hitbox) = self.hitboxes.get_mut(slot) {
                        hitbox.mark_hit(defender_id);
                    }
                },
                HitSource::Projectile(index) => {
                    if let Some(object) = self.objects.get_mut(index) {
                        object.expire();
                    }
                },
            }

            let outcome = defender.apply_hit(&pending.hit, pending.attacker, pending.facing);
            if !outcome.shielded {
                self.hitboxes.remove_owned_by(defender_id);
            }

            debug!(
                "{} hit {} for {:.1} (shielded: {})",
                pending.attacker, defender_id, outcome.damage, outcome.shielded
            );
            self.events.publish(GameEvent::HitLanded {
                attacker: pending.attacker,
                defender: defender_id,
                damage: outcome.damage,
                shielded: outcome.shielded,
                launch: outcome.velocity,
            });
            self.audio.play(if outcome.shielded { "shield" } else { "hit" })?;
        }
        Ok(())
    }

    fn remove_dead_objects(&mut self) {
        let events = &self.events;
        self.objects.retain(|object| {
            if !object.is_alive() {
                events.publish(GameEvent::EntityKilled {
                    entity_id: object.id(),
                    stocks_left: 0,
                });
            }
            object.is_alive()
        });
    }
}

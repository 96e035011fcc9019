//! Swept AABB collision resolver.
//!
//! Resolution is discrete and per tick: a body's rectangle is swept along
//! its velocity for one tick and every collider touching the swept region
//! becomes a candidate. Contacts are resolved closest-first. Resolving a
//! contact snaps the body flush against the collider on the contact axis and
//! stops motion into it; motion along the surface is kept (wall and floor
//! sliding). After each correction all remaining candidates are tested
//! again with the corrected velocity, so a slide cannot carry the body into
//! a collider it missed on the original path.
//!
//! The resolver only reads the collider snapshot it is given. It never
//! fails: "no collision" is the empty flag set.

use glam::Vec2;
use scuffle_common::EntityId;
use serde::{Deserialize, Serialize};

use crate::geometry::{Aabb, Axis, Direction, DirectionFlags};
use crate::movable::MovableEntity;

/// Where a collider comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderSource {
    /// Static stage geometry, by registration index
    Stage(usize),
    /// A solid world object (e.g. a moving platform)
    Object(EntityId),
}

/// A solid rectangle bodies cannot pass through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    /// Origin of the collider
    pub source: ColliderSource,
    /// Current bounds
    pub bounds: Aabb,
}

/// Read-only snapshot of every solid rectangle for one tick.
///
/// Colliders are kept in registration order; that order breaks ties
/// between otherwise identical contacts.
#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    colliders: Vec<Collider>,
}

impl CollisionWorld {
    /// Creates an empty collision world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collision world from stage geometry.
    #[must_use]
    pub fn from_stage(stage: &[Aabb]) -> Self {
        let colliders = stage
            .iter()
            .enumerate()
            .map(|(index, bounds)| Collider {
                source: ColliderSource::Stage(index),
                bounds: *bounds,
            })
            .collect();
        Self { colliders }
    }

    /// Appends a collider.
    pub fn push(&mut self, source: ColliderSource, bounds: Aabb) {
        self.colliders.push(Collider { source, bounds });
    }

    /// Returns all colliders in registration order.
    #[must_use]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Returns the number of colliders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Returns true if there are no colliders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

/// Configuration for collision response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Gap under which a stationary body still counts as touching a surface
    pub skin_width: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { skin_width: 0.01 }
    }
}

/// Per-tick swept query region for one moving body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPrecalculation {
    /// Rectangle at the start of the tick
    pub start: Aabb,
    /// Velocity the sweep was built for
    pub velocity: Vec2,
    /// Rectangle after moving by the full velocity
    pub target: Aabb,
    /// Region covering the whole movement plus the skin width
    pub swept: Aabb,
    /// Touching tolerance copied from the config
    pub skin_width: f32,
}

/// A collider near a moving body's path, with its contact under the
/// tick's velocity if there is one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    /// Collider that was hit
    pub source: ColliderSource,
    /// Collider bounds at query time
    pub bounds: Aabb,
    /// Direction the contacted surface faces, `None` if the original path misses it
    pub normal: Option<Direction>,
    /// Fraction of the tick's movement before contact (0 for resting or
    /// embedded, infinite without a contact)
    pub time: f32,
    /// Depth the unresolved target rectangle reaches into the collider along the normal
    pub penetration: f32,
    /// Index of the collider in the snapshot
    order: usize,
}

impl CollisionData {
    /// Whether the original path touches the collider.
    #[must_use]
    pub fn is_contact(&self) -> bool {
        self.normal.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    normal: Direction,
    time: f32,
    penetration: f32,
}

/// Builds the swept query region for this tick. Pure.
#[must_use]
pub fn precompute(
    movable: &MovableEntity,
    velocity: Vec2,
    config: &CollisionConfig,
) -> CollisionPrecalculation {
    let start = movable.rectangle();
    let target = start.translated(velocity);
    let skin_width = config.skin_width.max(0.0);

    CollisionPrecalculation {
        start,
        velocity,
        target,
        swept: start.union(&target).expanded(skin_width),
        skin_width,
    }
}

/// Returns every collider inside the swept region, closest contact first.
///
/// Contacts are ordered by time of impact, then by penetration depth,
/// then by collider registration order, so resolution is deterministic.
/// Colliders the original path misses follow in registration order; they
/// stay candidates for [`resolve`].
#[must_use]
pub fn query_colliders(
    world: &CollisionWorld,
    precalc: &CollisionPrecalculation,
    exclude: Option<ColliderSource>,
) -> Vec<CollisionData> {
    let mut contacts: Vec<CollisionData> = world
        .colliders()
        .iter()
        .enumerate()
        .filter(|(_, collider)| Some(collider.source) != exclude)
        .filter(|(_, collider)| precalc.swept.touches(&collider.bounds))
        .map(|(order, collider)| {
            let contact = find_contact(
                &precalc.start,
                precalc.velocity,
                &collider.bounds,
                precalc.skin_width,
            );
            CollisionData {
                source: collider.source,
                bounds: collider.bounds,
                normal: contact.map(|contact| contact.normal),
                time: contact.map_or(f32::INFINITY, |contact| contact.time),
                penetration: contact.map_or(0.0, |contact| contact.penetration),
                order,
            }
        })
        .collect();

    contacts.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then(a.penetration.total_cmp(&b.penetration))
            .then(a.order.cmp(&b.order))
    });
    contacts
}

/// Resolves contacts closest-first and returns the blocked sides.
///
/// Every collider in `contacts` is a candidate and is resolved at most
/// once. Each step re-tests the unresolved candidates against the body's
/// already-corrected position and velocity and resolves the earliest
/// contact, so a contact made obsolete by an earlier one is skipped and a
/// collider first reached by a slide is still caught. A resting contact
/// the body is moving away from is left for a later step, in case another
/// contact changes the velocity. When a body is pinned between two opposite
/// surfaces both flags are set, the velocity on that axis is zeroed, and
/// the second contact does not move the body back into the first.
pub fn resolve(
    movable: &mut MovableEntity,
    precalc: &CollisionPrecalculation,
    contacts: &[CollisionData],
) -> DirectionFlags {
    let mut flags = DirectionFlags::empty();
    let mut resolved = vec![false; contacts.len()];

    while let Some((index, contact)) = next_contact(movable, precalc, contacts, &resolved) {
        resolved[index] = true;

        let pinned = flags.contains(contact.normal.opposite());
        flags.insert(contact.normal);

        if pinned {
            set_axis(&mut movable.velocity, contact.normal.axis(), 0.0);
            continue;
        }

        snap_flush(movable, &contacts[index].bounds, contact.normal);
        if movable.velocity.dot(contact.normal.normal()) < 0.0 {
            set_axis(&mut movable.velocity, contact.normal.axis(), 0.0);
        }
    }

    flags
}

/// Earliest contact among the unresolved candidates for the body's current state.
fn next_contact(
    movable: &MovableEntity,
    precalc: &CollisionPrecalculation,
    contacts: &[CollisionData],
    resolved: &[bool],
) -> Option<(usize, Contact)> {
    let rect = movable.rectangle();

    contacts
        .iter()
        .enumerate()
        .filter(|(index, _)| !resolved[*index])
        .filter_map(|(index, data)| {
            let contact = find_contact(&rect, movable.velocity, &data.bounds, precalc.skin_width)?;
            let resting = contact.time == 0.0 && contact.penetration == 0.0;
            if resting && movable.velocity.dot(contact.normal.normal()) > 0.0 {
                return None;
            }
            Some((index, contact, data.order))
        })
        .min_by(|a, b| {
            a.1.time
                .total_cmp(&b.1.time)
                .then(a.1.penetration.total_cmp(&b.1.penetration))
                .then(a.2.cmp(&b.2))
        })
        .map(|(index, contact, _)| (index, contact))
}

fn find_contact(rect: &Aabb, velocity: Vec2, other: &Aabb, skin: f32) -> Option<Contact> {
    let depth = rect.overlap_depth(other);
    if depth.x > 0.0 && depth.y > 0.0 {
        return Some(embedded_contact(rect, other, depth));
    }
    swept_contact(rect, velocity, other).or_else(|| resting_contact(rect, other, depth, skin))
}

/// Pushes out along the axis of least overlap.
fn embedded_contact(rect: &Aabb, other: &Aabb, depth: Vec2) -> Contact {
    let center = rect.center();
    let other_center = other.center();

    let (normal, penetration) = if depth.y <= depth.x {
        let normal = if center.y <= other_center.y {
            Direction::Up
        } else {
            Direction::Down
        };
        (normal, depth.y)
    } else {
        let normal = if center.x <= other_center.x {
            Direction::Left
        } else {
            Direction::Right
        };
        (normal, depth.x)
    };

    Contact {
        normal,
        time: 0.0,
        penetration,
    }
}

/// Entry/exit times on one axis, `None` if the axis never overlaps.
fn axis_times(min: f32, max: f32, other_min: f32, other_max: f32, velocity: f32) -> Option<(f32, f32)> {
    if velocity > 0.0 {
        Some(((other_min - max) / velocity, (other_max - min) / velocity))
    } else if velocity < 0.0 {
        Some(((other_max - min) / velocity, (other_min - max) / velocity))
    } else if min < other_max && max > other_min {
        Some((f32::NEG_INFINITY, f32::INFINITY))
    } else {
        None
    }
}

fn swept_contact(rect: &Aabb, velocity: Vec2, other: &Aabb) -> Option<Contact> {
    let (x_entry, x_exit) = axis_times(rect.min.x, rect.max.x, other.min.x, other.max.x, velocity.x)?;
    let (y_entry, y_exit) = axis_times(rect.min.y, rect.max.y, other.min.y, other.max.y, velocity.y)?;

    let entry = x_entry.max(y_entry);
    let exit = x_exit.min(y_exit);
    if entry >= exit || !(0.0..=1.0).contains(&entry) {
        return None;
    }

    // Ties go to the vertical axis so corner landings count as ground.
    let (normal, speed) = if y_entry >= x_entry {
        let normal = if velocity.y > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };
        (normal, velocity.y.abs())
    } else {
        let normal = if velocity.x > 0.0 {
            Direction::Left
        } else {
            Direction::Right
        };
        (normal, velocity.x.abs())
    };

    Some(Contact {
        normal,
        time: entry,
        penetration: speed * (1.0 - entry),
    })
}

/// A body touching a surface within the skin width, whatever its velocity.
///
/// Whether a separating body keeps the contact is decided in [`resolve`].
fn resting_contact(rect: &Aabb, other: &Aabb, depth: Vec2, skin: f32) -> Option<Contact> {
    let touching_y = depth.x > 0.0 && depth.y <= 0.0 && depth.y >= -skin;
    let touching_x = depth.y > 0.0 && depth.x <= 0.0 && depth.x >= -skin;
    let center = rect.center();
    let other_center = other.center();

    let normal = if touching_y {
        if center.y < other_center.y {
            Direction::Up
        } else {
            Direction::Down
        }
    } else if touching_x {
        if center.x < other_center.x {
            Direction::Left
        } else {
            Direction::Right
        }
    } else {
        return None;
    };

    Some(Contact {
        normal,
        time: 0.0,
        penetration: 0.0,
    })
}

fn snap_flush(movable: &mut MovableEntity, bounds: &Aabb, normal: Direction) {
    let half = movable.size() * 0.5;
    match normal {
        Direction::Up => movable.position.y = bounds.min.y - half.y,
        Direction::Down => movable.position.y = bounds.max.y + half.y,
        Direction::Left => movable.position.x = bounds.min.x - half.x,
        Direction::Right => movable.position.x = bounds.max.x + half.x,
    }
}

fn set_axis(v: &mut Vec2, axis: Axis, value: f32) {
    match axis {
        Axis::X => v.x = value,
        Axis::Y => v.y = value,
    }
}

/// Runs precompute, query and resolve for one body and commits its position.
///
/// Returns the blocked sides for this tick.
pub(crate) fn move_and_collide(
    movable: &mut MovableEntity,
    world: &CollisionWorld,
    config: &CollisionConfig,
    exclude: Option<ColliderSource>,
) -> DirectionFlags {
    let precalc = precompute(movable, movable.velocity, config);
    let contacts = query_colliders(world, &precalc, exclude);
    let flags = resolve(movable, &precalc, &contacts);
    movable.apply_velocity();
    flags
}

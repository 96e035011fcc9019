//! Fixed-capacity pool of live attack hitboxes.

use glam::Vec2;
use scuffle_common::EntityId;
use tracing::debug;

use crate::action::HitboxWindow;
use crate::combat::HitData;
use crate::geometry::Aabb;

/// A live hitbox anchored to its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Hitbox {
    /// Fighter the hitbox follows and credits
    pub owner: EntityId,
    /// Center offset from the owner, already mirrored for facing
    pub offset: Vec2,
    /// Full size
    pub size: Vec2,
    /// Hit applied on contact
    pub hit: HitData,
    /// Owner's facing when the hitbox opened (+1 right, -1 left)
    pub facing: f32,
    /// Frames left before it expires
    pub remaining: u32,
    already_hit: Vec<EntityId>,
}

impl Hitbox {
    /// Opens a hitbox from an action's window.
    #[must_use]
    pub fn from_window(owner: EntityId, window: &HitboxWindow, facing: f32) -> Self {
        let facing = if facing < 0.0 { -1.0 } else { 1.0 };
        Self {
            owner,
            offset: Vec2::new(window.offset.x * facing, window.offset.y),
            size: window.size,
            hit: window.hit,
            facing,
            remaining: window.active,
            already_hit: Vec::new(),
        }
    }

    /// World-space bounds around the owner's current center.
    #[must_use]
    pub fn bounds(&self, owner_position: Vec2) -> Aabb {
        Aabb::from_center(owner_position + self.offset, self.size * 0.5)
    }

    /// Whether this hitbox already connected with `target`.
    #[must_use]
    pub fn has_hit(&self, target: EntityId) -> bool {
        self.already_hit.contains(&target)
    }

    /// Records a connection so the same swing cannot hit `target` again.
    pub fn mark_hit(&mut self, target: EntityId) {
        if !self.has_hit(target) {
            self.already_hit.push(target);
        }
    }
}

/// Pool of hitbox slots scanned linearly for a free one.
#[derive(Debug, Clone)]
pub struct HitboxPool {
    slots: Vec<Option<Hitbox>>,
}

impl HitboxPool {
    /// Creates a pool with a fixed number of slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Total slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live hitboxes.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Places a hitbox in the first free slot. Returns `false` when full.
    pub fn try_spawn(&mut self, hitbox: Hitbox) -> bool {
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(hitbox);
                true
            },
            None => {
                debug!("Hitbox pool full, dropping hitbox for {}", hitbox.owner);
                false
            },
        }
    }

    /// Live hitboxes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Hitbox> {
        self.slots.iter().flatten()
    }

    /// Mutable access to the hitbox in a slot, if live.
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Hitbox> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Live hitboxes with their slot index.
    pub fn slots(&self) -> impl Iterator<Item = (usize, &Hitbox)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|hitbox| (index, hitbox)))
    }

    /// Counts every hitbox down one frame and frees expired slots.
    pub fn tick(&mut self) {
        for slot in &mut self.slots {
            if let Some(hitbox) = slot {
                hitbox.remaining = hitbox.remaining.saturating_sub(1);
                if hitbox.remaining == 0 {
                    *slot = None;
                }
            }
        }
    }

    /// Frees every hitbox belonging to `owner`.
    pub fn remove_owned_by(&mut self, owner: EntityId) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|hitbox| hitbox.owner == owner) {
                *slot = None;
            }
        }
    }

    /// Frees every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}

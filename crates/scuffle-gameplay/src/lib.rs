//! # Scuffle Gameplay
//!
//! Deterministic simulation core for a platform fighter.
//!
//! This crate provides everything that decides where fighters are and
//! what happens when attacks connect:
//! - Swept AABB collision resolver with per-side contact flags
//! - Movable bodies shared by fighters, platforms and projectiles
//! - Per-fighter action state machine with tagged variants
//! - Hit resolution with combo scaling, hitstun and knockback growth
//! - Fighter definitions and attack resolution tables
//! - Fixed-capacity hitbox and delayed-sound pools
//! - The world tick, kill/respawn pooling and an event bus for presentation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod action;
pub mod audio;
pub mod collision;
pub mod combat;
pub mod config;
pub mod definition;
pub mod events;
pub mod geometry;
pub mod hitbox;
pub mod input;
pub mod movable;
pub mod player;
pub mod world;
pub mod world_object;


/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::*;
    pub use crate::audio::*;
    pub use crate::collision::*;
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::definition::*;
    pub use crate::events::*;
    pub use crate::geometry::*;
    pub use crate::hitbox::*;
    pub use crate::input::*;
    pub use crate::movable::*;
    pub use crate::player::*;
    pub use crate::world::*;
    pub use crate::world_object::*;
}

pub use prelude::*;

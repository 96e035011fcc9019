//! Per-fighter action state machine.
//!
//! Every fighter runs exactly one [`Action`] at a time. An action is a
//! closed variant ([`ActionKind`]) plus a frame counter, a duration taken
//! from the fighter's move data, and a tag set that governs interruption
//! and hurtbox behavior. The [`ActionManager`] owns the active action,
//! advances it one frame per tick and falls back to idle when it ends.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::combat::HitData;

// ============================================================================
// Tags
// ============================================================================

/// Behavior tags attached to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActionTags(u8);

impl ActionTags {
    /// No tags.
    pub const NONE: Self = Self(0);
    /// Carries a hitbox.
    pub const ATTACK: Self = Self(0b0001);
    /// Hurtbox disabled.
    pub const INTANGIBLE: Self = Self(0b0010);
    /// Cannot be replaced until it finishes.
    pub const UNCANCELABLE: Self = Self(0b0100);
    /// Wraps to frame 0 instead of finishing.
    pub const LOOPING: Self = Self(0b1000);

    /// Whether every tag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of both tag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for ActionTags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

// ============================================================================
// Variants
// ============================================================================

/// Closed set of action variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Default looping stance
    Idle,
    /// Crouch before leaving the ground
    JumpStartup,
    /// Wind-up before a dash burst
    DashStartup,
    /// Grounded neutral melee
    GroundNeutral,
    /// Grounded down melee
    GroundDown,
    /// Grounded side melee
    GroundSide,
    /// Aerial neutral melee
    AirNeutral,
    /// Aerial down melee
    AirDown,
    /// Aerial side melee
    AirSide,
}

impl ActionKind {
    /// Every melee variant.
    pub const MELEE: [Self; 6] = [
        Self::GroundNeutral,
        Self::GroundDown,
        Self::GroundSide,
        Self::AirNeutral,
        Self::AirDown,
        Self::AirSide,
    ];

    /// Stable identifier used for animation lookup.
    #[must_use]
    pub const fn move_id(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::JumpStartup => "jump_startup",
            Self::DashStartup => "dash_startup",
            Self::GroundNeutral => "ground_neutral",
            Self::GroundDown => "ground_down",
            Self::GroundSide => "ground_side",
            Self::AirNeutral => "air_neutral",
            Self::AirDown => "air_down",
            Self::AirSide => "air_side",
        }
    }

    /// Tags every instance of this variant carries.
    #[must_use]
    pub const fn default_tags(self) -> ActionTags {
        match self {
            Self::Idle => ActionTags::LOOPING,
            Self::JumpStartup | Self::DashStartup => ActionTags::UNCANCELABLE,
            _ => ActionTags::ATTACK.union(ActionTags::UNCANCELABLE),
        }
    }

    /// Whether this is a melee variant.
    #[must_use]
    pub const fn is_melee(self) -> bool {
        !matches!(self, Self::Idle | Self::JumpStartup | Self::DashStartup)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.move_id())
    }
}

/// Frames during which an attack's hitbox is live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitboxWindow {
    /// Frame the hitbox appears on
    pub start: u32,
    /// Number of frames it stays
    pub active: u32,
    /// Center offset from the owner, for a right-facing owner
    pub offset: Vec2,
    /// Full size
    pub size: Vec2,
    /// Hit applied on contact
    pub hit: HitData,
}

// ============================================================================
// Action
// ============================================================================

/// Result of advancing an action by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// Still running
    Running,
    /// Looping action went back to frame 0
    Wrapped,
    /// Non-looping action reached its duration
    Finished,
}

/// One running action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Variant
    pub kind: ActionKind,
    /// Current frame, 0-based
    pub frame: u32,
    /// Frame count
    pub duration: u32,
    /// Behavior tags
    pub tags: ActionTags,
    /// Hitbox window, for attacks
    pub hitbox: Option<HitboxWindow>,
}

impl Action {
    /// Creates an action at frame 0 with its variant's default tags.
    #[must_use]
    pub fn new(kind: ActionKind, duration: u32) -> Self {
        Self {
            kind,
            frame: 0,
            duration,
            tags: kind.default_tags(),
            hitbox: None,
        }
    }

    /// Adds extra tags.
    #[must_use]
    pub fn with_tags(mut self, tags: ActionTags) -> Self {
        self.tags = self.tags | tags;
        self
    }

    /// Attaches a hitbox window.
    #[must_use]
    pub fn with_hitbox(mut self, window: HitboxWindow) -> Self {
        self.hitbox = Some(window);
        self
    }

    /// Advances one frame.
    ///
    /// A zero-duration action finishes (or wraps, if looping) immediately
    /// without touching the frame counter.
    pub fn update(&mut self) -> ActionStatus {
        let looping = self.tags.contains(ActionTags::LOOPING);
        if self.duration == 0 {
            return if looping {
                ActionStatus::Wrapped
            } else {
                ActionStatus::Finished
            };
        }

        self.frame += 1;
        if self.frame < self.duration {
            return ActionStatus::Running;
        }

        if looping {
            self.frame %= self.duration;
            ActionStatus::Wrapped
        } else {
            self.frame = self.duration;
            ActionStatus::Finished
        }
    }

    /// Whether a new action may replace this one now.
    #[must_use]
    pub fn can_be_interrupted(&self) -> bool {
        !self.tags.contains(ActionTags::UNCANCELABLE) || self.frame >= self.duration
    }

    /// Whether the hurtbox is disabled.
    #[must_use]
    pub fn is_intangible(&self) -> bool {
        self.tags.contains(ActionTags::INTANGIBLE)
    }

    /// Hitbox window opening on the current frame, if any.
    #[must_use]
    pub fn opening_window(&self) -> Option<&HitboxWindow> {
        self.hitbox.as_ref().filter(|window| window.start == self.frame)
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Owns a fighter's single active action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionManager {
    current: Action,
    idle_duration: u32,
}

impl ActionManager {
    /// Creates a manager in idle.
    #[must_use]
    pub fn new(idle_duration: u32) -> Self {
        Self {
            current: Action::new(ActionKind::Idle, idle_duration),
            idle_duration,
        }
    }

    /// The active action.
    #[must_use]
    pub fn current(&self) -> &Action {
        &self.current
    }

    /// Whether the active action is idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.current.kind == ActionKind::Idle
    }

    /// Whether a new action could start now.
    #[must_use]
    pub fn can_start(&self) -> bool {
        self.current.can_be_interrupted()
    }

    /// Starts an action if the active one allows interruption.
    pub fn try_start(&mut self, action: Action) -> bool {
        if !self.can_start() {
            return false;
        }
        self.current = action;
        true
    }

    /// Replaces the active action unconditionally.
    pub fn force(&mut self, action: Action) {
        self.current = action;
    }

    /// Drops back to idle.
    pub fn reset(&mut self) {
        self.current = Action::new(ActionKind::Idle, self.idle_duration);
    }

    /// Advances the active action one frame.
    ///
    /// Returns the kind of a non-looping action that just finished; the
    /// manager is back in idle when this returns `Some`.
    pub fn update(&mut self) -> Option<ActionKind> {
        match self.current.update() {
            ActionStatus::Running | ActionStatus::Wrapped => None,
            ActionStatus::Finished => {
                let finished = self.current.kind;
                self.reset();
                Some(finished)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: u32) -> HitboxWindow {
        HitboxWindow {
            start,
            active: 2,
            offset: Vec2::new(5.0, 0.0),
            size: Vec2::splat(4.0),
            hit: HitData::new(5.0, 0.9),
        }
    }

    #[test]
    fn test_looping_action_wraps_to_zero() {
        let mut action = Action::new(ActionKind::Idle, 5);
        for _ in 0..4 {
            assert_eq!(action.update(), ActionStatus::Running);
        }
        assert_eq!(action.update(), ActionStatus::Wrapped);
        assert_eq!(action.frame, 0);
    }

    #[test]
    fn test_melee_action_terminates() {
        let mut action = Action::new(ActionKind::GroundNeutral, 3);
        action.update();
        action.update();
        assert_eq!(action.update(), ActionStatus::Finished);
        assert_eq!(action.frame, 3);
        assert!(action.can_be_interrupted());
    }

    #[test]
    fn test_zero_duration_is_guarded() {
        let mut looping = Action::new(ActionKind::Idle, 0);
        assert_eq!(looping.update(), ActionStatus::Wrapped);
        assert_eq!(looping.frame, 0);

        let mut once = Action::new(ActionKind::JumpStartup, 0);
        assert_eq!(once.update(), ActionStatus::Finished);
        assert!(once.can_be_interrupted());
    }

    #[test]
    fn test_uncancelable_blocks_replacement() {
        let mut manager = ActionManager::new(10);
        assert!(manager.try_start(Action::new(ActionKind::GroundSide, 4)));
        assert!(!manager.try_start(Action::new(ActionKind::JumpStartup, 3)));
        assert_eq!(manager.current().kind, ActionKind::GroundSide);

        manager.force(Action::new(ActionKind::Idle, 10));
        assert!(manager.is_idle());
    }

    #[test]
    fn test_cancelable_tagless_action_can_be_replaced() {
        let mut manager = ActionManager::new(10);
        assert!(manager.try_start(Action::new(ActionKind::JumpStartup, 3)));
        manager.force(Action {
            tags: ActionTags::NONE,
            ..Action::new(ActionKind::GroundNeutral, 5)
        });
        assert!(manager.try_start(Action::new(ActionKind::DashStartup, 2)));
    }

    #[test]
    fn test_manager_reverts_to_idle() {
        let mut manager = ActionManager::new(8);
        manager.try_start(Action::new(ActionKind::JumpStartup, 2));

        assert_eq!(manager.update(), None);
        assert_eq!(manager.update(), Some(ActionKind::JumpStartup));
        assert!(manager.is_idle());
        assert_eq!(manager.current().duration, 8);
        assert_eq!(manager.current().frame, 0);
    }

    #[test]
    fn test_opening_window_only_on_start_frame() {
        let mut action = Action::new(ActionKind::AirDown, 6).with_hitbox(window(2));
        assert!(action.opening_window().is_none());
        action.update();
        assert!(action.opening_window().is_none());
        action.update();
        assert!(action.opening_window().is_some());
        action.update();
        assert!(action.opening_window().is_none());
    }

    #[test]
    fn test_tags() {
        let tags = ActionKind::AirSide.default_tags();
        assert!(tags.contains(ActionTags::ATTACK));
        assert!(tags.contains(ActionTags::UNCANCELABLE));
        assert!(!tags.contains(ActionTags::LOOPING));

        let action = Action::new(ActionKind::DashStartup, 3).with_tags(ActionTags::INTANGIBLE);
        assert!(action.is_intangible());
        assert_eq!(ActionKind::GroundDown.to_string(), "ground_down");
    }
}

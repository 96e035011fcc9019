//! Event bus from the simulation to presentation layers.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use scuffle_common::EntityId;

use crate::action::ActionKind;

/// Something observable happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Entity entered the world
    EntitySpawned {
        /// Entity ID
        entity_id: EntityId,
    },
    /// Fighter was knocked out or an object despawned
    EntityKilled {
        /// Entity ID
        entity_id: EntityId,
        /// Stocks left after the KO (0 for objects)
        stocks_left: u8,
    },
    /// Fighter started a new action
    ActionStarted {
        /// Entity ID
        entity_id: EntityId,
        /// Action variant
        action: ActionKind,
    },
    /// A hitbox connected
    HitLanded {
        /// Attacker
        attacker: EntityId,
        /// Defender
        defender: EntityId,
        /// Damage actually dealt
        damage: f32,
        /// Whether the defender was shielding
        shielded: bool,
        /// Defender's new velocity
        launch: Vec2,
    },
    /// Fighter touched the ground after being airborne
    Landed {
        /// Entity ID
        entity_id: EntityId,
    },
    /// A combo was reset
    ComboEnded {
        /// Defender
        entity_id: EntityId,
        /// Hits in the combo
        hits: u16,
        /// Scaled damage dealt by the combo
        damage: f32,
    },
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    ///
    /// Never blocks. Returns false if the bus was full and the event was
    /// dropped.
    pub fn publish(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                debug!("Event bus full, dropping {:?}", err.into_inner());
                false
            },
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a receiver handle for an external consumer.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<GameEvent> {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain_in_order() {
        let bus = EventBus::new(8);
        let a = EntityId::from_raw(1);
        bus.publish(GameEvent::EntitySpawned { entity_id: a });
        bus.publish(GameEvent::Landed { entity_id: a });

        assert_eq!(bus.pending_count(), 2);
        assert_eq!(
            bus.drain(),
            vec![
                GameEvent::EntitySpawned { entity_id: a },
                GameEvent::Landed { entity_id: a },
            ]
        );
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(1);
        let a = EntityId::from_raw(1);
        assert!(bus.publish(GameEvent::Landed { entity_id: a }));
        assert!(!bus.publish(GameEvent::EntitySpawned { entity_id: a }));

        assert_eq!(bus.drain(), vec![GameEvent::Landed { entity_id: a }]);
        assert!(bus.publish(GameEvent::EntitySpawned { entity_id: a }));
        assert_eq!(bus.capacity(), 1);
    }
}

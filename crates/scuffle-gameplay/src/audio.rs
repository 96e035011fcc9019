//! Sound requests from the simulation to the audio layer.
//!
//! The simulation only names sounds; mixing and playback happen outside.
//! Requests are fire-and-forget:
//! - `play` queues a sound for this tick
//! - `play_delayed` parks it in a fixed slot pool until its countdown ends
//!
//! Countdowns advance with the simulation tick, so pausing the match
//! also holds delayed sounds.

use ahash::AHashMap;
use scuffle_common::{SimError, SimResult, SoundId};
use tracing::debug;

/// Default number of delayed-sound slots.
pub const DEFAULT_DELAYED_SLOTS: usize = 40;

/// Sounds that can wait for the audio layer to drain them. Further
/// requests are dropped until it does.
pub const READY_CAPACITY: usize = 256;

/// Name to id lookup for registered sounds.
#[derive(Debug, Clone, Default)]
pub struct SoundRegistry {
    ids: AHashMap<String, SoundId>,
    names: Vec<String>,
}

impl SoundRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sound name, returning its id. Re-registering returns the existing id.
    pub fn register(&mut self, name: &str) -> SoundId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = SoundId::new(self.names.len() as u16);
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        id
    }

    /// Looks a name up.
    pub fn id(&self, name: &str) -> SimResult<SoundId> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownSound(name.to_string()))
    }

    /// Name of a registered id.
    #[must_use]
    pub fn name(&self, id: SoundId) -> Option<&str> {
        self.names.get(id.raw() as usize).map(String::as_str)
    }

    /// Number of registered sounds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DelayedSound {
    sound: SoundId,
    remaining: u32,
}

/// Per-world sound request queue.
#[derive(Debug, Clone)]
pub struct AudioQueue {
    registry: SoundRegistry,
    ready: Vec<SoundId>,
    delayed: Vec<Option<DelayedSound>>,
}

impl Default for AudioQueue {
    fn default() -> Self {
        Self::new(DEFAULT_DELAYED_SLOTS)
    }
}

impl AudioQueue {
    /// Creates a queue with a fixed number of delayed slots.
    #[must_use]
    pub fn new(delayed_slots: usize) -> Self {
        Self {
            registry: SoundRegistry::new(),
            ready: Vec::with_capacity(READY_CAPACITY),
            delayed: vec![None; delayed_slots],
        }
    }

    /// Sound registry.
    #[must_use]
    pub fn registry(&self) -> &SoundRegistry {
        &self.registry
    }

    /// Registers a sound name.
    pub fn register(&mut self, name: &str) -> SoundId {
        self.registry.register(name)
    }

    /// Requests a sound now.
    ///
    /// The request is dropped if [`READY_CAPACITY`] sounds are already
    /// waiting to be drained.
    pub fn play(&mut self, name: &str) -> SimResult<()> {
        let sound = self.registry.id(name)?;
        push_ready(&mut self.ready, sound);
        Ok(())
    }

    /// Requests a sound after `ticks` simulation ticks.
    ///
    /// Returns `Ok(false)` and leaves every slot untouched when the pool
    /// is full. A zero delay plays immediately.
    pub fn play_delayed(&mut self, name: &str, ticks: u32) -> SimResult<bool> {
        let sound = self.registry.id(name)?;
        if ticks == 0 {
            return Ok(push_ready(&mut self.ready, sound));
        }

        let Some(slot) = self.delayed.iter_mut().find(|slot| slot.is_none()) else {
            debug!("Delayed sound pool full, dropping '{}'", name);
            return Ok(false);
        };
        *slot = Some(DelayedSound {
            sound,
            remaining: ticks,
        });
        Ok(true)
    }

    /// Counts delayed sounds down one tick; expired ones become ready.
    pub fn tick(&mut self) {
        for slot in &mut self.delayed {
            if let Some(delayed) = slot {
                delayed.remaining -= 1;
                if delayed.remaining == 0 {
                    push_ready(&mut self.ready, delayed.sound);
                    *slot = None;
                }
            }
        }
    }

    /// Takes every sound due this tick, in request order.
    pub fn drain_ready(&mut self) -> Vec<SoundId> {
        std::mem::take(&mut self.ready)
    }

    /// Delayed sounds still waiting.
    #[must_use]
    pub fn pending_delayed(&self) -> usize {
        self.delayed.iter().flatten().count()
    }

    /// Total delayed slots.
    #[must_use]
    pub fn delayed_capacity(&self) -> usize {
        self.delayed.len()
    }

    /// Drops every queued and delayed request, keeping registrations.
    pub fn clear(&mut self) {
        self.ready.clear();
        self.delayed.iter_mut().for_each(|slot| *slot = None);
    }
}

fn push_ready(ready: &mut Vec<SoundId>, sound: SoundId) -> bool {
    if ready.len() >= READY_CAPACITY {
        debug!("Sound queue full, dropping {:?}", sound);
        return false;
    }
    ready.push(sound);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sound_is_error() {
        let mut audio = AudioQueue::default();
        assert_eq!(
            audio.play("missing"),
            Err(SimError::UnknownSound("missing".to_string()))
        );
        assert!(audio.play_delayed("missing", 3).is_err());
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = SoundRegistry::new();
        let a = registry.register("hit");
        let b = registry.register("ko");
        assert_eq!(registry.register("hit"), a);
        assert_ne!(a, b);
        assert_eq!(registry.name(b), Some("ko"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_delayed_sound_fires_after_countdown() {
        let mut audio = AudioQueue::default();
        let hit = audio.register("hit");

        assert_eq!(audio.play_delayed("hit", 3), Ok(true));
        audio.tick();
        audio.tick();
        assert!(audio.drain_ready().is_empty());
        audio.tick();
        assert_eq!(audio.drain_ready(), vec![hit]);
        assert_eq!(audio.pending_delayed(), 0);
    }

    #[test]
    fn test_immediate_and_zero_delay() {
        let mut audio = AudioQueue::default();
        let hit = audio.register("hit");
        audio.play("hit").expect("play");
        assert_eq!(audio.play_delayed("hit", 0), Ok(true));
        assert_eq!(audio.drain_ready(), vec![hit, hit]);
        assert!(audio.drain_ready().is_empty());
    }

    #[test]
    fn test_full_pool_rejects_and_keeps_slots() {
        let mut audio = AudioQueue::default();
        audio.register("hit");
        for _ in 0..DEFAULT_DELAYED_SLOTS {
            assert_eq!(audio.play_delayed("hit", 10), Ok(true));
        }
        let before = audio.delayed.clone();

        assert_eq!(audio.play_delayed("hit", 1), Ok(false));
        assert_eq!(audio.delayed, before);
        assert_eq!(audio.pending_delayed(), DEFAULT_DELAYED_SLOTS);
    }

    #[test]
    fn test_undrained_sounds_are_capped() {
        let mut audio = AudioQueue::default();
        let hit = audio.register("hit");
        for _ in 0..READY_CAPACITY + 10 {
            audio.play("hit").expect("play");
        }
        assert_eq!(audio.play_delayed("hit", 0), Ok(false));
        assert_eq!(audio.play_delayed("hit", 1), Ok(true));
        audio.tick();

        let ready = audio.drain_ready();
        assert_eq!(ready.len(), READY_CAPACITY);
        assert!(ready.iter().all(|sound| *sound == hit));
        assert_eq!(audio.pending_delayed(), 0);

        audio.play("hit").expect("play");
        assert_eq!(audio.drain_ready(), vec![hit]);
    }
}

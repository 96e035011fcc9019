//! Match statistics and the end-of-run summary.

use scuffle_gameplay::{GameEvent, World};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters fed from the world's event bus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchStats {
    /// Actions started
    pub actions_started: u64,
    /// Hits that connected
    pub hits_landed: u64,
    /// Hits absorbed by a shield
    pub hits_shielded: u64,
    /// Damage dealt by all hits
    pub damage_dealt: f64,
    /// Stocks lost
    pub knockouts: u64,
    /// Landings after being airborne
    pub landings: u64,
    /// Combos that ended
    pub combos: u64,
    /// Most hits in one combo
    pub longest_combo: u16,
    /// Most damage in one combo
    pub heaviest_combo: f32,
}

impl MatchStats {
    /// Creates new empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event.
    pub fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::ActionStarted { .. } => self.actions_started += 1,
            GameEvent::HitLanded {
                damage, shielded, ..
            } => {
                if *shielded {
                    self.hits_shielded += 1;
                } else {
                    self.hits_landed += 1;
                    self.damage_dealt += f64::from(*damage);
                }
            },
            GameEvent::Landed { .. } => self.landings += 1,
            GameEvent::ComboEnded { hits, damage, .. } => {
                self.combos += 1;
                self.longest_combo = self.longest_combo.max(*hits);
                self.heaviest_combo = self.heaviest_combo.max(*damage);
            },
            GameEvent::EntitySpawned { .. } | GameEvent::EntityKilled { .. } => {},
        }
    }

    /// Records a fighter losing a stock. Kill events alone cannot tell
    /// fighters from despawned objects, so the runner calls this.
    pub fn record_knockout(&mut self) {
        self.knockouts += 1;
    }
}

/// End state of one fighter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FighterSummary {
    /// Entity id
    pub id: u16,
    /// Definition name
    pub name: String,
    /// Controller port
    pub port: u8,
    /// Team
    pub team: u8,
    /// Stocks left
    pub stocks: u8,
    /// Accumulated damage
    pub damage: f32,
    /// Final center position
    pub position: [f32; 2],
}

/// Everything printed at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    /// Ticks simulated
    pub ticks: u64,
    /// Fighters still in the match, in port order
    pub fighters: Vec<FighterSummary>,
    /// Event counters
    pub stats: MatchStats,
    /// Sounds requested, by name
    pub sounds: BTreeMap<String, u64>,
}

impl MatchSummary {
    /// Snapshots the world at the end of a run.
    #[must_use]
    pub fn collect(world: &World, stats: MatchStats, sounds: BTreeMap<String, u64>) -> Self {
        let mut fighters: Vec<FighterSummary> = world
            .players()
            .iter()
            .map(|player| FighterSummary {
                id: player.id().raw(),
                name: world
                    .definitions()
                    .get(player.definition())
                    .map_or_else(|_| player.definition().to_string(), |def| def.name.clone()),
                port: player.port(),
                team: player.team(),
                stocks: player.stocks(),
                damage: player.health().damage(),
                position: player.position().to_array(),
            })
            .collect();
        fighters.sort_by_key(|fighter| fighter.port);

        Self {
            ticks: world.tick_count(),
            fighters,
            stats,
            sounds,
        }
    }

    /// Team of the last fighters standing, once only one team is left.
    #[must_use]
    pub fn winning_team(&self) -> Option<u8> {
        let first = self.fighters.first()?.team;
        self.fighters
            .iter()
            .all(|fighter| fighter.team == first)
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use scuffle_common::EntityId;
    use scuffle_gameplay::{DefinitionRegistry, SimConfig};

    fn id(raw: u16) -> EntityId {
        EntityId::from_raw(raw)
    }

    #[test]
    fn test_stats_record_hits() {
        let mut stats = MatchStats::new();
        stats.record(&GameEvent::HitLanded {
            attacker: id(1),
            defender: id(2),
            damage: 6.0,
            shielded: false,
            launch: Vec2::X,
        });
        stats.record(&GameEvent::HitLanded {
            attacker: id(2),
            defender: id(1),
            damage: 0.0,
            shielded: true,
            launch: Vec2::X,
        });

        assert_eq!(stats.hits_landed, 1);
        assert_eq!(stats.hits_shielded, 1);
        assert!((stats.damage_dealt - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_track_longest_combo() {
        let mut stats = MatchStats::new();
        for (hits, damage) in [(2, 11.4), (4, 20.0), (3, 25.5)] {
            stats.record(&GameEvent::ComboEnded {
                entity_id: id(1),
                hits,
                damage,
            });
        }

        assert_eq!(stats.combos, 3);
        assert_eq!(stats.longest_combo, 4);
        assert_eq!(stats.heaviest_combo, 25.5);
    }

    #[test]
    fn test_summary_lists_fighters_by_port() {
        let registry = DefinitionRegistry::with_builtins().expect("builtins");
        let mut world = World::new(SimConfig::default(), registry);
        world
            .spawn_player(DefinitionRegistry::ZONER, 1, 1)
            .expect("spawn");
        world
            .spawn_player(DefinitionRegistry::BRAWLER, 0, 0)
            .expect("spawn");

        let summary = MatchSummary::collect(&world, MatchStats::new(), BTreeMap::new());

        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.fighters[0].name, "brawler");
        assert_eq!(summary.fighters[1].name, "zoner");
        assert_eq!(summary.fighters[1].position, [60.0, -40.0]);
        assert_eq!(summary.winning_team(), None);

        let json = serde_json::to_string(&summary).expect("json");
        assert!(json.contains("\"longest_combo\":0"));
    }

    #[test]
    fn test_single_team_wins() {
        let summary = MatchSummary {
            ticks: 10,
            fighters: vec![FighterSummary {
                id: 1,
                name: "brawler".to_string(),
                port: 0,
                team: 3,
                stocks: 1,
                damage: 42.0,
                position: [0.0, 0.0],
            }],
            stats: MatchStats::new(),
            sounds: BTreeMap::new(),
        };
        assert_eq!(summary.winning_team(), Some(3));
    }
}

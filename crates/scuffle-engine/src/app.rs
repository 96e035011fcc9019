//! Headless match runner.
//!
//! Builds a world from the engine config, drives every fighter from its
//! input script and collects the summary printed at exit.

use anyhow::{Context, Result};
use scuffle_common::{DefinitionId, EntityId};
use scuffle_gameplay::{DefinitionRegistry, FighterDefinition, GameEvent, World};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::script::{InputScript, ScriptPlayer};
use crate::summary::{MatchStats, MatchSummary};

/// Built-in definitions plus any configured RON files.
pub fn load_definitions(config: &EngineConfig) -> Result<DefinitionRegistry> {
    let mut registry = DefinitionRegistry::with_builtins()?;

    for file in &config.definitions {
        let source = std::fs::read_to_string(&file.path)
            .with_context(|| format!("Failed to read definition {}", file.path.display()))?;
        let definition = FighterDefinition::from_ron(&source)
            .with_context(|| format!("Invalid definition {}", file.path.display()))?;
        info!("Loaded fighter '{}' as id {}", definition.name, file.id);
        registry.register(DefinitionId::new(file.id), definition)?;
    }

    Ok(registry)
}

/// Runs one match to completion.
///
/// The match stops after `config.ticks` ticks, or earlier once a single
/// fighter is left out of several.
pub fn run(config: &EngineConfig) -> Result<MatchSummary> {
    let definitions = load_definitions(config)?;
    let mut world = World::new(config.sim.clone(), definitions);
    let mut scripts = ScriptPlayer::new();
    let mut fighters: Vec<EntityId> = Vec::with_capacity(config.fighters.len());

    for (index, slot) in config.fighters.iter().enumerate() {
        let port = u8::try_from(index).context("Too many fighters")?;
        let id = world.spawn_player(slot.definition_id(), port, slot.team)?;
        let script = match &slot.script {
            Some(path) => InputScript::load(path)?,
            None => InputScript::demo(port),
        };
        debug!("{} on port {} runs script '{}'", id, port, script.name);
        scripts.assign(port, &script);
        fighters.push(id);
    }

    let mut stats = MatchStats::new();
    let mut sounds: BTreeMap<String, u64> = BTreeMap::new();
    let mut scripts_done = false;

    for _ in 0..config.ticks {
        let frame = scripts.advance();
        world.tick(&frame)?;
        if !scripts_done && scripts.is_finished() {
            debug!("Input scripts finished at tick {}", world.tick_count());
            scripts_done = true;
        }

        for event in world.events().drain() {
            if let GameEvent::EntityKilled { entity_id, .. } = &event {
                if fighters.contains(entity_id) {
                    stats.record_knockout();
                }
            }
            stats.record(&event);
        }
        for sound in world.drain_sounds() {
            let name = world.audio().registry().name(sound).unwrap_or("unknown");
            *sounds.entry(name.to_string()).or_default() += 1;
        }

        if fighters.len() > 1 && world.players().len() <= 1 {
            info!("Match decided after {} ticks", world.tick_count());
            break;
        }
    }

    Ok(MatchSummary::collect(&world, stats, sounds))
}

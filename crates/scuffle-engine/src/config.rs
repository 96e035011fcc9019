//! Engine configuration.
//!
//! Wraps the simulation rules together with the match setup used by the
//! headless runner. Configuration can be loaded from and saved to a TOML file.

use scuffle_common::DefinitionId;
use scuffle_gameplay::{DefinitionRegistry, SimConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "scuffle.toml";

/// Log directive used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "scuffle=info";

/// One fighter entering the match. Fighters take ports in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterSlot {
    /// Definition id
    pub definition: u32,
    /// Team
    #[serde(default)]
    pub team: u8,
    /// JSON input script; the built-in demo script drives the fighter when unset
    #[serde(default)]
    pub script: Option<PathBuf>,
}

impl FighterSlot {
    /// Typed definition id.
    #[must_use]
    pub fn definition_id(&self) -> DefinitionId {
        DefinitionId::new(self.definition)
    }
}

/// Extra fighter definition read from a RON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionFile {
    /// Id the definition is registered under
    pub id: u32,
    /// RON file path
    pub path: PathBuf,
}

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Run Settings ===
    /// Ticks to simulate
    pub ticks: u32,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,

    // === Match Settings ===
    /// Fighters, one per port
    pub fighters: Vec<FighterSlot>,
    /// Definitions loaded on top of the built-in ones
    pub definitions: Vec<DefinitionFile>,

    // === Simulation Rules ===
    /// Stage, pools and match rules
    pub sim: SimConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ticks: 600, // 10 seconds at 60 Hz
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            fighters: vec![
                FighterSlot {
                    definition: DefinitionRegistry::BRAWLER.raw(),
                    team: 0,
                    script: None,
                },
                FighterSlot {
                    definition: DefinitionRegistry::ZONER.raw(),
                    team: 1,
                    script: None,
                },
            ],
            definitions: Vec::new(),
            sim: SimConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file in the working directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.sim.validate();
        self.ticks = self.ticks.clamp(1, 1_000_000);

        if self.log_filter.trim().is_empty() {
            self.log_filter = DEFAULT_LOG_FILTER.to_string();
        }

        let ports = self.sim.spawn_points.len().min(usize::from(u8::MAX));
        if self.fighters.len() > ports {
            warn!(
                "{} fighters configured but only {} spawn points, dropping the rest",
                self.fighters.len(),
                ports
            );
            self.fighters.truncate(ports);
        }
        if self.fighters.is_empty() {
            warn!("No fighters configured");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.ticks, 600);
        assert_eq!(config.log_filter, "scuffle=info");
        assert_eq!(config.fighters.len(), 2);
        assert_eq!(config.fighters[1].definition_id(), DefinitionRegistry::ZONER);
        assert!(config.definitions.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig {
            ticks: 0,
            log_filter: "  ".to_string(),
            ..EngineConfig::default()
        };
        config.sim.spawn_points = vec![Vec2::ZERO];
        config.sim.hitbox_capacity = 0;

        config.validate();

        assert_eq!(config.ticks, 1);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.fighters.len(), 1);
        assert_eq!(config.sim.hitbox_capacity, 1);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("scuffle.toml");

        let mut config = EngineConfig::default();
        config.ticks = 1200;
        config.sim.friendly_fire = true;
        config.sim.default_stocks = 5;
        config.fighters[0].script = Some(PathBuf::from("scripts/p1.json"));
        config.definitions.push(DefinitionFile {
            id: 7,
            path: PathBuf::from("fighters/heavy.ron"),
        });

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/scuffle.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "ticks = \"lots\"").expect("write");

        let config = EngineConfig::load_from(&config_path);
        assert_eq!(config.ticks, 600);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            ticks = 90

            [[fighters]]
            definition = 1

            [sim]
            default_stocks = 1
            "#,
        )
        .expect("parse");

        assert_eq!(config.ticks, 90);
        assert_eq!(config.fighters.len(), 1);
        assert_eq!(config.fighters[0].team, 0);
        assert_eq!(config.sim.default_stocks, 1);
        assert_eq!(config.sim.delayed_sound_capacity, 40);
    }
}

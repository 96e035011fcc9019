//! Scripted controller input for headless matches.
//!
//! A script is a list of tick-based actions for one port:
//! - hold buttons for a number of ticks
//! - tap buttons (press for one tick, release for one)
//! - wait with nothing held
//! - repeat a nested block
//!
//! Scripts can be loaded from JSON files or built programmatically.

use anyhow::{Context, Result};
use scuffle_gameplay::{Button, ButtonSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info};

/// A single scripted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Hold nothing
    Wait {
        /// Duration in ticks
        ticks: u32,
    },

    /// Hold a set of buttons
    Hold {
        /// Buttons held together
        buttons: Vec<Button>,
        /// Duration in ticks
        ticks: u32,
    },

    /// Press for one tick, then release for one tick
    Tap {
        /// Buttons pressed together
        buttons: Vec<Button>,
    },

    /// Repeat a block of actions
    Repeat {
        /// Number of repetitions
        count: u32,
        /// Actions to repeat
        actions: Vec<ScriptAction>,
    },

    /// Log a message when reached
    Log {
        /// Message to log
        message: String,
    },
}

impl ScriptAction {
    /// Whether playing this step holds at least one tick.
    fn takes_ticks(&self) -> bool {
        match self {
            Self::Wait { ticks } | Self::Hold { ticks, .. } => *ticks > 0,
            Self::Tap { .. } => true,
            Self::Repeat { count, actions } => {
                *count > 0 && actions.iter().any(Self::takes_ticks)
            },
            Self::Log { .. } => false,
        }
    }
}

/// A named script for one port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputScript {
    /// Script name
    pub name: String,
    /// What the script does
    #[serde(default)]
    pub description: Option<String>,
    /// Steps in order
    pub actions: Vec<ScriptAction>,
}

impl InputScript {
    /// Loads a script from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script file {}", path.display()))?;
        let script: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse script JSON {}", path.display()))?;
        info!("Loaded script '{}' with {} actions", script.name, script.actions.len());
        Ok(script)
    }

    /// Built-in script: walk toward the centre, then cycle through attacks,
    /// jumps and shields.
    #[must_use]
    pub fn demo(port: u8) -> Self {
        let toward = if port % 2 == 0 { Button::Right } else { Button::Left };
        let hold = |buttons: &[Button], ticks| ScriptAction::Hold {
            buttons: buttons.to_vec(),
            ticks,
        };

        Self {
            name: format!("demo-{port}"),
            description: Some("approach and trade blows".to_string()),
            actions: vec![
                ScriptAction::Wait { ticks: 20 + u32::from(port) * 7 },
                hold(&[toward], 18),
                ScriptAction::Repeat {
                    count: 12,
                    actions: vec![
                        ScriptAction::Tap {
                            buttons: vec![Button::Attack],
                        },
                        ScriptAction::Wait { ticks: 12 },
                        hold(&[toward, Button::Attack], 1),
                        ScriptAction::Wait { ticks: 22 },
                        hold(&[Button::Jump], 4),
                        hold(&[Button::Down, Button::Attack], 1),
                        ScriptAction::Wait { ticks: 25 },
                        hold(&[Button::Shield], 15),
                        hold(&[toward], 8),
                    ],
                },
            ],
        }
    }
}

/// Plays one script, one tick at a time.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    queue: VecDeque<ScriptAction>,
    held: ButtonSet,
    remaining: u32,
}

impl ScriptRunner {
    /// Creates a runner at the start of `script`.
    #[must_use]
    pub fn new(script: &InputScript) -> Self {
        Self {
            queue: script.actions.iter().cloned().collect(),
            held: ButtonSet::EMPTY,
            remaining: 0,
        }
    }

    /// Whether every step has been played.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining == 0 && self.queue.is_empty()
    }

    /// Buttons held on the next tick. A finished script holds nothing.
    pub fn next_frame(&mut self) -> ButtonSet {
        while self.remaining == 0 {
            let Some(action) = self.queue.pop_front() else {
                return ButtonSet::EMPTY;
            };
            self.start(action);
        }
        self.remaining -= 1;
        self.held
    }

    fn start(&mut self, action: ScriptAction) {
        match action {
            ScriptAction::Wait { ticks } => {
                self.held = ButtonSet::EMPTY;
                self.remaining = ticks;
            },
            ScriptAction::Hold { buttons, ticks } => {
                self.held = buttons.into_iter().collect();
                self.remaining = ticks;
            },
            ScriptAction::Tap { buttons } => {
                self.queue.push_front(ScriptAction::Wait { ticks: 1 });
                self.held = buttons.into_iter().collect();
                self.remaining = 1;
            },
            ScriptAction::Repeat { count, actions } => {
                if count == 0 {
                    return;
                }
                // One pass at a time; a block that never takes a tick runs once.
                if count > 1 && actions.iter().any(ScriptAction::takes_ticks) {
                    self.queue.push_front(ScriptAction::Repeat {
                        count: count - 1,
                        actions: actions.clone(),
                    });
                }
                for action in actions.into_iter().rev() {
                    self.queue.push_front(action);
                }
            },
            ScriptAction::Log { message } => {
                debug!("Script: {}", message);
            },
        }
    }
}

/// Runners for every port in the match.
#[derive(Debug, Clone, Default)]
pub struct ScriptPlayer {
    runners: Vec<Option<ScriptRunner>>,
}

impl ScriptPlayer {
    /// Creates a player with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a script to a port, replacing any previous one.
    pub fn assign(&mut self, port: u8, script: &InputScript) {
        let index = usize::from(port);
        if self.runners.len() <= index {
            self.runners.resize(index + 1, None);
        }
        self.runners[index] = Some(ScriptRunner::new(script));
    }

    /// Whether every assigned script has been played.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.runners.iter().flatten().all(ScriptRunner::is_finished)
    }

    /// Input for the next tick, indexed by port.
    pub fn advance(&mut self) -> Vec<ButtonSet> {
        self.runners
            .iter_mut()
            .map(|runner| runner.as_mut().map_or(ButtonSet::EMPTY, ScriptRunner::next_frame))
            .collect()
    }
}

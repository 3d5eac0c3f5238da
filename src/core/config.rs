/// Engine configuration — routing probability, extreme moods, capacities.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::core::template::ReplacementTable;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("ai_probability must be within [0, 1], got {0}")]
    Probability(f64),
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
    #[error("replacements.{0} is empty but the catalog uses it")]
    EmptyReplacements(&'static str),
}

/// Tunable engine behaviour, loadable from RON.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chance that a request with no other reason to go generative does so.
    pub ai_probability: f64,
    /// Mood ids that always go to the generative provider first.
    pub extreme_moods: Vec<String>,
    pub ledger_capacity: usize,
    pub history_capacity: usize,
    pub provider_timeout_ms: u64,
    /// Rationale used when the provider returns none.
    pub default_rationale: String,
    pub replacements: ReplacementTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ai_probability: 0.3,
            extreme_moods: ["lethargic", "overwhelmed", "depressed", "anxious"]
                .into_iter()
                .map(String::from)
                .collect(),
            ledger_capacity: 15,
            history_capacity: 50,
            provider_timeout_ms: 15_000,
            default_rationale:
                "Designed just for you after reading how you feel right now.".to_string(),
            replacements: ReplacementTable::default(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn with_ai_probability(mut self, probability: f64) -> Self {
        self.ai_probability = probability;
        self
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.ai_probability) {
            return Err(ConfigError::Probability(self.ai_probability));
        }
        if self.ledger_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("ledger_capacity"));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("history_capacity"));
        }
        Ok(())
    }
}

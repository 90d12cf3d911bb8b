//! 🜂 Orpheus system configuration
//!
//! Manages every tunable of the engine:
//! - State and ledger locations
//! - Session commands and memory capacity
//! - The optional LLM collaborator

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/orpheus.toml";

/// Main system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Directory holding one state file per conversation
    pub data_dir: String,
    /// Word that prefixes session commands
    pub wake_word: String,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// JSON phrase book replacing the built-in one
    pub phrasebook_path: Option<String>,
    /// Plain-text reflective corpus, one line per reflection
    pub reflections_path: Option<String>,
    pub max_memories: usize,
    pub log_level: String,
    pub oracle: OracleConfig,
    pub budget: BudgetConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            wake_word: "orpheus".to_string(),
            seed: None,
            phrasebook_path: None,
            reflections_path: None,
            max_memories: crate::demiurge::persona::DEFAULT_MAX_MEMORIES,
            log_level: "info".to_string(),
            oracle: OracleConfig::default(),
            budget: BudgetConfig::default(),
        }
    }
}

/// LLM collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub enabled: bool,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 200,
            temperature: 0.85,
            timeout_secs: 20,
        }
    }
}

/// Monthly token budget for the collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub monthly_tokens: u64,
    /// Relative paths resolve under `data_dir`
    pub ledger_file: String,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            monthly_tokens: crate::priests::budget::DEFAULT_MONTHLY_BUDGET,
            ledger_file: "token_usage.json".to_string(),
        }
    }
}

impl SystemConfig {
    /// Loads `config/orpheus.toml`, writing the defaults there on first run
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: SystemConfig = toml::from_str(&content)
                .with_context(|| format!("Invalid config {}", config_path.display()))?;
            Ok(config)
        } else {
            if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let default_config = SystemConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_path, toml_content)?;

            tracing::info!(path = %config_path.display(), "wrote default configuration");
            Ok(default_config)
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.wake_word.trim().is_empty() {
            anyhow::bail!("Wake word cannot be empty");
        }

        if self.data_dir.trim().is_empty() {
            anyhow::bail!("Data directory is not set");
        }

        if self.max_memories == 0 {
            anyhow::bail!("max_memories must be > 0");
        }

        if self.oracle.timeout_secs == 0 {
            anyhow::bail!("Oracle timeout must be > 0 seconds");
        }

        if !(0.0..=1.0).contains(&self.oracle.temperature) {
            anyhow::bail!("Oracle temperature must be within [0, 1]");
        }

        Ok(())
    }

    /// Ledger location, resolved against the data directory
    pub fn ledger_path(&self) -> std::path::PathBuf {
        let file = Path::new(&self.budget.ledger_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            Path::new(&self.data_dir).join(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wake_word, "orpheus");
        assert_eq!(config.max_memories, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SystemConfig::default();
        config.wake_word = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.max_memories = 0;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.oracle.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("orpheus.toml");

        let config = SystemConfig::load_from(&path).unwrap();
        assert_eq!(config, SystemConfig::default());
        assert!(path.exists());
        assert_eq!(SystemConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orpheus.toml");
        std::fs::write(
            &path,
            "wake_word = \"muse\"\nseed = 7\n\n[oracle]\nenabled = false\n",
        )
        .unwrap();

        let config = SystemConfig::load_from(&path).unwrap();
        assert_eq!(config.wake_word, "muse");
        assert_eq!(config.seed, Some(7));
        assert!(!config.oracle.enabled);
        assert_eq!(config.oracle.max_tokens, 200);
        assert_eq!(config.budget.monthly_tokens, 10_000_000);
    }

    #[test]
    fn test_ledger_path() {
        let config = SystemConfig::default();
        assert_eq!(
            config.ledger_path(),
            Path::new("data").join("token_usage.json")
        );
    }
}

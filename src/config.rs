//! Configuration for a dvhcheck workspace.
//!
//! Settings live in a `dvhcheck.yml` in the working directory, with a
//! per-user fallback under the platform config dir. Every field has a
//! default, so running without any config file at all is fine.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::matching::{MatchTuning, SCORE_THRESHOLD, WEIGHT_PARTIAL, WEIGHT_SIMPLE};
use crate::paths;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory scanned for `.scp` protocol files.
    #[serde(default = "default_protocol_dir")]
    pub protocol_dir: PathBuf,
    /// Structure alias persistence file.
    #[serde(default = "default_aliases_file")]
    pub aliases_file: PathBuf,
    /// Directory scanned for plan snapshot exports.
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: PathBuf,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_weight_simple")]
    pub weight_simple: f64,
    #[serde(default = "default_weight_partial")]
    pub weight_partial: f64,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol_dir: default_protocol_dir(),
            aliases_file: default_aliases_file(),
            inbox_dir: default_inbox_dir(),
            matching: MatchingConfig::default(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weight_simple: default_weight_simple(),
            weight_partial: default_weight_partial(),
            score_threshold: default_score_threshold(),
        }
    }
}

impl MatchingConfig {
    pub fn tuning(&self) -> MatchTuning {
        MatchTuning {
            weight_simple: self.weight_simple,
            weight_partial: self.weight_partial,
            score_threshold: self.score_threshold,
        }
    }
}

impl Config {
    /// Load the project config, falling back to the user-level config,
    /// falling back to defaults.
    pub fn load() -> Result<Self> {
        let project = Path::new(paths::CONFIG_FILE);
        if project.exists() {
            return Self::load_from(project);
        }
        if let Some(global) = global_config_path() {
            if global.exists() {
                return Self::load_from(&global);
            }
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.matching.weight_simple <= 0.0 || self.matching.weight_partial <= 0.0 {
            anyhow::bail!("matching weights must be positive");
        }
        if !(0.0..=1.0).contains(&self.matching.score_threshold) {
            anyhow::bail!("matching.score_threshold must be between 0 and 1");
        }
        Ok(())
    }
}

/// Path to the user-level config file, e.g.
/// `~/.config/dvhcheck/config.yml` on Linux.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dvhcheck/config.yml"))
}

fn default_protocol_dir() -> PathBuf {
    PathBuf::from(paths::PROTOCOL_DIR)
}

fn default_aliases_file() -> PathBuf {
    PathBuf::from(paths::ALIASES_FILE)
}

fn default_inbox_dir() -> PathBuf {
    PathBuf::from(paths::INBOX_DIR)
}

fn default_weight_simple() -> f64 {
    WEIGHT_SIMPLE
}

fn default_weight_partial() -> f64 {
    WEIGHT_PARTIAL
}

fn default_score_threshold() -> f64 {
    SCORE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.protocol_dir, PathBuf::from("protocols"));
        assert_eq!(config.matching.weight_simple, WEIGHT_SIMPLE);
        assert_eq!(config.matching.weight_partial, WEIGHT_PARTIAL);
        assert_eq!(config.matching.score_threshold, SCORE_THRESHOLD);
    }

    #[test]
    fn test_partial_override() {
        let config =
            Config::parse("protocol_dir: /data/protocols\nmatching:\n  score_threshold: 0.5\n")
                .unwrap();
        assert_eq!(config.protocol_dir, PathBuf::from("/data/protocols"));
        assert_eq!(config.matching.score_threshold, 0.5);
        // Untouched fields keep their defaults.
        assert_eq!(config.matching.weight_partial, WEIGHT_PARTIAL);
        assert_eq!(config.inbox_dir, PathBuf::from("inbox"));
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        assert!(Config::parse("matching:\n  score_threshold: 1.5\n").is_err());
        assert!(Config::parse("matching:\n  weight_simple: -1\n").is_err());
    }

    #[test]
    fn test_tuning_mirrors_config() {
        let config = Config::parse("matching:\n  weight_partial: 0.8\n").unwrap();
        let tuning = config.matching.tuning();
        assert_eq!(tuning.weight_partial, 0.8);
        assert_eq!(tuning.weight_simple, WEIGHT_SIMPLE);
    }
}

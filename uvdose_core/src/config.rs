//! Configuration file support for uvdose.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/uvdose/config.toml`.

use crate::evaluator::DEFAULT_PRECISION_SECONDS;
use crate::{CoveragePolicy, Error, MedTable, Result, SafetyMargin, SkinClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// MED overrides in SED, keyed by skin class ("I".."VI")
    #[serde(default)]
    pub med: BTreeMap<String, f64>,
}

/// Defaults for each evaluation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_skin_class")]
    pub skin_class: SkinClass,

    #[serde(default = "default_margin")]
    pub margin: f64,

    #[serde(default = "default_precision_seconds")]
    pub precision_seconds: i64,

    #[serde(default)]
    pub insufficient_coverage: CoveragePolicy,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            skin_class: default_skin_class(),
            margin: default_margin(),
            precision_seconds: default_precision_seconds(),
            insufficient_coverage: CoveragePolicy::default(),
        }
    }
}

// Default value functions
fn default_skin_class() -> SkinClass {
    SkinClass::III
}

fn default_margin() -> f64 {
    1.0
}

fn default_precision_seconds() -> i64 {
    DEFAULT_PRECISION_SECONDS
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("uvdose").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Configured safety margin, validated
    pub fn margin(&self) -> Result<SafetyMargin> {
        SafetyMargin::new(self.evaluation.margin)
    }

    /// Reference MED table with the `[med]` overrides applied
    pub fn med_table(&self) -> Result<MedTable> {
        self.med
            .iter()
            .try_fold(MedTable::reference(), |table, (class, med)| {
                table.with_override(class.parse()?, *med)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.evaluation.skin_class, SkinClass::III);
        assert_eq!(config.evaluation.margin, 1.0);
        assert_eq!(config.evaluation.precision_seconds, 60);
        assert_eq!(
            config.evaluation.insufficient_coverage,
            CoveragePolicy::AssumeSafe
        );
        assert_eq!(config.med_table().unwrap(), MedTable::reference());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.med.insert("II".into(), 3.0);
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.evaluation.skin_class, parsed.evaluation.skin_class);
        assert_eq!(config.med, parsed.med);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[evaluation]
skin_class = "II"
insufficient_coverage = "fail"

[med]
II = 3.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.evaluation.skin_class, SkinClass::II);
        assert_eq!(config.evaluation.margin, 1.0); // default
        assert_eq!(config.evaluation.insufficient_coverage, CoveragePolicy::Fail);

        let table = config.med_table().unwrap();
        assert_eq!(table.med_sed(SkinClass::II).unwrap(), 3.0);
        assert_eq!(table.med_sed(SkinClass::III).unwrap(), 4.5);
    }

    #[test]
    fn test_invalid_overrides() {
        let config: Config = toml::from_str("[med]\nVII = 3.0\n").unwrap();
        assert!(matches!(config.med_table(), Err(Error::UnknownSkinClass(_))));

        let config: Config = toml::from_str("[med]\nI = -1.0\n").unwrap();
        assert!(matches!(config.med_table(), Err(Error::Config(_))));

        let config: Config = toml::from_str("[evaluation]\nmargin = 2.0\n").unwrap();
        assert!(matches!(config.margin(), Err(Error::InvalidMargin(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.evaluation.margin = 0.75;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.evaluation.margin, 0.75);
    }
}

//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use safte_core::{AnalysisConfig, AutoSleepConfig, RiskThresholds, SafteParams};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SAFTE model parameters.
    pub model: SafteParams,

    /// Sleep prediction settings.
    pub sleep: AutoSleepConfig,

    /// Effectiveness thresholds for scoring and risk tiers.
    pub thresholds: RiskThresholds,

    /// Reservoir level at the start of every simulation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_reservoir: Option<f64>,
}

impl Config {
    /// Loads configuration from default locations, optionally layering a
    /// specific file on top.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (SAFTE_*, nested keys split on `__`)
        figment = figment.merge(Env::prefixed("SAFTE_").split("__"));

        figment.extract()
    }

    /// Engine settings, with an optional command-line reservoir override.
    pub fn analysis_config(&self, initial_reservoir: Option<f64>) -> AnalysisConfig {
        AnalysisConfig {
            model: self.model.clone(),
            sleep: self.sleep.clone(),
            thresholds: self.thresholds.clone(),
            initial_reservoir: initial_reservoir.or(self.initial_reservoir),
        }
    }
}

/// Returns the platform-specific config directory for safte.
///
/// On Linux: `~/.config/safte`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("safte"))
}

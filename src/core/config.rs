//! Repository configuration (`skillpack.toml`).
//!
//! Every section and key is optional. Missing keys fall back to the defaults
//! documented in the embedded template; unknown keys are rejected so typos
//! surface instead of silently doing nothing.

use crate::core::assets;
use crate::core::error::SkillpackError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "skillpack.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub skills: SkillsConfig,
    pub gate: GateConfig,
    pub packages: PackagesConfig,
    pub changeset: ChangesetConfig,
    pub release: ReleaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkillsConfig {
    pub roots: Vec<String>,
    pub max_lines: usize,
    pub token_budget: usize,
    pub min_description_chars: usize,
    pub trigger_phrases: Vec<String>,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            roots: vec!["skills".to_string(), "plugins".to_string()],
            max_lines: 500,
            token_budget: 5000,
            min_description_chars: 50,
            trigger_phrases: vec![
                "use when".to_string(),
                "use this skill when".to_string(),
                "when the user".to_string(),
                "use for".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub threshold: f64,
    pub strict_threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: 8.0,
            strict_threshold: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagesConfig {
    pub globs: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            globs: vec![
                "skills/*".to_string(),
                "plugins/*".to_string(),
                "packages/*".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChangesetConfig {
    pub dir: String,
}

impl Default for ChangesetConfig {
    fn default() -> Self {
        Self {
            dir: ".changeset".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    pub notes_fallback_lines: usize,
    pub github: bool,
    pub push: bool,
    pub sync_marketplace: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            notes_fallback_lines: 50,
            github: true,
            push: false,
            sync_marketplace: true,
        }
    }
}

impl Config {
    /// Load `skillpack.toml` from `root`, or defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self, SkillpackError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&raw).map_err(|e| {
            SkillpackError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        config.check()?;
        Ok(config)
    }

    /// Apply `SKILLPACK_*` environment overrides.
    pub fn apply_env(mut self) -> Result<Self, SkillpackError> {
        if let Ok(raw) = std::env::var("SKILLPACK_THRESHOLD") {
            self.gate.threshold = raw.trim().parse::<f64>().map_err(|_| {
                SkillpackError::ConfigError(format!(
                    "SKILLPACK_THRESHOLD must be a number, got '{}'",
                    raw
                ))
            })?;
        }
        if std::env::var("SKILLPACK_NO_GITHUB").ok().as_deref() == Some("1") {
            self.release.github = false;
        }
        self.check()?;
        Ok(self)
    }

    pub fn default_toml() -> &'static str {
        assets::TEMPLATE_CONFIG
    }

    fn check(&self) -> Result<(), SkillpackError> {
        check_threshold("gate.threshold", self.gate.threshold)?;
        check_threshold("gate.strict_threshold", self.gate.strict_threshold)?;
        if self.skills.max_lines == 0 {
            return Err(SkillpackError::ConfigError(
                "skills.max_lines must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gate thresholds live on the 0..=10 score scale.
pub fn check_threshold(label: &str, value: f64) -> Result<f64, SkillpackError> {
    if !(0.0..=10.0).contains(&value) {
        return Err(SkillpackError::ConfigError(format!(
            "{} must be within 0..=10, got {}",
            label, value
        )));
    }
    Ok(value)
}

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Intent};

fn default_region() -> String {
    "United States (US)".to_string()
}

fn default_audience() -> String {
    "General Audience".to_string()
}

fn default_runs() -> u32 {
    1
}

fn default_intents() -> Vec<Intent> {
    vec![Intent::General]
}

/// Brand under analysis, loaded from a YAML profile file.
///
/// Keywords are the category queries ("SMS API"), competitors the known
/// rivals checked for leakage in the defense simulation. `runs > 1` enables
/// stability sampling: every (keyword, intent) pair is probed that many times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandProfile {
    pub brand: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default = "default_intents")]
    pub intents: Vec<Intent>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_runs")]
    pub runs: u32,
    #[serde(default)]
    pub risk_analysis: bool,
}

impl BrandProfile {
    /// Load and validate a brand profile from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProfileIo {
            path: path.display().to_string(),
            source: e,
        })?;

        let profile: BrandProfile = serde_yaml::from_str(&content)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Validate profile invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` on an empty brand name, empty or
    /// duplicate keywords, duplicate intents, or zero runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brand.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        if self.keywords.is_empty() {
            return Err(ConfigError::Validation(
                "profile must list at least one keyword".to_string(),
            ));
        }

        let mut seen_keywords = HashSet::new();
        for keyword in &self.keywords {
            if keyword.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "keywords must be non-empty".to_string(),
                ));
            }
            if !seen_keywords.insert(keyword.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate keyword: '{keyword}'"
                )));
            }
        }

        let mut seen_intents = HashSet::new();
        for intent in &self.intents {
            if !seen_intents.insert(*intent) {
                return Err(ConfigError::Validation(format!(
                    "duplicate intent: '{intent}'"
                )));
            }
        }

        if self.runs == 0 {
            return Err(ConfigError::Validation(
                "runs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// All intents for a probe batch: profile intents plus the fixed risk
    /// intents when risk analysis is enabled.
    #[must_use]
    pub fn active_intents(&self) -> Vec<Intent> {
        let mut intents = self.intents.clone();
        if self.risk_analysis {
            intents.extend(Intent::RISK_INTENTS);
        }
        intents
    }
}

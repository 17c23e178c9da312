//! Shared configuration and brand-profile types for AEOLENS.
//!
//! Holds the environment-driven [`AppConfig`], the YAML [`BrandProfile`]
//! loader, the query [`Intent`] taxonomy, and the [`PromptTemplates`] that
//! turn an intent + keyword into the final prompt sent to an answer engine.

use thiserror::Error;

mod app_config;
mod config;
mod intent;
mod profile;
mod prompts;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use intent::{Intent, IntentBucket};
pub use profile::BrandProfile;
pub use prompts::PromptTemplates;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read profile file {path}: {source}")]
    ProfileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile file: {0}")]
    ProfileParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Generate a URL-safe slug from a brand or keyword name.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_simple_name() {
        assert_eq!(slugify("Twilio Inc."), "twilio-inc");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("SMS  API -- Providers"), "sms-api-providers");
    }

    #[test]
    fn slugify_strips_non_ascii() {
        assert_eq!(slugify("Café Brand"), "caf-brand");
    }
}

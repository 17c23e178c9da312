use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let log_level = or_default("AEOLENS_LOG_LEVEL", "info");

    let provider_request_timeout_secs = parse_u64("AEOLENS_PROVIDER_TIMEOUT_SECS", "60")?;
    let provider_max_retries = parse_u32("AEOLENS_PROVIDER_MAX_RETRIES", "3")?;
    let provider_backoff_base_ms = parse_u64("AEOLENS_PROVIDER_BACKOFF_BASE_MS", "2000")?;
    let provider_user_agent = or_default(
        "AEOLENS_PROVIDER_USER_AGENT",
        "aeolens/0.1 (answer-engine-visibility)",
    );

    // Free-tier friendly default: two workers.
    let probe_concurrency = parse_usize("AEOLENS_PROBE_CONCURRENCY", "2")?;
    let defense_inter_query_delay_ms = parse_u64("AEOLENS_DEFENSE_INTER_QUERY_DELAY_MS", "1000")?;
    let leaderboard_size = parse_usize("AEOLENS_LEADERBOARD_SIZE", "15")?;
    let opportunity_limit = parse_usize("AEOLENS_OPPORTUNITY_LIMIT", "5")?;
    let strength_limit = parse_usize("AEOLENS_STRENGTH_LIMIT", "15")?;

    if probe_concurrency == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "AEOLENS_PROBE_CONCURRENCY".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        log_level,
        provider_request_timeout_secs,
        provider_max_retries,
        provider_backoff_base_ms,
        provider_user_agent,
        probe_concurrency,
        defense_inter_query_delay_ms,
        leaderboard_size,
        opportunity_limit,
        strength_limit,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn build_app_config_with_empty_env_uses_defaults() {
        let map: HashMap<&str, &str> = HashMap::new();
        let config = build_app_config(lookup_from_map(&map)).expect("defaults should be valid");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.provider_max_retries, 3);
        assert_eq!(config.provider_backoff_base_ms, 2000);
        assert_eq!(config.probe_concurrency, 2);
        assert_eq!(config.leaderboard_size, 15);
        assert_eq!(config.opportunity_limit, 5);
    }

    #[test]
    fn build_app_config_reads_overrides() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("AEOLENS_PROBE_CONCURRENCY", "4");
        map.insert("AEOLENS_PROVIDER_MAX_RETRIES", "1");
        let config = build_app_config(lookup_from_map(&map)).expect("overrides should parse");
        assert_eq!(config.probe_concurrency, 4);
        assert_eq!(config.provider_max_retries, 1);
    }

    #[test]
    fn build_app_config_rejects_invalid_retries() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("AEOLENS_PROVIDER_MAX_RETRIES", "many");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "AEOLENS_PROVIDER_MAX_RETRIES"),
            "expected InvalidEnvVar(AEOLENS_PROVIDER_MAX_RETRIES), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_rejects_zero_concurrency() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("AEOLENS_PROBE_CONCURRENCY", "0");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "AEOLENS_PROBE_CONCURRENCY"),
            "expected InvalidEnvVar(AEOLENS_PROBE_CONCURRENCY), got: {result:?}"
        );
    }

    #[test]
    fn debug_output_lists_tunables() {
        let map: HashMap<&str, &str> = HashMap::new();
        let config = build_app_config(lookup_from_map(&map)).expect("defaults should be valid");
        let debug = format!("{config:?}");
        assert!(debug.contains("probe_concurrency"));
        assert!(debug.contains("leaderboard_size"));
    }
}

/// Runtime configuration for probing and aggregation.
///
/// Built from environment variables by [`crate::load_app_config`]. Provider
/// API keys are intentionally *not* part of this struct: credentials are
/// resolved per call (explicit key, else the provider's named env var) so
/// that nothing in the probing path depends on ambient global state.
#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Per-request timeout for answer-engine HTTP calls.
    pub provider_request_timeout_secs: u64,
    /// Additional attempts after the first failed provider call.
    pub provider_max_retries: u32,
    /// Base for the exponential backoff schedule (`base * 2^attempt` + jitter).
    pub provider_backoff_base_ms: u64,
    pub provider_user_agent: String,
    /// Worker cap for the probe batch. Kept low to respect free-tier rate
    /// limits, not for correctness.
    pub probe_concurrency: usize,
    /// Pause between sequential defense-simulation queries.
    pub defense_inter_query_delay_ms: u64,
    /// Leaderboard truncation after sorting by impact score.
    pub leaderboard_size: usize,
    pub opportunity_limit: usize,
    pub strength_limit: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field(
                "provider_request_timeout_secs",
                &self.provider_request_timeout_secs,
            )
            .field("provider_max_retries", &self.provider_max_retries)
            .field("provider_backoff_base_ms", &self.provider_backoff_base_ms)
            .field("provider_user_agent", &self.provider_user_agent)
            .field("probe_concurrency", &self.probe_concurrency)
            .field(
                "defense_inter_query_delay_ms",
                &self.defense_inter_query_delay_ms,
            )
            .field("leaderboard_size", &self.leaderboard_size)
            .field("opportunity_limit", &self.opportunity_limit)
            .field("strength_limit", &self.strength_limit)
            .finish()
    }
}

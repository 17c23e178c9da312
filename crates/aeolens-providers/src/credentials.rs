use std::collections::HashMap;

use crate::Provider;

/// Per-provider API keys with env-var fallback.
///
/// Credentials are threaded explicitly through the call chain; nothing in
/// this crate ever writes to the process environment. A provider with no
/// resolvable key is skipped by the dispatcher, never treated as a failure.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    explicit: HashMap<Provider, String>,
}

impl ProviderCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit key for one provider, overriding the env fallback.
    #[must_use]
    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.explicit.insert(provider, key);
        }
        self
    }

    /// Resolve a key: explicit entry first, then the provider's env var.
    #[must_use]
    pub fn resolve(&self, provider: Provider) -> Option<String> {
        if let Some(key) = self.explicit.get(&provider) {
            return Some(key.clone());
        }
        std::env::var(provider.env_key())
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins() {
        let creds = ProviderCredentials::new().with_key(Provider::Claude, "sk-explicit");
        assert_eq!(
            creds.resolve(Provider::Claude).as_deref(),
            Some("sk-explicit")
        );
    }

    #[test]
    fn blank_explicit_key_is_ignored() {
        let creds = ProviderCredentials::new().with_key(Provider::Claude, "   ");
        // Falls through to env, which is unset for this provider in tests.
        // (CI never exports ANTHROPIC_API_KEY.)
        assert!(creds
            .resolve(Provider::Claude)
            .is_none_or(|k| !k.trim().is_empty()));
    }

    #[test]
    fn unknown_provider_without_env_is_none() {
        let creds = ProviderCredentials::new();
        // No explicit entry; result depends only on the env var, and a
        // present value is never blank.
        if let Some(key) = creds.resolve(Provider::Perplexity) {
            assert!(!key.trim().is_empty());
        }
    }
}

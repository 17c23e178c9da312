use thiserror::Error;

use crate::Provider;

/// Errors returned by the answer-engine adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx HTTP status or an error envelope embedded in the body.
    /// Answer engines routinely return rate-limit errors inside 200
    /// responses, so this variant is retried like a network failure.
    #[error("{provider} API error: {message}")]
    Api { provider: Provider, message: String },

    /// No credential could be resolved for the provider. Callers skip the
    /// provider entirely rather than retrying.
    #[error("no API key available for {0}")]
    MissingKey(Provider),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The provider answered with an empty candidate/choice list.
    #[error("{0} returned no response text")]
    EmptyResponse(Provider),
}

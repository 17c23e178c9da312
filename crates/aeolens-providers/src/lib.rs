//! Answer-engine client adapters for AEOLENS.
//!
//! One uniform `query(provider, prompt, api_key) -> text` contract over the
//! supported AI answer engines, wrapped in exponential-backoff retry. The
//! retry layer never lets an error escape as a panic or raised exception:
//! after retries are exhausted the error is returned as a value and the
//! dispatcher records it as a failed probe.

mod client;
mod credentials;
mod error;
mod provider;
mod retry;

pub use client::ProviderClient;
pub use credentials::ProviderCredentials;
pub use error::ProviderError;
pub use provider::Provider;

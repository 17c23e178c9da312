//! Retry with exponential back-off and jitter for answer-engine calls.
//!
//! Answer engines fail in transient, poorly signalled ways: 429s, 503s, and
//! error envelopes embedded in otherwise successful bodies. Matching the
//! product's probing behavior, every error except a missing credential is
//! retried — a probe that cannot produce usable text after the full schedule
//! is reported as data, not raised.

use std::future::Future;
use std::time::Duration;

use crate::ProviderError;

/// Returns `true` for errors worth retrying after a back-off delay.
///
/// Only [`ProviderError::MissingKey`] is a hard stop: a key that is absent
/// now will still be absent on the next attempt.
pub(crate) fn is_retriable(err: &ProviderError) -> bool {
    !matches!(err, ProviderError::MissingKey(_))
}

/// Runs `operation` with up to `max_retries` additional attempts.
///
/// Sleep before retry `n` is `base_ms * 2^(n-1)` plus up to one second of
/// uniform jitter, capped at 60 s. The worker blocks on the sleep; the rest
/// of the pool keeps draining tasks.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let jitter_ms = (rand::random::<f64>() * 1_000.0) as u64;
                let delay_ms = computed.saturating_add(jitter_ms).min(MAX_DELAY_MS);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "provider call failed, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

//! Probe dispatch: the provider × keyword × intent × run matrix.
//!
//! Each provider without a resolvable API key is skipped up front and
//! recorded as such; the remaining tasks run through a bounded concurrent
//! stream. Provider failures become per-probe records, never batch
//! failures; one dead engine must not sink the report.

use std::collections::BTreeMap;

use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};

use aeolens_core::{AppConfig, BrandProfile, Intent, PromptTemplates};
use aeolens_providers::{Provider, ProviderClient, ProviderCredentials};

use crate::extract::{extract_ranking, ExtractionSource};
use crate::mention::{analyze_mention, MentionAnalysis};

const FALLBACK_SNIPPET: &str = "Source content was unstructured text. Parsed via Regex fallback.";

/// Outcome class of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Success,
    /// The provider call failed after retries.
    Error,
    /// The provider answered but no ranking could be extracted.
    Unparseable,
}

/// One probe of one provider with one rendered prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub provider: Provider,
    pub keyword: String,
    pub intent: Intent,
    /// 1-based index within the stability runs for this (keyword, intent).
    pub run_index: u32,
    pub status: ProbeStatus,
    pub analysis: Option<MentionAnalysis>,
    pub prompt_used: String,
    pub error: Option<String>,
}

/// Whether a provider participated in the batch at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    Skipped,
}

/// All probes for one provider, or the reason it sat the batch out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRun {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub results: Vec<ProbeResult>,
}

/// Complete output of one visibility probe batch, keyed by provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeBatch {
    pub providers: BTreeMap<Provider, ProviderRun>,
}

impl ProbeBatch {
    /// Successful probes across all active providers, each with its
    /// mention analysis.
    pub fn successful(&self) -> impl Iterator<Item = (&ProbeResult, &MentionAnalysis)> {
        self.providers
            .values()
            .flat_map(|run| run.results.iter())
            .filter_map(|result| result.analysis.as_ref().map(|a| (result, a)))
            .filter(|(result, _)| result.status == ProbeStatus::Success)
    }
}

struct ProbeTask {
    provider: Provider,
    keyword: String,
    intent: Intent,
    run_index: u32,
    prompt: String,
    api_key: String,
}

/// Run the full visibility probe matrix for a brand profile.
///
/// Every provider in [`Provider::ALL`] is consulted; ones without a
/// resolvable credential are marked [`RunStatus::Skipped`]. Probes run
/// concurrently up to `config.probe_concurrency` in flight.
pub async fn run_visibility_probe(
    client: &ProviderClient,
    profile: &BrandProfile,
    templates: &PromptTemplates,
    credentials: &ProviderCredentials,
    config: &AppConfig,
) -> ProbeBatch {
    let intents = profile.active_intents();
    let mut providers = BTreeMap::new();
    let mut tasks = Vec::new();

    for provider in Provider::ALL {
        let Some(api_key) = credentials.resolve(provider) else {
            tracing::info!(%provider, "skipping provider: no API key");
            providers.insert(
                provider,
                ProviderRun {
                    status: RunStatus::Skipped,
                    skip_reason: Some("No API Key".to_owned()),
                    results: Vec::new(),
                },
            );
            continue;
        };

        providers.insert(
            provider,
            ProviderRun {
                status: RunStatus::Active,
                skip_reason: None,
                results: Vec::new(),
            },
        );

        for keyword in &profile.keywords {
            for intent in &intents {
                for run_index in 1..=profile.runs {
                    tasks.push(ProbeTask {
                        provider,
                        keyword: keyword.clone(),
                        intent: *intent,
                        run_index,
                        prompt: templates.render(*intent, keyword),
                        api_key: api_key.clone(),
                    });
                }
            }
        }
    }

    tracing::info!(
        probes = tasks.len(),
        concurrency = config.probe_concurrency,
        "dispatching visibility probe batch"
    );

    let results: Vec<ProbeResult> = stream::iter(tasks)
        .map(|task| run_probe(client, &profile.brand, task))
        .buffer_unordered(config.probe_concurrency)
        .collect()
        .await;

    for result in results {
        if let Some(run) = providers.get_mut(&result.provider) {
            run.results.push(result);
        }
    }

    // buffer_unordered scrambles completion order; restore a stable one.
    for run in providers.values_mut() {
        run.results.sort_by(|a, b| {
            (&a.keyword, a.intent.to_string(), a.run_index).cmp(&(
                &b.keyword,
                b.intent.to_string(),
                b.run_index,
            ))
        });
    }

    ProbeBatch { providers }
}

async fn run_probe(client: &ProviderClient, brand: &str, task: ProbeTask) -> ProbeResult {
    let mut result = ProbeResult {
        provider: task.provider,
        keyword: task.keyword,
        intent: task.intent,
        run_index: task.run_index,
        status: ProbeStatus::Error,
        analysis: None,
        prompt_used: task.prompt.clone(),
        error: None,
    };

    let text = match client
        .query_with_retry(task.provider, &task.prompt, &task.api_key)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                provider = %task.provider,
                keyword = %result.keyword,
                intent = %task.intent,
                error = %e,
                "probe failed"
            );
            result.error = Some(e.to_string());
            return result;
        }
    };

    let Some((ranking, source)) = extract_ranking(&text) else {
        tracing::warn!(
            provider = %task.provider,
            keyword = %result.keyword,
            "response could not be parsed into a ranking"
        );
        result.status = ProbeStatus::Unparseable;
        result.error = Some("no ranking found in response".to_owned());
        return result;
    };

    let mut analysis = analyze_mention(&ranking, brand, task.intent.is_risk());
    if source == ExtractionSource::NumberedListFallback && analysis.mentioned {
        analysis.snippet = FALLBACK_SNIPPET.to_owned();
    }

    result.status = ProbeStatus::Success;
    result.analysis = Some(analysis);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Rank, Sentiment};

    fn result(provider: Provider, status: ProbeStatus, mentioned: bool) -> ProbeResult {
        let analysis = (status != ProbeStatus::Error).then(|| {
            let mut a = MentionAnalysis::absent();
            a.mentioned = mentioned;
            if mentioned {
                a.rank = Rank::Numeric(1);
                a.sentiment = Sentiment::Positive;
            }
            a
        });
        ProbeResult {
            provider,
            keyword: "SMS API".to_owned(),
            intent: Intent::General,
            run_index: 1,
            status,
            analysis,
            prompt_used: String::new(),
            error: None,
        }
    }

    #[test]
    fn successful_skips_errors_and_unparseable() {
        let mut providers = BTreeMap::new();
        providers.insert(
            Provider::Gemini,
            ProviderRun {
                status: RunStatus::Active,
                skip_reason: None,
                results: vec![
                    result(Provider::Gemini, ProbeStatus::Success, true),
                    result(Provider::Gemini, ProbeStatus::Error, false),
                    result(Provider::Gemini, ProbeStatus::Unparseable, false),
                ],
            },
        );
        providers.insert(
            Provider::Claude,
            ProviderRun {
                status: RunStatus::Skipped,
                skip_reason: Some("No API Key".to_owned()),
                results: Vec::new(),
            },
        );
        let batch = ProbeBatch { providers };

        assert_eq!(batch.successful().count(), 1);
    }

    #[test]
    fn probe_status_serializes_snake_case() {
        let json = serde_json::to_string(&ProbeStatus::Unparseable).expect("serializes");
        assert_eq!(json, "\"unparseable\"");
    }
}

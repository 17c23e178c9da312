//! Brand-defense simulation.
//!
//! Probes branded queries ("{brand} sms api", "{brand} sms api pricing")
//! to measure how often an answer engine, asked directly about the brand,
//! still steers the user toward competitors. The share of non-comparative
//! answers that stay competitor-free is the moat score. Comparative queries
//! name a rival by construction, so they never count against the moat, but
//! their leaks still feed the leakage tally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};

use aeolens_core::{AppConfig, BrandProfile};
use aeolens_providers::{Provider, ProviderClient, ProviderCredentials};

use crate::extract::Sentiment;
use crate::round1;

const SNIPPET_LEAD_CHARS: usize = 200;
const LEAK_CONTEXT_BEFORE: usize = 50;
const LEAK_CONTEXT_AFTER: usize = 100;

const POSITIVE_MARKERS: [&str; 5] = [
    "best",
    "excellent",
    "industry standard",
    "leader",
    "highly recommend",
];

const NEGATIVE_MARKERS: [&str; 6] = ["expensive", "complex", "slow", "hard", "limited", "poor"];

/// Perception vocabulary mined from the NARRATIVE line of each answer.
const NARRATIVE_VOCABULARY: [&str; 12] = [
    "expensive",
    "cheap",
    "scalable",
    "enterprise",
    "complex",
    "easy",
    "developer-friendly",
    "reliable",
    "innovative",
    "legacy",
    "popular",
    "secure",
];

/// The four branded query shapes probed per keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseQueryKind {
    Direct,
    Comparative,
    Reviews,
    Pricing,
}

impl DefenseQueryKind {
    #[must_use]
    pub fn is_comparative(self) -> bool {
        self == DefenseQueryKind::Comparative
    }
}

/// One branded query and what the engine did with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseResult {
    pub keyword: String,
    pub kind: DefenseQueryKind,
    pub query: String,
    pub sentiment: Sentiment,
    pub leaked_competitors: Vec<String>,
    /// No competitor appeared in the answer.
    pub clean: bool,
    pub snippet: String,
    pub descriptors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output of one defense simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseReport {
    pub provider: Option<Provider>,
    /// Percentage of non-comparative, non-errored answers with no leakage.
    pub moat_score: f64,
    /// Competitor appearances across every non-errored answer, comparative
    /// queries included.
    pub leakage_counts: BTreeMap<String, u32>,
    pub narrative_descriptors: BTreeMap<String, u32>,
    pub results: Vec<DefenseResult>,
}

/// Run the branded defense simulation against the first provider with a
/// resolvable credential.
///
/// Queries run sequentially with `config.defense_inter_query_delay_ms`
/// between them; branded probes are rate-limit magnets and there is no
/// concurrency win worth the 429s.
pub async fn run_branded_simulation(
    client: &ProviderClient,
    profile: &BrandProfile,
    credentials: &ProviderCredentials,
    config: &AppConfig,
) -> DefenseReport {
    let Some((provider, api_key)) = Provider::ALL
        .iter()
        .find_map(|p| credentials.resolve(*p).map(|key| (*p, key)))
    else {
        tracing::warn!("defense simulation skipped: no provider has an API key");
        return build_report(None, Vec::new());
    };

    tracing::info!(%provider, brand = %profile.brand, "running brand-defense simulation");

    let mut results = Vec::new();
    for keyword in &profile.keywords {
        for (kind, query) in build_queries(&profile.brand, keyword, &profile.competitors) {
            if !results.is_empty() && config.defense_inter_query_delay_ms > 0 {
                sleep(Duration::from_millis(config.defense_inter_query_delay_ms)).await;
            }

            let prompt = render_prompt(&query, &profile.brand);
            match client.query_with_retry(provider, &prompt, &api_key).await {
                Ok(text) => results.push(assess(
                    keyword,
                    kind,
                    &query,
                    &text,
                    &profile.brand,
                    &profile.competitors,
                )),
                Err(e) => {
                    tracing::warn!(%provider, %query, error = %e, "defense query failed");
                    results.push(DefenseResult {
                        keyword: keyword.clone(),
                        kind,
                        query,
                        sentiment: Sentiment::NotAvailable,
                        leaked_competitors: Vec::new(),
                        clean: false,
                        snippet: String::new(),
                        descriptors: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }
    }

    build_report(Some(provider), results)
}

/// The four branded queries for one keyword. The comparative query names
/// the profile's first competitor, or "competitors" when none are listed.
fn build_queries(
    brand: &str,
    keyword: &str,
    competitors: &[String],
) -> Vec<(DefenseQueryKind, String)> {
    let rival = competitors
        .first()
        .map_or("competitors", String::as_str);
    vec![
        (DefenseQueryKind::Direct, format!("{brand} {keyword}")),
        (
            DefenseQueryKind::Comparative,
            format!("{brand} vs {rival} {keyword}"),
        ),
        (
            DefenseQueryKind::Reviews,
            format!("{brand} {keyword} reviews pros and cons"),
        ),
        (DefenseQueryKind::Pricing, format!("{brand} {keyword} pricing")),
    ]
}

fn render_prompt(query: &str, brand: &str) -> String {
    format!(
        "You are answering a user who searched for '{query}'. \
         Respond the way an AI assistant would: describe what they would find \
         and whether {brand} fits their need. \
         End with a single line starting with 'NARRATIVE:' that sums up \
         {brand}'s market perception in a few adjectives."
    )
}

/// Score one answer: leakage, sentiment, perception vocabulary, snippet.
fn assess(
    keyword: &str,
    kind: DefenseQueryKind,
    query: &str,
    text: &str,
    brand: &str,
    competitors: &[String],
) -> DefenseResult {
    let (body, narrative) = match text.split_once("NARRATIVE:") {
        Some((body, narrative)) => (body, Some(narrative)),
        None => (text, None),
    };

    let body_lower = body.to_lowercase();
    let brand_lower = brand.to_lowercase();

    let leaked_competitors: Vec<String> = competitors
        .iter()
        .filter(|c| {
            let c_lower = c.to_lowercase();
            !c_lower.is_empty() && c_lower != brand_lower && body_lower.contains(&c_lower)
        })
        .cloned()
        .collect();

    let text_lower = text.to_lowercase();
    let sentiment = if POSITIVE_MARKERS.iter().any(|m| text_lower.contains(m)) {
        Sentiment::Positive
    } else if NEGATIVE_MARKERS.iter().any(|m| text_lower.contains(m)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    let narrative_lower = narrative.map_or_else(|| text_lower.clone(), str::to_lowercase);
    let descriptors: Vec<String> = NARRATIVE_VOCABULARY
        .iter()
        .filter(|d| narrative_lower.contains(**d))
        .map(|d| (*d).to_owned())
        .collect();

    let snippet = build_snippet(body, &body_lower, &leaked_competitors);

    DefenseResult {
        keyword: keyword.to_owned(),
        kind,
        query: query.to_owned(),
        sentiment,
        clean: leaked_competitors.is_empty(),
        leaked_competitors,
        snippet,
        descriptors,
        error: None,
    }
}

/// First 200 characters of the answer, plus a context window around each
/// leaked competitor that fell outside that lead.
fn build_snippet(body: &str, body_lower: &str, leaked: &[String]) -> String {
    let lead = truncate_chars(body.trim(), SNIPPET_LEAD_CHARS);
    let mut snippet = lead.to_owned();
    if body.trim().len() > lead.len() {
        snippet.push_str("...");
    }

    let lead_lower = lead.to_lowercase();
    for competitor in leaked {
        let competitor_lower = competitor.to_lowercase();
        if lead_lower.contains(&competitor_lower) {
            continue;
        }
        if let Some(pos) = body_lower.find(&competitor_lower) {
            let start = floor_boundary(body, pos.saturating_sub(LEAK_CONTEXT_BEFORE));
            let end = floor_boundary(
                body,
                (pos + competitor_lower.len() + LEAK_CONTEXT_AFTER).min(body.len()),
            );
            snippet.push_str(" ... ");
            snippet.push_str(body[start..end].trim());
        }
    }
    snippet
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn build_report(provider: Option<Provider>, results: Vec<DefenseResult>) -> DefenseReport {
    let mut leakage_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut narrative_descriptors: BTreeMap<String, u32> = BTreeMap::new();

    for result in &results {
        if result.error.is_some() {
            continue;
        }
        for competitor in &result.leaked_competitors {
            *leakage_counts.entry(competitor.clone()).or_insert(0) += 1;
        }
        for descriptor in &result.descriptors {
            *narrative_descriptors.entry(descriptor.clone()).or_insert(0) += 1;
        }
    }

    let defended: Vec<&DefenseResult> = results
        .iter()
        .filter(|r| !r.kind.is_comparative() && r.error.is_none())
        .collect();
    let moat_score = if defended.is_empty() {
        0.0
    } else {
        let clean = defended.iter().filter(|r| r.clean).count();
        round1(100.0 * clean as f64 / defended.len() as f64)
    };

    DefenseReport {
        provider,
        moat_score,
        leakage_counts,
        narrative_descriptors,
        results,
    }
}

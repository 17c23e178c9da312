//! Single-page index scoring.
//!
//! Asks each available answer engine a query the target page should win
//! ("{brand} pricing plans" for a pricing page) and scores whether the
//! page is actually cited, how relevant the answer is, and how the brand
//! comes across. Scores are 0-100 per provider: up to 40 for citation,
//! 40 for relevance, 20 for sentiment.

use futures::{stream, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};

use aeolens_core::AppConfig;
use aeolens_providers::{Provider, ProviderClient, ProviderCredentials};

use crate::domain::root_domain;
use crate::round1;

const EXACT_CITATION_SCORE: u32 = 40;
const DOMAIN_CITATION_SCORE: u32 = 20;
const RELEVANCE_CAP: u32 = 40;

const PRICING_TERMS: [&str; 7] = ["free", "plan", "$", "subscription", "enterprise", "pricing", "cost"];
const ABOUT_TERMS: [&str; 6] = ["founded", "mission", "ceo", "company", "based in", "history"];

const NEGATIVE_TERMS: [&str; 7] = ["avoid", "bad", "poor", "error", "issue", "scam", "expensive"];
const POSITIVE_TERMS: [&str; 6] = ["good", "great", "excellent", "best", "reliable", "leader"];

/// How the target page showed up in an answer's citations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationMatch {
    ExactUrl,
    DomainOnly,
    NotCited,
}

/// One provider's verdict on the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageIndexResult {
    pub provider: Provider,
    pub citation_match: CitationMatch,
    pub citation_score: u32,
    pub relevance_score: u32,
    pub sentiment_score: u32,
    pub total_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cross-provider index report for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageIndexReport {
    pub url: String,
    pub page_type: String,
    pub query: String,
    /// Mean total score across providers that answered.
    pub index_score: f64,
    pub results: Vec<PageIndexResult>,
}

/// Score how well one page is indexed by the answer engines.
///
/// Providers without credentials are left out entirely; provider failures
/// become zero-score rows carrying the error, so a partial outage still
/// yields a report.
pub async fn evaluate_page_index(
    client: &ProviderClient,
    credentials: &ProviderCredentials,
    config: &AppConfig,
    brand: &str,
    url: &str,
    page_type: &str,
) -> PageIndexReport {
    let query = index_query(brand, page_type);
    tracing::info!(%url, %page_type, %query, "evaluating page index");

    let available: Vec<(Provider, String)> = Provider::ALL
        .iter()
        .filter_map(|p| credentials.resolve(*p).map(|key| (*p, key)))
        .collect();

    let mut results: Vec<PageIndexResult> = stream::iter(available)
        .map(|(provider, api_key)| {
            let query = query.clone();
            async move {
                match client.query_with_retry(provider, &query, &api_key).await {
                    Ok(text) => score_response(provider, url, page_type, brand, &text),
                    Err(e) => PageIndexResult {
                        provider,
                        citation_match: CitationMatch::NotCited,
                        citation_score: 0,
                        relevance_score: 0,
                        sentiment_score: 0,
                        total_score: 0,
                        error: Some(e.to_string()),
                    },
                }
            }
        })
        .buffer_unordered(config.probe_concurrency)
        .collect()
        .await;
    results.sort_by_key(|r| r.provider);

    let answered: Vec<&PageIndexResult> = results.iter().filter(|r| r.error.is_none()).collect();
    let index_score = if answered.is_empty() {
        0.0
    } else {
        let sum: u32 = answered.iter().map(|r| r.total_score).sum();
        round1(f64::from(sum) / answered.len() as f64)
    };

    PageIndexReport {
        url: url.to_owned(),
        page_type: page_type.to_owned(),
        query,
        index_score,
        results,
    }
}

/// The query the page should be winning for its type.
fn index_query(brand: &str, page_type: &str) -> String {
    match page_type.to_lowercase().as_str() {
        "pricing" => format!("{brand} pricing plans"),
        "about" | "company" => format!("about {brand} company"),
        "contact" | "support" => format!("{brand} customer support contact"),
        "blog" | "resource" => format!("{brand} blog resources"),
        _ => format!("{brand} official site"),
    }
}

fn score_response(
    provider: Provider,
    url: &str,
    page_type: &str,
    brand: &str,
    text: &str,
) -> PageIndexResult {
    let citation_match = citation_match(url, text);
    let citation_score = match citation_match {
        CitationMatch::ExactUrl => EXACT_CITATION_SCORE,
        CitationMatch::DomainOnly => DOMAIN_CITATION_SCORE,
        CitationMatch::NotCited => 0,
    };
    let relevance_score = relevance_score(page_type, brand, text);
    let sentiment_score = sentiment_score(text);

    PageIndexResult {
        provider,
        citation_match,
        citation_score,
        relevance_score,
        sentiment_score,
        total_score: citation_score + relevance_score + sentiment_score,
        error: None,
    }
}

/// Pull every URL out of the answer (bare and markdown-linked) and check
/// them against the target page.
fn citation_match(url: &str, text: &str) -> CitationMatch {
    let bare = Regex::new(r#"https?://[A-Za-z0-9.\-]+(?:/[^\s)"'<>\]]*)?"#)
        .expect("valid url regex");
    let markdown = Regex::new(r"\[[^\]]*\]\((https?://[^)]+)\)").expect("valid markdown link regex");

    let mut cited: Vec<String> = bare.find_iter(text).map(|m| m.as_str().to_owned()).collect();
    cited.extend(
        markdown
            .captures_iter(text)
            .map(|cap| cap[1].to_owned()),
    );

    let target = url.trim().trim_end_matches('/').to_lowercase();
    let target_domain = root_domain(url);

    let mut best = CitationMatch::NotCited;
    for candidate in &cited {
        let candidate = candidate.trim_end_matches('/').to_lowercase();
        if candidate.contains(&target) || target.contains(&candidate) {
            return CitationMatch::ExactUrl;
        }
        if best == CitationMatch::NotCited
            && target_domain.is_some()
            && root_domain(&candidate) == target_domain
        {
            best = CitationMatch::DomainOnly;
        }
    }
    best
}

fn relevance_score(page_type: &str, brand: &str, text: &str) -> u32 {
    let text_lower = text.to_lowercase();
    let mut score = 0;

    if text_lower.contains(&brand.to_lowercase()) {
        score += 10;
    }

    let on_topic = match page_type.to_lowercase().as_str() {
        "pricing" => PRICING_TERMS.iter().any(|t| text_lower.contains(t)),
        "about" | "company" => ABOUT_TERMS.iter().any(|t| text_lower.contains(t)),
        _ => text.len() > 100,
    };
    if on_topic {
        score += 30;
    }

    score.min(RELEVANCE_CAP)
}

fn sentiment_score(text: &str) -> u32 {
    let text_lower = text.to_lowercase();
    if NEGATIVE_TERMS.iter().any(|t| text_lower.contains(t)) {
        0
    } else if POSITIVE_TERMS.iter().any(|t| text_lower.contains(t)) {
        20
    } else {
        10
    }
}

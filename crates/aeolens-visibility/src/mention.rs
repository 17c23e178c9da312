//! Per-query scoring of an extracted ranking against the user's brand.

use serde::{Deserialize, Serialize};

use crate::extract::{ExtractedRanking, Rank, Sentiment};
use crate::round1;

/// Descriptive vocabulary mined from the brand's list entry. These surface
/// how the answer engines characterize the brand across queries.
const DESCRIPTOR_VOCABULARY: [&str; 24] = [
    "innovative",
    "reliable",
    "expensive",
    "cheap",
    "fast",
    "slow",
    "secure",
    "vulnerable",
    "popular",
    "niche",
    "complex",
    "easy",
    "powerful",
    "limited",
    "corporate",
    "startup-friendly",
    "enterprise",
    "leading",
    "trusted",
    "questionable",
    "seamless",
    "clunky",
    "robust",
    "outdated",
];

/// Reverse containment ("Twilio" item vs "Twilio Inc." brand) requires item
/// names longer than this, or junk entries like "IO" would claim the brand.
const MIN_NAME_CONTAINMENT_LEN: usize = 3;

/// Phrases that flag a risk-intent answer as actively damaging even when the
/// model labelled the entry something other than Negative.
const RISK_TRIGGER_PHRASES: [&str; 6] = [
    "scam",
    "fraud",
    "security breach",
    "unsafe",
    "avoid",
    "worst",
];

/// A competing brand that appeared alongside (or instead of) the user's
/// brand in one ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorMention {
    pub rank: Rank,
    pub name: String,
}

/// Outcome of checking one extracted ranking for the user's brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionAnalysis {
    pub mentioned: bool,
    pub sentiment: Sentiment,
    pub rank: Rank,
    pub snippet: String,
    pub share_of_voice: f64,
    pub weighted_share_of_voice: f64,
    pub competitors_found: Vec<CompetitorMention>,
    pub citations_found: Vec<String>,
    pub extracted_adjectives: Vec<String>,
    pub total_list_items: usize,
}

impl MentionAnalysis {
    /// The analysis recorded when no ranking could be extracted at all.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            mentioned: false,
            sentiment: Sentiment::NotAvailable,
            rank: Rank::Unranked,
            snippet: "No response".to_owned(),
            share_of_voice: 0.0,
            weighted_share_of_voice: 0.0,
            competitors_found: Vec::new(),
            citations_found: Vec::new(),
            extracted_adjectives: Vec::new(),
            total_list_items: 0,
        }
    }
}

/// Score one extracted ranking for the user's brand.
///
/// Brand matching is a case-insensitive substring test: the brand inside
/// the item name ("Twilio" matches "Twilio Inc."), or the item name inside
/// the brand when the name is long enough to be meaningful. Every
/// non-matching item is recorded as a competitor mention for aggregation.
#[must_use]
pub fn analyze_mention(ranking: &ExtractedRanking, brand: &str, is_risk: bool) -> MentionAnalysis {
    let brand_lower = brand.to_lowercase();
    let mut analysis = MentionAnalysis::absent();
    analysis.citations_found.clone_from(&ranking.sources);
    analysis.total_list_items = ranking.items.len();

    for item in &ranking.items {
        let name_lower = item.name.to_lowercase();
        let is_user = name_lower.contains(&brand_lower)
            || (name_lower.len() > MIN_NAME_CONTAINMENT_LEN
                && brand_lower.contains(&name_lower));

        if !is_user {
            analysis.competitors_found.push(CompetitorMention {
                rank: item.rank,
                name: item.name.clone(),
            });
            continue;
        }

        // First match wins; later duplicates are treated as competitors of
        // themselves often enough that ignoring them is the safer read.
        if analysis.mentioned {
            continue;
        }

        analysis.mentioned = true;
        analysis.rank = item.rank;
        analysis.sentiment = item.sentiment.clone();
        analysis.snippet = format!("**#{} {}** - {}", item.rank, item.name, item.description);

        let description_lower = item.description.to_lowercase();
        analysis.extracted_adjectives = DESCRIPTOR_VOCABULARY
            .iter()
            .filter(|d| description_lower.contains(**d))
            .map(|d| (*d).to_owned())
            .collect();
    }

    if is_risk && analysis.mentioned && analysis.sentiment != Sentiment::Negative {
        let snippet_lower = analysis.snippet.to_lowercase();
        if RISK_TRIGGER_PHRASES
            .iter()
            .any(|p| snippet_lower.contains(p))
        {
            analysis.sentiment = Sentiment::CriticalWarning;
        }
    }

    if analysis.mentioned && analysis.total_list_items > 0 {
        let total = analysis.total_list_items;
        analysis.share_of_voice = round1(100.0 / total as f64);

        if let Rank::Numeric(rank) = analysis.rank {
            let weight_sum: f64 = (1..=total).map(|i| 1.0 / i as f64).sum();
            analysis.weighted_share_of_voice =
                round1(100.0 * (1.0 / f64::from(rank)) / weight_sum);
        }
    }

    analysis
}

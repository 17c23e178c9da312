//! Answer-engine visibility analysis for AEOLENS.
//!
//! Turns raw answer-engine output into structured brand rankings
//! ([`extract`]), scores each ranking against the user's brand ([`mention`]),
//! dispatches the full provider × keyword × intent × run probe matrix
//! ([`dispatch`]), and folds all per-query results into the competitive
//! leaderboard, citation-gap report, and stability score ([`aggregate`]).
//! The brand-defense simulation ([`defense`]) and single-page scoring
//! ([`page_index`]) reuse the same probing plumbing over branded queries.

pub mod aggregate;
pub mod defense;
pub mod dispatch;
pub mod domain;
pub mod extract;
pub mod mention;
pub mod page_index;

pub use aggregate::{
    analyze_competitors, AggregateReport, IntentScores, LeaderboardEntry, OpportunityUrl,
    RankChange, StrengthUrl,
};
pub use defense::{run_branded_simulation, DefenseQueryKind, DefenseReport, DefenseResult};
pub use dispatch::{
    run_visibility_probe, ProbeBatch, ProbeResult, ProbeStatus, ProviderRun, RunStatus,
};
pub use extract::{
    extract_ranking, ExtractedRanking, ExtractionSource, Rank, RankingItem, Sentiment,
};
pub use mention::{analyze_mention, CompetitorMention, MentionAnalysis};
pub use page_index::{evaluate_page_index, CitationMatch, PageIndexReport, PageIndexResult};

/// Round to one decimal place, the precision all report percentages use.
#[must_use]
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

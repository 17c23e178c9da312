//! Cross-query aggregation: the competitive leaderboard, citation-gap
//! report, and stability score.
//!
//! Brand names arrive as free text from four different engines, so entries
//! are merged through fuzzy canonicalization before any counting happens.
//! All scoring reads only successful probes; skipped providers and failed
//! probes simply contribute nothing.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use aeolens_core::{AppConfig, IntentBucket};

use crate::dispatch::ProbeBatch;
use crate::domain::root_domain;
use crate::extract::Rank;
use crate::round1;

/// Jaro-Winkler similarity above which two brand names are the same brand.
const FUZZY_MERGE_CUTOFF: f64 = 0.85;

/// Containment merging ("Twilio" inside "Twilio Inc.") requires names longer
/// than this, or short names like "AWS" would swallow unrelated brands.
const MIN_CONTAINMENT_KEY_LEN: usize = 3;

/// Weight credited to a brand mentioned without a numeric position.
const UNRANKED_WEIGHT: f64 = 0.5;

/// Rank value an unranked mention contributes to the average-rank figure.
const UNRANKED_RANK_VALUE: f64 = 10.0;

/// Position movement versus the previous leaderboard. Positive deltas mean
/// the brand moved up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankChange {
    Delta(i64),
    New,
}

impl Serialize for RankChange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RankChange::Delta(delta) => serializer.serialize_i64(*delta),
            RankChange::New => serializer.serialize_str("New"),
        }
    }
}

impl<'de> Deserialize<'de> for RankChange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_i64()
            .map_or(RankChange::New, RankChange::Delta))
    }
}

/// Per-bucket visibility: the share of that bucket's queries where the
/// brand appeared.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentScores {
    pub general: f64,
    pub informational: f64,
    pub commercial: f64,
    pub transactional: f64,
    pub risk: f64,
}

impl IntentScores {
    fn set(&mut self, bucket: IntentBucket, score: f64) {
        match bucket {
            IntentBucket::General => self.general = score,
            IntentBucket::Informational => self.informational = score,
            IntentBucket::Commercial => self.commercial = score,
            IntentBucket::Transactional => self.transactional = score,
            IntentBucket::Risk => self.risk = score,
        }
    }
}

/// One brand on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub mentions: u32,
    pub unique_queries: u32,
    /// Rank-weighted presence across all queries, as a percentage.
    pub impact_score: f64,
    /// Share of all queries where the brand appeared at all.
    pub share_of_voice: f64,
    pub avg_shelf_share: f64,
    pub avg_rank: f64,
    pub dominant_source: Option<String>,
    /// Share of the brand's citations that point at rival-owned domains.
    pub competitor_reliance: f64,
    pub intent_scores: IntentScores,
    pub rank_change: RankChange,
}

/// A domain the answer engines cite when ranking the user's brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthUrl {
    pub domain: String,
    pub citations: u32,
}

/// A domain cited when a rival wins that the user underperforms on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityUrl {
    pub domain: String,
    pub leader_citations: u32,
    pub user_citations: u32,
}

/// Full aggregation output for one probe batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub strength_urls: Vec<StrengthUrl>,
    pub opportunity_urls: Vec<OpportunityUrl>,
    pub stability_score: f64,
    pub total_queries: u32,
}

#[derive(Default)]
struct BrandStats {
    mentions: u32,
    unique_queries: u32,
    weighted_score: f64,
    total_shelf_share: f64,
    rank_sum: f64,
    citation_sources: HashMap<String, u32>,
    intent_mentions: HashMap<IntentBucket, u32>,
}

/// Resolve a raw brand name against already-seen canonical names.
///
/// Fuzzy similarity is checked first, then substring containment for the
/// suffix cases similarity misses ("Amazon Web Services" / "Amazon Web
/// Services (AWS)"). First seen spelling wins as the canonical form, so
/// merging is independent of which variant arrives first.
fn canonicalize(stats: &BTreeMap<String, BrandStats>, name: &str) -> String {
    let name = name.trim();
    let name_lower = name.to_lowercase();

    for key in stats.keys() {
        if strsim::jaro_winkler(&key.to_lowercase(), &name_lower) >= FUZZY_MERGE_CUTOFF {
            return key.clone();
        }
    }

    for key in stats.keys() {
        let key_lower = key.to_lowercase();
        if key_lower.len() > MIN_CONTAINMENT_KEY_LEN
            && name_lower.len() > MIN_CONTAINMENT_KEY_LEN
            && (key_lower.contains(&name_lower) || name_lower.contains(&key_lower))
        {
            return key.clone();
        }
    }

    name.to_owned()
}

fn is_brand_domain(domain: &str, brand_lower: &str) -> bool {
    brand_lower.len() > MIN_CONTAINMENT_KEY_LEN && domain.contains(brand_lower)
}

/// Fold all successful probes of a batch into the aggregate report.
///
/// `previous` is the leaderboard from a prior report; when given, each entry
/// carries its position delta against it, otherwise deltas are zero.
#[must_use]
pub fn analyze_competitors(
    batch: &ProbeBatch,
    user_brand: &str,
    previous: Option<&[LeaderboardEntry]>,
    config: &AppConfig,
) -> AggregateReport {
    let user_lower = user_brand.trim().to_lowercase();

    let mut stats: BTreeMap<String, BrandStats> = BTreeMap::new();
    let mut leader_citations: HashMap<String, u32> = HashMap::new();
    let mut user_citations: HashMap<String, u32> = HashMap::new();
    let mut stability: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    let mut total_queries: u32 = 0;
    let mut intent_totals: HashMap<IntentBucket, u32> = HashMap::new();

    for (probe, analysis) in batch.successful() {
        total_queries += 1;
        let bucket = probe.intent.bucket();
        *intent_totals.entry(bucket).or_insert(0) += 1;

        let pair = stability
            .entry(format!("{}_{}", probe.keyword, probe.intent))
            .or_insert((0, 0));
        pair.0 += 1;
        if analysis.mentioned {
            pair.1 += 1;
        }

        let query_domains: Vec<String> = analysis
            .citations_found
            .iter()
            .filter_map(|url| root_domain(url))
            .collect();

        if analysis.mentioned {
            for domain in &query_domains {
                *user_citations.entry(domain.clone()).or_insert(0) += 1;
            }
        }

        // All brands present in this query: the extracted competitors plus
        // the user's own entry when mentioned.
        let mut items: Vec<(String, Rank, bool)> = analysis
            .competitors_found
            .iter()
            .map(|c| (c.name.clone(), c.rank, false))
            .collect();
        if analysis.mentioned {
            items.push((user_brand.trim().to_owned(), analysis.rank, true));
        }

        let mut seen_in_query: Vec<String> = Vec::new();
        let mut winner: Option<String> = None;

        for (raw_name, rank, is_user) in items {
            let canonical = canonicalize(&stats, &raw_name);
            let canonical_lower = canonical.to_lowercase();

            if rank == Rank::Numeric(1) && winner.is_none() {
                winner = Some(canonical.clone());
            }

            let entry = stats.entry(canonical.clone()).or_default();
            entry.mentions += 1;
            entry.weighted_score += match rank {
                Rank::Numeric(r) => 1.0 / f64::from(r),
                Rank::Unranked => UNRANKED_WEIGHT,
            };
            entry.rank_sum += match rank {
                Rank::Numeric(r) => f64::from(r),
                Rank::Unranked => UNRANKED_RANK_VALUE,
            };
            if analysis.total_list_items > 0 {
                entry.total_shelf_share += 100.0 / analysis.total_list_items as f64;
            }

            if !seen_in_query.contains(&canonical) {
                seen_in_query.push(canonical.clone());
                entry.unique_queries += 1;

                // Being named in a risk query with exonerating sentiment is
                // not risk exposure; keep it out of the risk column.
                let exonerated = bucket == IntentBucket::Risk
                    && is_user
                    && analysis.sentiment.indicates_exoneration();
                if !exonerated {
                    *entry.intent_mentions.entry(bucket).or_insert(0) += 1;
                }
            }

            for domain in &query_domains {
                if is_brand_domain(domain, &canonical_lower) {
                    continue;
                }
                if is_user && is_brand_domain(domain, &user_lower) {
                    continue;
                }
                *entry.citation_sources.entry(domain.clone()).or_insert(0) += 1;
            }
        }

        // When a rival wins the query, its third-party citations are the
        // user's content gap. The user's canonical name is resolved after
        // the item loop so freshly-merged variants compare correctly.
        let user_canonical = canonicalize(&stats, user_brand);
        if let Some(winner) = winner {
            if winner != user_canonical {
                for domain in &query_domains {
                    let owned_by_known_brand = stats
                        .keys()
                        .any(|k| is_brand_domain(domain, &k.to_lowercase()))
                        || is_brand_domain(domain, &user_lower);
                    if !owned_by_known_brand {
                        *leader_citations.entry(domain.clone()).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    let stability_score = if stability.is_empty() {
        0.0
    } else {
        let sum: f64 = stability
            .values()
            .map(|(runs, mentions)| 100.0 * f64::from(*mentions) / f64::from(*runs))
            .sum();
        round1(sum / stability.len() as f64)
    };

    let mut strength_urls: Vec<StrengthUrl> = user_citations
        .iter()
        .map(|(domain, citations)| StrengthUrl {
            domain: domain.clone(),
            citations: *citations,
        })
        .collect();
    strength_urls.sort_by(|a, b| b.citations.cmp(&a.citations).then(a.domain.cmp(&b.domain)));
    strength_urls.truncate(config.strength_limit);

    let mut opportunity_urls: Vec<OpportunityUrl> = leader_citations
        .iter()
        .filter_map(|(domain, leader_count)| {
            let user_count = user_citations.get(domain).copied().unwrap_or(0);
            (user_count < *leader_count).then(|| OpportunityUrl {
                domain: domain.clone(),
                leader_citations: *leader_count,
                user_citations: user_count,
            })
        })
        .collect();
    opportunity_urls.sort_by(|a, b| {
        b.leader_citations
            .cmp(&a.leader_citations)
            .then(a.domain.cmp(&b.domain))
    });
    opportunity_urls.truncate(config.opportunity_limit);

    let known_brands: Vec<String> = stats.keys().map(|k| k.to_lowercase()).collect();
    let mut leaderboard: Vec<LeaderboardEntry> = stats
        .iter()
        .map(|(name, brand)| {
            finalize_entry(name, brand, total_queries, &intent_totals, &known_brands)
        })
        .collect();

    leaderboard.sort_by(|a, b| {
        b.impact_score
            .total_cmp(&a.impact_score)
            .then_with(|| a.name.cmp(&b.name))
    });

    let previous_positions: HashMap<&str, usize> = previous
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(idx, entry)| (entry.name.as_str(), idx + 1))
        .collect();
    for (idx, entry) in leaderboard.iter_mut().enumerate() {
        entry.rank_change = match previous {
            None => RankChange::Delta(0),
            Some(_) => previous_positions
                .get(entry.name.as_str())
                .map_or(RankChange::New, |prev| {
                    RankChange::Delta(*prev as i64 - (idx as i64 + 1))
                }),
        };
    }
    leaderboard.truncate(config.leaderboard_size);

    AggregateReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        leaderboard,
        strength_urls,
        opportunity_urls,
        stability_score,
        total_queries,
    }
}

fn finalize_entry(
    name: &str,
    brand: &BrandStats,
    total_queries: u32,
    intent_totals: &HashMap<IntentBucket, u32>,
    known_brands: &[String],
) -> LeaderboardEntry {
    let name_lower = name.to_lowercase();
    let totals = f64::from(total_queries.max(1));

    let mut intent_scores = IntentScores::default();
    for bucket in IntentBucket::ALL {
        let total = intent_totals.get(&bucket).copied().unwrap_or(0);
        if total > 0 {
            let mentions = brand.intent_mentions.get(&bucket).copied().unwrap_or(0);
            intent_scores.set(bucket, round1(100.0 * f64::from(mentions) / f64::from(total)));
        }
    }

    let (avg_shelf_share, avg_rank) = if brand.mentions > 0 {
        (
            round1(brand.total_shelf_share / f64::from(brand.mentions)),
            round1(brand.rank_sum / f64::from(brand.mentions)),
        )
    } else {
        (0.0, 0.0)
    };

    let mut sources: Vec<(&String, &u32)> = brand.citation_sources.iter().collect();
    sources.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    let dominant_source = sources.first().map(|(domain, _)| (*domain).clone());

    let total_source_citations: u32 = brand.citation_sources.values().sum();
    let rival_citations: u32 = brand
        .citation_sources
        .iter()
        .filter(|(domain, _)| {
            known_brands
                .iter()
                .any(|b| b != &name_lower && is_brand_domain(domain, b))
        })
        .map(|(_, count)| *count)
        .sum();
    let competitor_reliance = if total_source_citations > 0 {
        round1(100.0 * f64::from(rival_citations) / f64::from(total_source_citations))
    } else {
        0.0
    };

    LeaderboardEntry {
        name: name.to_owned(),
        mentions: brand.mentions,
        unique_queries: brand.unique_queries,
        impact_score: round1(100.0 * brand.weighted_score / totals),
        share_of_voice: round1(100.0 * f64::from(brand.unique_queries) / totals),
        avg_shelf_share,
        avg_rank,
        dominant_source,
        competitor_reliance,
        intent_scores,
        rank_change: RankChange::Delta(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ProbeResult, ProbeStatus, ProviderRun, RunStatus};
    use crate::extract::Sentiment;
    use crate::mention::{CompetitorMention, MentionAnalysis};
    use aeolens_core::Intent;
    use aeolens_providers::Provider;

    fn test_config() -> AppConfig {
        AppConfig {
            log_level: "info".to_owned(),
            provider_request_timeout_secs: 10,
            provider_max_retries: 2,
            provider_backoff_base_ms: 0,
            provider_user_agent: "aeolens-test".to_owned(),
            probe_concurrency: 2,
            defense_inter_query_delay_ms: 0,
            leaderboard_size: 15,
            opportunity_limit: 5,
            strength_limit: 15,
        }
    }

    fn analysis(
        mentioned: Option<(u32, Sentiment)>,
        competitors: &[(u32, &str)],
        citations: &[&str],
    ) -> MentionAnalysis {
        let mut a = MentionAnalysis::absent();
        a.competitors_found = competitors
            .iter()
            .map(|(rank, name)| CompetitorMention {
                rank: Rank::Numeric(*rank),
                name: (*name).to_owned(),
            })
            .collect();
        a.citations_found = citations.iter().map(|c| (*c).to_owned()).collect();
        a.total_list_items = a.competitors_found.len();
        if let Some((rank, sentiment)) = mentioned {
            a.mentioned = true;
            a.rank = Rank::Numeric(rank);
            a.sentiment = sentiment;
            a.total_list_items += 1;
        }
        a
    }

    fn probe(keyword: &str, intent: Intent, run_index: u32, analysis: MentionAnalysis) -> ProbeResult {
        ProbeResult {
            provider: Provider::Gemini,
            keyword: keyword.to_owned(),
            intent,
            run_index,
            status: ProbeStatus::Success,
            analysis: Some(analysis),
            prompt_used: String::new(),
            error: None,
        }
    }

    fn batch(results: Vec<ProbeResult>) -> ProbeBatch {
        let mut providers = BTreeMap::new();
        providers.insert(
            Provider::Gemini,
            ProviderRun {
                status: RunStatus::Active,
                skip_reason: None,
                results,
            },
        );
        ProbeBatch { providers }
    }

    #[test]
    fn empty_batch_yields_well_formed_empty_report() {
        let report = analyze_competitors(&batch(Vec::new()), "Twilio", None, &test_config());
        assert_eq!(report.total_queries, 0);
        assert!(report.leaderboard.is_empty());
        assert!(report.strength_urls.is_empty());
        assert!(report.opportunity_urls.is_empty());
        assert!((report.stability_score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn brand_variants_merge_regardless_of_arrival_order() {
        let q1 = probe(
            "SMS API",
            Intent::General,
            1,
            analysis(None, &[(1, "Twilio Inc.")], &[]),
        );
        let q2 = probe(
            "SMS gateway",
            Intent::General,
            1,
            analysis(Some((2, Sentiment::Positive)), &[(1, "Plivo")], &[]),
        );

        for results in [vec![q1.clone(), q2.clone()], vec![q2, q1]] {
            let report = analyze_competitors(&batch(results), "Twilio", None, &test_config());
            let twilio_entries: Vec<_> = report
                .leaderboard
                .iter()
                .filter(|e| e.name.to_lowercase().contains("twilio"))
                .collect();
            assert_eq!(twilio_entries.len(), 1, "variants should merge");
            assert_eq!(twilio_entries[0].mentions, 2);
        }
    }

    #[test]
    fn impact_weights_rank_one_above_lower_ranks() {
        let q = probe(
            "SMS API",
            Intent::General,
            1,
            analysis(Some((2, Sentiment::Neutral)), &[(1, "Plivo")], &[]),
        );
        let report = analyze_competitors(&batch(vec![q]), "Twilio", None, &test_config());

        assert_eq!(report.leaderboard[0].name, "Plivo");
        assert!((report.leaderboard[0].impact_score - 100.0).abs() < f64::EPSILON);
        assert_eq!(report.leaderboard[1].name, "Twilio");
        assert!((report.leaderboard[1].impact_score - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rank_deltas_track_previous_leaderboard() {
        // Previous order: Alpha, Beta, Delta missing (Gamma dropped out).
        let previous: Vec<LeaderboardEntry> = ["Alpha", "Beta", "Gamma"]
            .iter()
            .map(|name| LeaderboardEntry {
                name: (*name).to_owned(),
                mentions: 1,
                unique_queries: 1,
                impact_score: 0.0,
                share_of_voice: 0.0,
                avg_shelf_share: 0.0,
                avg_rank: 0.0,
                dominant_source: None,
                competitor_reliance: 0.0,
                intent_scores: IntentScores::default(),
                rank_change: RankChange::Delta(0),
            })
            .collect();

        // Current impacts: Beta (rank 1) > Alpha (rank 2) > Delta (rank 3).
        let q = probe(
            "SMS API",
            Intent::General,
            1,
            analysis(
                Some((2, Sentiment::Neutral)),
                &[(1, "Beta"), (3, "Delta")],
                &[],
            ),
        );
        let report = analyze_competitors(&batch(vec![q]), "Alpha", Some(&previous), &test_config());

        let by_name: HashMap<&str, &LeaderboardEntry> = report
            .leaderboard
            .iter()
            .map(|e| (e.name.as_str(), e))
            .collect();
        assert_eq!(by_name["Beta"].rank_change, RankChange::Delta(1));
        assert_eq!(by_name["Alpha"].rank_change, RankChange::Delta(-1));
        assert_eq!(by_name["Delta"].rank_change, RankChange::New);
    }

    #[test]
    fn no_previous_leaderboard_means_zero_deltas() {
        let q = probe(
            "SMS API",
            Intent::General,
            1,
            analysis(Some((1, Sentiment::Neutral)), &[], &[]),
        );
        let report = analyze_competitors(&batch(vec![q]), "Twilio", None, &test_config());
        assert_eq!(report.leaderboard[0].rank_change, RankChange::Delta(0));
    }

    #[test]
    fn stability_averages_per_pair_mention_rates() {
        // Pair 1: mentioned in 2 of 3 runs. Pair 2: mentioned in 1 of 1.
        // Mean of 66.67 and 100 rounds to 83.3.
        let mentioned = || analysis(Some((1, Sentiment::Neutral)), &[], &[]);
        let missed = || analysis(None, &[(1, "Plivo")], &[]);
        let results = vec![
            probe("SMS API", Intent::General, 1, mentioned()),
            probe("SMS API", Intent::General, 2, mentioned()),
            probe("SMS API", Intent::General, 3, missed()),
            probe("SMS gateway", Intent::General, 1, mentioned()),
        ];
        let report = analyze_competitors(&batch(results), "Twilio", None, &test_config());
        assert!((report.stability_score - 83.3).abs() < f64::EPSILON);
    }

    #[test]
    fn opportunities_exclude_domains_the_user_already_owns() {
        // Query 1: rival wins, cites g2.com and reviews.example.com.
        let q1 = probe(
            "SMS API",
            Intent::General,
            1,
            analysis(
                None,
                &[(1, "Plivo")],
                &["https://g2.com/plivo", "https://reviews.example.com/x"],
            ),
        );
        // Query 2: user wins and is cited on g2.com, closing that gap.
        let q2 = probe(
            "SMS gateway",
            Intent::General,
            1,
            analysis(Some((1, Sentiment::Positive)), &[], &["https://g2.com/twilio"]),
        );
        let report = analyze_competitors(&batch(vec![q1, q2]), "Twilio", None, &test_config());

        let domains: Vec<&str> = report
            .opportunity_urls
            .iter()
            .map(|o| o.domain.as_str())
            .collect();
        assert_eq!(domains, vec!["example.com"]);
        assert!(report
            .strength_urls
            .iter()
            .any(|s| s.domain == "g2.com" && s.citations == 1));
    }

    #[test]
    fn risk_intent_matrix_counts_only_damaging_user_mentions() {
        let exonerated = probe(
            "SMS API",
            Intent::RiskSecurity,
            1,
            analysis(Some((1, Sentiment::Positive)), &[], &[]),
        );
        let damaging = probe(
            "SMS gateway",
            Intent::RiskSecurity,
            1,
            analysis(Some((1, Sentiment::CriticalWarning)), &[], &[]),
        );
        let report = analyze_competitors(
            &batch(vec![exonerated, damaging]),
            "Twilio",
            None,
            &test_config(),
        );

        // 1 of 2 risk queries counts as exposure.
        assert!((report.leaderboard[0].intent_scores.risk - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn own_domain_citations_are_not_credited_as_sources() {
        let q = probe(
            "SMS API",
            Intent::General,
            1,
            analysis(
                Some((1, Sentiment::Positive)),
                &[],
                &["https://twilio.com/docs", "https://g2.com/twilio"],
            ),
        );
        let report = analyze_competitors(&batch(vec![q]), "Twilio", None, &test_config());
        assert_eq!(
            report.leaderboard[0].dominant_source.as_deref(),
            Some("g2.com")
        );
    }

    #[test]
    fn rank_change_serializes_as_number_or_sentinel() {
        assert_eq!(
            serde_json::to_string(&RankChange::Delta(-2)).expect("serializes"),
            "-2"
        );
        assert_eq!(
            serde_json::to_string(&RankChange::New).expect("serializes"),
            "\"New\""
        );
    }
}

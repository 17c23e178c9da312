//! Ranking extraction from raw answer-engine text.
//!
//! Models are asked for strict JSON but routinely reply with markdown
//! fences, trailing commentary, comments, trailing commas, or plain prose
//! with a numbered list. Extraction runs a strict fallback ladder; each
//! stage is tried only when the prior produced nothing:
//!
//! 1. bracket-balanced scan of the first JSON value, then parse
//! 2. repair pass (comments, trailing commas) on that span
//! 3. direct parse of the full text
//! 4. markdown-fenced `json` block, parse then repair
//! 5. greedy first-`{`…last-`}` / first-`[`…last-`]`, parse then repair
//! 6. regex numbered-list fallback
//!
//! All paths converge on [`ExtractedRanking`]; downstream code never
//! re-inspects the raw response shape.

use regex::Regex;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rank positions past this are regex noise, not a real ranking.
const MAX_PLAUSIBLE_RANK: u32 = 20;

/// Position of a brand within one extracted ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Numeric(u32),
    Unranked,
}

impl Rank {
    #[must_use]
    pub fn as_u32(self) -> Option<u32> {
        match self {
            Rank::Numeric(n) => Some(n),
            Rank::Unranked => None,
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rank::Numeric(n) => write!(f, "{n}"),
            Rank::Unranked => write!(f, "Unranked"),
        }
    }
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rank::Numeric(n) => serializer.serialize_u32(*n),
            Rank::Unranked => serializer.serialize_str("Unranked"),
        }
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(rank_from_value(Some(&value), 0))
    }
}

/// Rank from a loose JSON value: numbers and numeric strings are ranks,
/// anything else is unranked. `fallback_position` (1-based) covers items
/// that omit the field entirely.
fn rank_from_value(value: Option<&Value>, fallback_position: u32) -> Rank {
    match value {
        None => {
            if fallback_position > 0 {
                Rank::Numeric(fallback_position)
            } else {
                Rank::Unranked
            }
        }
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|&n| n > 0)
            .map_or(Rank::Unranked, Rank::Numeric),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .map_or(Rank::Unranked, Rank::Numeric),
        Some(_) => Rank::Unranked,
    }
}

/// Sentiment attached to a ranked brand.
///
/// Models free-type this field, so unknown labels are preserved verbatim
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    CriticalWarning,
    NotAvailable,
    Other(String),
}

impl Sentiment {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
            Sentiment::CriticalWarning => "CRITICAL WARNING",
            Sentiment::NotAvailable => "N/A",
            Sentiment::Other(label) => label,
        }
    }

    /// Parse a model-supplied label, case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            "critical warning" => Sentiment::CriticalWarning,
            "n/a" | "" => Sentiment::NotAvailable,
            _ => Sentiment::Other(label.trim().to_owned()),
        }
    }

    /// Whether the label reads as an explicit exoneration ("safe here",
    /// positive, neutral). Used to suppress risk-intent mention counting.
    #[must_use]
    pub fn indicates_exoneration(&self) -> bool {
        let lower = self.as_str().to_lowercase();
        lower.contains("safe") || lower.contains("positive") || lower.contains("neutral")
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Sentiment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Sentiment::parse(&label))
    }
}

/// One entry of an extracted brand ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingItem {
    pub rank: Rank,
    pub name: String,
    pub description: String,
    pub sentiment: Sentiment,
}

/// Canonical shape every parsing path converges to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRanking {
    pub items: Vec<RankingItem>,
    pub sources: Vec<String>,
}

/// Which ladder stage produced the ranking. The numbered-list fallback is
/// surfaced so callers can flag the result as parsed from unstructured text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    StructuredJson,
    NumberedListFallback,
}

/// Extract a brand ranking from raw provider text.
///
/// Returns `None` when every ladder stage fails; the caller records the
/// probe as unparseable, distinct from a provider failure.
#[must_use]
pub fn extract_ranking(text: &str) -> Option<(ExtractedRanking, ExtractionSource)> {
    if text.trim().is_empty() {
        return None;
    }

    for candidate in json_candidates(text) {
        if let Some(ranking) = ranking_from_value(&candidate) {
            return Some((ranking, ExtractionSource::StructuredJson));
        }
    }

    tracing::debug!("no JSON stage produced a ranking, trying numbered-list fallback");
    rankings_from_numbered_list(text).map(|r| (r, ExtractionSource::NumberedListFallback))
}

/// All successfully parsed JSON values, in ladder order.
fn json_candidates(text: &str) -> Vec<Value> {
    let mut candidates = Vec::new();

    // Stage 1+2: bracket-balanced span, then its repaired form.
    if let Some(span) = balanced_json_span(text) {
        if let Ok(value) = serde_json::from_str(span) {
            candidates.push(value);
        } else if let Some(value) = parse_repaired(span) {
            candidates.push(value);
        }
    }

    // Stage 3: the full text is clean JSON.
    if let Ok(value) = serde_json::from_str(text) {
        candidates.push(value);
    }

    // Stage 4: markdown-fenced block.
    let fence = Regex::new(r"(?s)```json\s*\n(.*?)\n\s*```").expect("valid fence regex");
    if let Some(cap) = fence.captures(text) {
        let content = &cap[1];
        if let Ok(value) = serde_json::from_str(content) {
            candidates.push(value);
        } else if let Some(value) = parse_repaired(content) {
            candidates.push(value);
        }
    }

    // Stage 5: greedy object, then greedy array.
    let greedy_object = Regex::new(r"(?s)(\{.*\})").expect("valid object regex");
    let greedy_array = Regex::new(r"(?s)(\[.*\])").expect("valid array regex");
    for greedy in [&greedy_object, &greedy_array] {
        if let Some(cap) = greedy.captures(text) {
            let content = &cap[1];
            if let Ok(value) = serde_json::from_str(content) {
                candidates.push(value);
            } else if let Some(value) = parse_repaired(content) {
                candidates.push(value);
            }
        }
    }

    candidates
}

/// Locate the first complete JSON value in `text` via a depth counter.
///
/// Walks from the first `{` or `[` (whichever comes first), incrementing on
/// the open character and decrementing on its close; when depth returns to
/// zero the minimal span is complete. Tolerates trailing prose after a
/// well-formed value, the primary recovery path for chatty models.
/// Idempotent: re-extracting its own output returns it unchanged.
#[must_use]
pub fn balanced_json_span(text: &str) -> Option<&str> {
    let text = text.trim();
    let first_brace = text.find('{');
    let first_bracket = text.find('[');

    let (start, open, close) = match (first_brace, first_bracket) {
        (Some(b), Some(k)) if b < k => (b, '{', '}'),
        (Some(b), None) => (b, '{', '}'),
        (_, Some(k)) => (k, '[', ']'),
        (None, None) => return None,
    };

    let mut depth = 0usize;
    for (idx, ch) in text[start..].char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(&text[start..=start + idx]);
            }
        }
    }
    None
}

/// Repair common model-JSON defects and retry the parse: C-style comments
/// and trailing commas before a closing bracket.
fn parse_repaired(json_str: &str) -> Option<Value> {
    let line_comments = Regex::new(r"//[^\n]*").expect("valid comment regex");
    let block_comments = Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex");
    let trailing_commas = Regex::new(r",(\s*[}\]])").expect("valid trailing comma regex");

    let repaired = line_comments.replace_all(json_str, "");
    let repaired = block_comments.replace_all(&repaired, "");
    let repaired = trailing_commas.replace_all(&repaired, "$1");

    serde_json::from_str(&repaired).ok()
}

/// Interpret a parsed JSON value as a ranking.
///
/// Accepts either a bare array of ranking items or an object carrying
/// `ranking` and/or `sources`. Anything else produces nothing so the ladder
/// can keep going.
fn ranking_from_value(value: &Value) -> Option<ExtractedRanking> {
    let (raw_items, sources) = match value {
        Value::Array(items) => (items.as_slice(), Vec::new()),
        Value::Object(map) => {
            if !map.contains_key("ranking") && !map.contains_key("sources") {
                return None;
            }
            let items = map
                .get("ranking")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice);
            let sources = map
                .get("sources")
                .and_then(Value::as_array)
                .map(|urls| {
                    urls.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default();
            (items, sources)
        }
        _ => return None,
    };

    let items: Vec<RankingItem> = raw_items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let map = item.as_object()?;
            let position = u32::try_from(idx + 1).ok()?;
            Some(RankingItem {
                rank: rank_from_value(map.get("rank"), position),
                name: map
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_owned(),
                description: map
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                sentiment: map
                    .get("sentiment")
                    .and_then(Value::as_str)
                    .map_or(Sentiment::Neutral, Sentiment::parse),
            })
        })
        .collect();

    if items.is_empty() && sources.is_empty() {
        return None;
    }

    Some(ExtractedRanking { items, sources })
}

/// Regex fallback for plain-prose numbered lists:
///
/// ```text
/// 1. BrandName - Description
/// 2) **BrandName**: Description
/// ```
fn rankings_from_numbered_list(text: &str) -> Option<ExtractedRanking> {
    let pattern =
        Regex::new(r"^\s*(\d+)[.)]\s*\**([A-Za-z0-9 .&+]+?)\**(?::|-|$)").expect("valid list regex");

    let mut items = Vec::new();
    for line in text.lines() {
        let Some(cap) = pattern.captures(line) else {
            continue;
        };
        let Ok(rank) = cap[1].parse::<u32>() else {
            continue;
        };
        let mut name = cap[2].trim().to_owned();
        // The lazy group can still swallow a dash-separated tagline.
        if let Some((head, _)) = name.split_once(" - ") {
            name = head.trim().to_owned();
        }

        if name.len() <= 1 || rank < 1 || rank >= MAX_PLAUSIBLE_RANK {
            continue;
        }

        // Keep the remainder of the line as an authentic description.
        let description = line
            .find(&name)
            .map(|pos| line[pos + name.len()..].trim_matches([':', '-', ' ', '*']).to_owned())
            .unwrap_or_default();

        items.push(RankingItem {
            rank: Rank::Numeric(rank),
            name,
            description,
            sentiment: Sentiment::Neutral,
        });
    }

    if items.is_empty() {
        return None;
    }

    Some(ExtractedRanking {
        items,
        sources: Vec::new(),
    })
}

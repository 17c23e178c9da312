use serde::{Deserialize, Serialize};

/// Search intent behind a probe query.
///
/// Risk intents are adversarial phrasings appended by the dispatcher when
/// risk analysis is enabled; they collapse into a single [`IntentBucket::Risk`]
/// bucket for the per-intent visibility matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    General,
    Informational,
    Commercial,
    Transactional,
    #[serde(rename = "Risk: Cost")]
    RiskCost,
    #[serde(rename = "Risk: Security")]
    RiskSecurity,
    #[serde(rename = "Risk: Avoidance")]
    RiskAvoidance,
}

impl Intent {
    /// The three adversarial intents used for risk analysis runs.
    pub const RISK_INTENTS: [Intent; 3] = [
        Intent::RiskCost,
        Intent::RiskSecurity,
        Intent::RiskAvoidance,
    ];

    #[must_use]
    pub fn is_risk(self) -> bool {
        matches!(
            self,
            Intent::RiskCost | Intent::RiskSecurity | Intent::RiskAvoidance
        )
    }

    /// Bucket used for intent-matrix tallies.
    #[must_use]
    pub fn bucket(self) -> IntentBucket {
        match self {
            Intent::General => IntentBucket::General,
            Intent::Informational => IntentBucket::Informational,
            Intent::Commercial => IntentBucket::Commercial,
            Intent::Transactional => IntentBucket::Transactional,
            Intent::RiskCost | Intent::RiskSecurity | Intent::RiskAvoidance => IntentBucket::Risk,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Intent::General => "General",
            Intent::Informational => "Informational",
            Intent::Commercial => "Commercial",
            Intent::Transactional => "Transactional",
            Intent::RiskCost => "Risk: Cost",
            Intent::RiskSecurity => "Risk: Security",
            Intent::RiskAvoidance => "Risk: Avoidance",
        };
        write!(f, "{label}")
    }
}

/// Broad intent bucket for the leaderboard visibility matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentBucket {
    General,
    Informational,
    Commercial,
    Transactional,
    Risk,
}

impl IntentBucket {
    pub const ALL: [IntentBucket; 5] = [
        IntentBucket::General,
        IntentBucket::Informational,
        IntentBucket::Commercial,
        IntentBucket::Transactional,
        IntentBucket::Risk,
    ];
}

impl std::fmt::Display for IntentBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IntentBucket::General => "General",
            IntentBucket::Informational => "Informational",
            IntentBucket::Commercial => "Commercial",
            IntentBucket::Transactional => "Transactional",
            IntentBucket::Risk => "Risk",
        };
        write!(f, "{label}")
    }
}

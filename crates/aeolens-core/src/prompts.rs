use crate::Intent;

/// Structured-output contract appended to every visibility prompt.
const JSON_INSTRUCTION: &str = r#"Output strictly in JSON format. Do not use Markdown blocks.
Result Structure:
{
    "ranking": [
        {"rank": 1, "name": "Brand Name", "description": "Short explanation", "sentiment": "Positive/Neutral/Negative"}
    ],
    "sources": ["url1", "url2"]
}"#;

/// Intent-to-prompt-text mapping for visibility probes.
///
/// Prompt authoring is configuration, not probing logic: the dispatcher only
/// ever sees the final rendered string and the intent label. Region and
/// audience are injected into every prompt so answers simulate a real user
/// searching from that context.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    region: String,
    audience: String,
}

impl PromptTemplates {
    #[must_use]
    pub fn new(region: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            audience: audience.into(),
        }
    }

    /// Render the final prompt for one (intent, keyword) probe.
    #[must_use]
    pub fn render(&self, intent: Intent, keyword: &str) -> String {
        let geo = format!(
            "Context: You are acting as a user searching from {}. Prioritize results relevant to this location.",
            self.region
        );
        let base = format!(
            "Return a strictly numbered list of the top 10 BRANDS/COMPANIES only. \
             Do NOT list issues, features, or pros/cons as list items. {JSON_INSTRUCTION}"
        );
        let audience = &self.audience;

        match intent {
            Intent::Informational => format!(
                "{geo} What is {keyword}? Please explain the core concepts and key players who define this space. {base}"
            ),
            Intent::Commercial => format!(
                "{geo} I am looking for the best {keyword} for {audience}. Who are the top contenders? Please compare the top options. {base}"
            ),
            Intent::Transactional => format!(
                "{geo} Where can I sign up for or buy {keyword}? What are the best options for {audience} ready for immediate implementation? {base}"
            ),
            Intent::RiskCost => format!(
                "{geo} Which {keyword} providers are the most expensive or have hidden fees? Which are not worth the money? {base}"
            ),
            Intent::RiskSecurity => format!(
                "{geo} Are there any {keyword} providers with security vulnerabilities, data breaches, or trust issues? Is {keyword} a space with many scams? {base}"
            ),
            Intent::RiskAvoidance => format!(
                "{geo} Why should I avoid certain {keyword} providers? What are common reasons to switch away from popular brands in this space? {base}"
            ),
            Intent::General => format!(
                "{geo} I am looking for recommendations for {keyword}. Who are the top brands or solutions you would suggest? {base}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> PromptTemplates {
        PromptTemplates::new("Germany (DE)", "Startup CTOs")
    }

    #[test]
    fn every_intent_renders_keyword_and_region() {
        let intents = [
            Intent::General,
            Intent::Informational,
            Intent::Commercial,
            Intent::Transactional,
            Intent::RiskCost,
            Intent::RiskSecurity,
            Intent::RiskAvoidance,
        ];
        for intent in intents {
            let prompt = templates().render(intent, "SMS API");
            assert!(prompt.contains("SMS API"), "missing keyword for {intent}");
            assert!(prompt.contains("Germany (DE)"), "missing region for {intent}");
            assert!(
                prompt.contains("strictly in JSON format"),
                "missing JSON contract for {intent}"
            );
        }
    }

    #[test]
    fn commercial_prompt_targets_audience() {
        let prompt = templates().render(Intent::Commercial, "SMS API");
        assert!(prompt.contains("Startup CTOs"));
    }

    #[test]
    fn risk_prompts_probe_negatives() {
        let prompt = templates().render(Intent::RiskAvoidance, "SMS API");
        assert!(prompt.contains("avoid"));
    }
}

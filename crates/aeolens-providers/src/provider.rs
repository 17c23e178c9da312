use serde::{Deserialize, Serialize};

/// Supported AI answer engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
    Gemini,
    #[serde(rename = "ChatGPT")]
    ChatGpt,
    Claude,
    Perplexity,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Gemini,
        Provider::ChatGpt,
        Provider::Claude,
        Provider::Perplexity,
    ];

    /// Environment variable consulted when no explicit key is supplied.
    #[must_use]
    pub fn env_key(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::ChatGpt => "OPENAI_API_KEY",
            Provider::Claude => "ANTHROPIC_API_KEY",
            Provider::Perplexity => "PERPLEXITY_API_KEY",
        }
    }

    /// Cost-effective default model per provider.
    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::ChatGpt => "gpt-4o-mini",
            Provider::Claude => "claude-3-5-haiku-latest",
            Provider::Perplexity => "sonar",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Provider::Gemini => "Gemini",
            Provider::ChatGpt => "ChatGPT",
            Provider::Claude => "Claude",
            Provider::Perplexity => "Perplexity",
        };
        write!(f, "{label}")
    }
}

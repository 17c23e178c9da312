//! HTTP client for the supported answer engines.
//!
//! Wraps `reqwest` with provider-specific request/response shapes and a
//! uniform `query` contract. Each provider's base URL can be overridden to
//! point at a mock server in tests.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use aeolens_core::AppConfig;

use crate::retry::retry_with_backoff;
use crate::{Provider, ProviderError};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CLAUDE_MAX_TOKENS: u32 = 1024;

/// Client over all supported answer engines.
///
/// Holds one `reqwest::Client` plus retry settings from [`AppConfig`]. Use
/// [`ProviderClient::new`] for production or [`ProviderClient::with_base_url`]
/// to point a provider at a wiremock server in tests.
pub struct ProviderClient {
    client: reqwest::Client,
    max_retries: u32,
    backoff_base_ms: u64,
    base_urls: HashMap<Provider, String>,
}

impl ProviderClient {
    /// Creates a client pointed at the production provider endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.provider_user_agent.clone())
            .build()?;

        let base_urls = HashMap::from([
            (Provider::Gemini, GEMINI_BASE_URL.to_owned()),
            (Provider::ChatGpt, OPENAI_BASE_URL.to_owned()),
            (Provider::Claude, ANTHROPIC_BASE_URL.to_owned()),
            (Provider::Perplexity, PERPLEXITY_BASE_URL.to_owned()),
        ]);

        Ok(Self {
            client,
            max_retries: config.provider_max_retries,
            backoff_base_ms: config.provider_backoff_base_ms,
            base_urls,
        })
    }

    /// Overrides one provider's base URL (for testing with wiremock).
    #[must_use]
    pub fn with_base_url(mut self, provider: Provider, base_url: &str) -> Self {
        self.base_urls
            .insert(provider, base_url.trim_end_matches('/').to_owned());
        self
    }

    fn base_url(&self, provider: Provider) -> &str {
        self.base_urls
            .get(&provider)
            .map_or_else(|| "", String::as_str)
    }

    /// One call, one attempt: send `prompt` to `provider` and return the
    /// response text.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Api`] on a non-2xx status or an error envelope
    ///   embedded in the response body.
    /// - [`ProviderError::Http`] on network failure.
    /// - [`ProviderError::Deserialize`] if the body does not match the
    ///   provider's response shape.
    /// - [`ProviderError::EmptyResponse`] if the provider returned no text.
    pub async fn query(
        &self,
        provider: Provider,
        prompt: &str,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        tracing::debug!(%provider, prompt_len = prompt.len(), "answer-engine query");
        match provider {
            Provider::Gemini => self.query_gemini(prompt, api_key).await,
            Provider::ChatGpt => {
                self.query_chat_completions(Provider::ChatGpt, prompt, api_key, None)
                    .await
            }
            Provider::Perplexity => {
                self.query_chat_completions(
                    Provider::Perplexity,
                    prompt,
                    api_key,
                    Some("Be precise and concise."),
                )
                .await
            }
            Provider::Claude => self.query_claude(prompt, api_key).await,
        }
    }

    /// [`ProviderClient::query`] wrapped in the back-off retry schedule.
    ///
    /// # Errors
    ///
    /// Returns the final error after all retries are exhausted. Callers
    /// convert it to a failed probe record; nothing is raised past the
    /// adapter boundary.
    pub async fn query_with_retry(
        &self,
        provider: Provider,
        prompt: &str,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.query(provider, prompt, api_key)
        })
        .await
    }

    async fn query_gemini(&self, prompt: &str, api_key: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url(Provider::Gemini),
            Provider::Gemini.default_model()
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_owned(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;
        let body = Self::check_response(Provider::Gemini, response).await?;

        let parsed: GeminiResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: "gemini generateContent".to_owned(),
                source: e,
            })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::EmptyResponse(Provider::Gemini))
    }

    async fn query_chat_completions(
        &self,
        provider: Provider,
        prompt: &str,
        api_key: &str,
        system: Option<&str>,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url(provider));
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system".to_owned(),
                content: system.to_owned(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_owned(),
            content: prompt.to_owned(),
        });
        let request = ChatRequest {
            model: provider.default_model().to_owned(),
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let body = Self::check_response(provider, response).await?;

        let parsed: ChatResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: format!("{provider} chat/completions"),
                source: e,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::EmptyResponse(provider))
    }

    async fn query_claude(&self, prompt: &str, api_key: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url(Provider::Claude));
        let request = ClaudeRequest {
            model: Provider::Claude.default_model().to_owned(),
            max_tokens: CLAUDE_MAX_TOKENS,
            messages: vec![ChatMessage {
                role: "user".to_owned(),
                content: prompt.to_owned(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;
        let body = Self::check_response(Provider::Claude, response).await?;

        let parsed: ClaudeResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: "claude messages".to_owned(),
                source: e,
            })?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::EmptyResponse(Provider::Claude))
    }

    /// Reads the response body and surfaces failures uniformly: non-2xx
    /// statuses and embedded `"error"` envelopes both become
    /// [`ProviderError::Api`] so the retry layer treats them alike.
    async fn check_response(
        provider: Provider,
        response: reqwest::Response,
    ) -> Result<serde_json::Value, ProviderError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Api {
                provider,
                message: format!("status {status}: {}", truncate(&text, 300)),
            });
        }

        let body: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ProviderError::Deserialize {
                context: format!("{provider} response body"),
                source: e,
            })?;

        if let Some(error) = body.get("error") {
            return Err(ProviderError::Api {
                provider,
                message: truncate(&error.to_string(), 300).to_owned(),
            });
        }

        Ok(body)
    }
}

fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

// Wire shapes. Only the fields this crate reads are modelled.

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    text: Option<String>,
}

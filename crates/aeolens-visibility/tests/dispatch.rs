//! End-to-end probe dispatch against a mocked answer engine.

use aeolens_core::{AppConfig, BrandProfile, Intent, PromptTemplates};
use aeolens_providers::{Provider, ProviderClient, ProviderCredentials};
use aeolens_visibility::{run_visibility_probe, ProbeStatus, Rank, RunStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> AppConfig {
    AppConfig {
        log_level: "info".to_owned(),
        provider_request_timeout_secs: 10,
        provider_max_retries: 0,
        provider_backoff_base_ms: 0,
        provider_user_agent: "aeolens-test".to_owned(),
        probe_concurrency: 2,
        defense_inter_query_delay_ms: 0,
        leaderboard_size: 15,
        opportunity_limit: 5,
        strength_limit: 15,
    }
}

fn test_profile() -> BrandProfile {
    BrandProfile {
        brand: "Twilio".to_owned(),
        keywords: vec!["SMS API".to_owned()],
        competitors: vec!["Plivo".to_owned()],
        intents: vec![Intent::General],
        region: "United States (US)".to_owned(),
        audience: "General Audience".to_owned(),
        runs: 1,
        risk_analysis: false,
    }
}

fn test_client(base_url: &str) -> ProviderClient {
    ProviderClient::new(&test_config())
        .expect("client construction should not fail")
        .with_base_url(Provider::ChatGpt, base_url)
}

// Only ChatGPT gets a key, so only ChatGPT runs. (CI never exports the
// other providers' key variables.)
fn test_credentials() -> ProviderCredentials {
    ProviderCredentials::new().with_key(Provider::ChatGpt, "test-key")
}

fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [ { "message": { "content": content } } ]
    })
}

#[tokio::test]
async fn probe_batch_analyzes_successful_response() {
    let server = MockServer::start().await;

    let ranking = r#"{"ranking":[
        {"rank":1,"name":"Twilio","description":"leading platform","sentiment":"Positive"},
        {"rank":2,"name":"Plivo","description":"cheaper","sentiment":"Neutral"}
    ],"sources":["https://g2.com/sms"]}"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(ranking)))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let profile = test_profile();
    let templates = PromptTemplates::new(&profile.region, &profile.audience);
    let batch = run_visibility_probe(
        &client,
        &profile,
        &templates,
        &test_credentials(),
        &test_config(),
    )
    .await;

    let run = &batch.providers[&Provider::ChatGpt];
    assert_eq!(run.status, RunStatus::Active);
    assert_eq!(run.results.len(), 1);

    let result = &run.results[0];
    assert_eq!(result.status, ProbeStatus::Success);
    assert_eq!(result.keyword, "SMS API");
    assert_eq!(result.intent, Intent::General);

    let analysis = result.analysis.as_ref().expect("success carries analysis");
    assert!(analysis.mentioned);
    assert_eq!(analysis.rank, Rank::Numeric(1));
    assert_eq!(analysis.competitors_found.len(), 1);
    assert_eq!(analysis.citations_found, vec!["https://g2.com/sms"]);
}

#[tokio::test]
async fn providers_without_keys_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("1. Twilio")))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let profile = test_profile();
    let templates = PromptTemplates::new(&profile.region, &profile.audience);
    let batch = run_visibility_probe(
        &client,
        &profile,
        &templates,
        &test_credentials(),
        &test_config(),
    )
    .await;

    assert_eq!(batch.providers.len(), Provider::ALL.len());
    let gemini = &batch.providers[&Provider::Gemini];
    assert_eq!(gemini.status, RunStatus::Skipped);
    assert_eq!(gemini.skip_reason.as_deref(), Some("No API Key"));
    assert!(gemini.results.is_empty());
}

#[tokio::test]
async fn unstructured_prose_uses_regex_fallback() {
    let server = MockServer::start().await;

    let prose = "The top providers are:\n1. Twilio - the leader\n2. Plivo - cost-focused\n";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(prose)))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let profile = test_profile();
    let templates = PromptTemplates::new(&profile.region, &profile.audience);
    let batch = run_visibility_probe(
        &client,
        &profile,
        &templates,
        &test_credentials(),
        &test_config(),
    )
    .await;

    let result = &batch.providers[&Provider::ChatGpt].results[0];
    assert_eq!(result.status, ProbeStatus::Success);
    let analysis = result.analysis.as_ref().expect("fallback still analyzes");
    assert!(analysis.mentioned);
    assert!(analysis.snippet.contains("Regex fallback"));
}

#[tokio::test]
async fn unparseable_response_is_recorded_not_raised() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("No list today.")))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let profile = test_profile();
    let templates = PromptTemplates::new(&profile.region, &profile.audience);
    let batch = run_visibility_probe(
        &client,
        &profile,
        &templates,
        &test_credentials(),
        &test_config(),
    )
    .await;

    let result = &batch.providers[&Provider::ChatGpt].results[0];
    assert_eq!(result.status, ProbeStatus::Unparseable);
    assert!(result.analysis.is_none());
    assert_eq!(batch.successful().count(), 0);
}

#[tokio::test]
async fn provider_failure_becomes_an_error_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let profile = test_profile();
    let templates = PromptTemplates::new(&profile.region, &profile.audience);
    let batch = run_visibility_probe(
        &client,
        &profile,
        &templates,
        &test_credentials(),
        &test_config(),
    )
    .await;

    let result = &batch.providers[&Provider::ChatGpt].results[0];
    assert_eq!(result.status, ProbeStatus::Error);
    assert!(result.error.as_deref().is_some_and(|e| e.contains("503")));
}

#[tokio::test]
async fn runs_multiply_the_probe_matrix() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"ranking":[{"rank":1,"name":"Twilio"}],"sources":[]}"#,
        )))
        .expect(6) // 1 keyword x 3 intents x 2 runs
        .mount(&server)
        .await;

    let mut profile = test_profile();
    profile.intents = vec![Intent::General, Intent::Commercial, Intent::Transactional];
    profile.runs = 2;

    let client = test_client(&server.uri());
    let templates = PromptTemplates::new(&profile.region, &profile.audience);
    let batch = run_visibility_probe(
        &client,
        &profile,
        &templates,
        &test_credentials(),
        &test_config(),
    )
    .await;

    let run = &batch.providers[&Provider::ChatGpt];
    assert_eq!(run.results.len(), 6);
    assert!(run.results.iter().all(|r| r.status == ProbeStatus::Success));
}

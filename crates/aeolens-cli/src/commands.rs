//! Command handlers for the CLI.
//!
//! These are called from `main` after config and logging are established.
//! Per-probe failures are recorded inside the reports rather than
//! propagated, so a single dead provider never aborts the run.

use std::path::Path;

use aeolens_core::{AppConfig, BrandProfile, PromptTemplates};
use aeolens_providers::{ProviderClient, ProviderCredentials};
use aeolens_visibility::{
    analyze_competitors, evaluate_page_index, run_branded_simulation, run_visibility_probe,
    AggregateReport,
};

/// Run the full visibility probe matrix and print or write the report.
///
/// # Errors
///
/// Returns an error if the profile or previous report cannot be loaded, or
/// the HTTP client cannot be constructed. Provider failures surface as
/// error records inside the report.
pub(crate) async fn run_visibility(
    config: &AppConfig,
    profile_path: &Path,
    previous_path: Option<&Path>,
    output: Option<&Path>,
    runs: Option<u32>,
    risk: bool,
) -> anyhow::Result<()> {
    let mut profile = BrandProfile::from_yaml_file(profile_path)?;
    tracing::info!(
        brand = %profile.brand,
        keywords = profile.keywords.len(),
        "loaded brand profile"
    );
    if let Some(runs) = runs {
        profile.runs = runs;
        profile.validate()?;
    }
    if risk {
        profile.risk_analysis = true;
    }

    let previous: Option<AggregateReport> = match previous_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read previous report {}: {e}", path.display()))?;
            Some(serde_json::from_str(&content)?)
        }
        None => None,
    };

    let templates = PromptTemplates::new(&profile.region, &profile.audience);
    let credentials = ProviderCredentials::new();
    let client = ProviderClient::new(config)?;

    let batch = run_visibility_probe(&client, &profile, &templates, &credentials, config).await;
    let report = analyze_competitors(
        &batch,
        &profile.brand,
        previous.as_ref().map(|r| r.leaderboard.as_slice()),
        config,
    );

    println!(
        "{}: {} queries, stability {:.1}, {} brands on the leaderboard",
        profile.brand,
        report.total_queries,
        report.stability_score,
        report.leaderboard.len()
    );
    if let Some(top) = report.leaderboard.first() {
        println!("top brand: {} (impact {:.1})", top.name, top.impact_score);
    }

    emit(output, &serde_json::json!({ "probes": batch, "report": report }))
}

/// Run the branded defense simulation.
///
/// # Errors
///
/// Returns an error if the profile cannot be loaded or the HTTP client
/// cannot be constructed.
pub(crate) async fn run_defense(
    config: &AppConfig,
    profile_path: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let profile = BrandProfile::from_yaml_file(profile_path)?;
    let credentials = ProviderCredentials::new();
    let client = ProviderClient::new(config)?;

    let report = run_branded_simulation(&client, &profile, &credentials, config).await;

    println!(
        "{}: moat {:.1} across {} branded queries",
        profile.brand,
        report.moat_score,
        report.results.len()
    );
    for (competitor, count) in &report.leakage_counts {
        println!("leak: {competitor} appeared in {count} answers");
    }

    emit(output, &report)
}

/// Score one page against the answer engines.
///
/// # Errors
///
/// Returns an error if the profile cannot be loaded or the HTTP client
/// cannot be constructed.
pub(crate) async fn run_page_index(
    config: &AppConfig,
    profile_path: &Path,
    url: &str,
    page_type: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let profile = BrandProfile::from_yaml_file(profile_path)?;
    let credentials = ProviderCredentials::new();
    let client = ProviderClient::new(config)?;

    let report =
        evaluate_page_index(&client, &credentials, config, &profile.brand, url, page_type).await;

    println!(
        "{url}: index score {:.1} across {} providers",
        report.index_score,
        report.results.len()
    );

    emit(output, &report)
}

/// Write a report as pretty JSON to `output`, or to stdout when no path
/// was given.
fn emit<T: serde::Serialize>(output: Option<&Path>, report: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
            println!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

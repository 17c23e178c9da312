use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "aeolens")]
#[command(about = "AI answer-engine brand visibility toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Probe the answer engines and build the competitive leaderboard.
    Visibility {
        /// Path to the brand profile YAML file.
        #[arg(long)]
        profile: PathBuf,
        /// Previous visibility report, for rank-movement deltas.
        #[arg(long)]
        previous: Option<PathBuf>,
        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Override the profile's stability-run count.
        #[arg(long)]
        runs: Option<u32>,
        /// Force risk-intent probing on, regardless of the profile.
        #[arg(long)]
        risk: bool,
    },
    /// Run the branded defense simulation and compute the moat score.
    Defense {
        #[arg(long)]
        profile: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score how well one page is indexed by the answer engines.
    PageIndex {
        #[arg(long)]
        profile: PathBuf,
        /// The page to score.
        #[arg(long)]
        url: String,
        /// Page type: pricing, about, contact, blog, or anything else.
        #[arg(long, default_value = "landing")]
        page_type: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = aeolens_core::load_app_config_from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Visibility {
            profile,
            previous,
            output,
            runs,
            risk,
        } => {
            commands::run_visibility(
                &config,
                &profile,
                previous.as_deref(),
                output.as_deref(),
                runs,
                risk,
            )
            .await
        }
        Commands::Defense { profile, output } => {
            commands::run_defense(&config, &profile, output.as_deref()).await
        }
        Commands::PageIndex {
            profile,
            url,
            page_type,
            output,
        } => {
            commands::run_page_index(&config, &profile, &url, &page_type, output.as_deref()).await
        }
    }
}

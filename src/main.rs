mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calgen_core::config::Settings;
use calgen_core::event_range::EventRange;
use calgen_core::export::ExportFormat;
use calgen_core::llm::ProviderKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calgen")]
#[command(about = "Generate synthetic calendar users and events with an LLM and store them in Redis")]
struct Cli {
    /// Config file (defaults to ~/.config/calgen/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output, including the prompts sent
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate users and their events
    Generate {
        /// Number of users to generate
        #[arg(short, long)]
        users: Option<u32>,

        /// LLM provider (openai or deepseek); defaults to the first with an API key
        #[arg(short, long)]
        provider: Option<ProviderKind>,

        /// Events per user, e.g. "2-4"
        #[arg(short, long)]
        events: Option<EventRange>,

        /// Build prompts without calling the provider or writing to Redis
        #[arg(long)]
        dry_run: bool,

        /// Skip exporting after the run
        #[arg(long)]
        no_export: bool,
    },
    /// Show how many users and events are stored
    Stats,
    /// Delete all generated data
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Export stored data to files
    Export {
        /// Output format, repeatable (json, csv)
        #[arg(short, long = "format")]
        formats: Vec<ExportFormat>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check Redis and every configured LLM provider
    TestConnection,
    /// Show config paths and provider status
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Generate {
            users,
            provider,
            events,
            dry_run,
            no_export,
        } => {
            let args = commands::generate::Args {
                users: users.unwrap_or(settings.generation.users),
                provider,
                events_per_user: events.unwrap_or(settings.generation.events_per_user),
                dry_run,
                export: !no_export,
            };
            commands::generate::run(&settings, args).await
        }
        Commands::Stats => commands::stats::run(&settings).await,
        Commands::Clear { force } => commands::clear::run(&settings, force).await,
        Commands::Export { formats, output } => {
            let formats = if formats.is_empty() {
                settings.generation.formats.clone()
            } else {
                formats
            };
            let output = output.unwrap_or_else(|| settings.generation.output_dir.clone());
            commands::export::run(&settings, &formats, &output).await
        }
        Commands::TestConnection => commands::test_connection::run(&settings).await,
        Commands::Config => commands::config::run(&settings, cli.config.as_deref()),
    }
}

/// Logs go to stderr. `CALGEN_LOG` takes the usual filter directives.
fn init_tracing(verbose: bool) {
    let default = if verbose { "calgen=debug,calgen_core=debug" } else { "calgen=info,calgen_core=info" };
    let filter = EnvFilter::try_from_env("CALGEN_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

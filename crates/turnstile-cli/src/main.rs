//! turnstile - runs request queue scenarios and shows the effective config

mod demo;

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use turnstile_core::App;

use crate::demo::Scenario;

#[derive(Debug, Parser)]
#[command(
    name = "turnstile",
    about = "Bounded-concurrency request queue with priorities and wait timeouts",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scenario against a fresh queue and print what happened
    Demo {
        #[arg(value_enum, default_value_t = Scenario::All)]
        scenario: Scenario,
    },

    /// Print the queue configuration loaded from the environment as JSON
    Config,
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // stdout carries the demo output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    setup_logging(cli.verbose);

    let app = App::from_env().context("Failed to load queue configuration")?;
    info!(
        queue = %app.queue.config().name,
        max_concurrency = app.queue.config().max_concurrency,
        default_timeout_ms = ?app.queue.config().default_timeout_ms,
        "turnstile: configuration loaded"
    );

    match cli.command {
        Command::Demo { scenario } => demo::run(scenario, &app).await,
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(app.queue.config())?);
            Ok(())
        }
    }
}

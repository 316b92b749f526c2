//! gups CLI - reviewer assignment sweeps
//!
//! Picks reviewers for open pull requests from configured pools and tells
//! everyone who owes a review.

mod commands;
mod slack;
mod sweep;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gups_core::{Config, Secrets};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{CheckArgs, SweepArgs};

/// gups: assign pull request reviewers from configured pools
#[derive(Parser, Debug)]
#[command(name = "gups")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file (overrides GUPS_CONFIG and the default path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Assign reviewers to open pull requests and send digests
    #[command(visible_alias = "s")]
    Sweep(SweepArgs),

    /// Validate the configuration
    Check(CheckArgs),

    /// Show current configuration location
    Config,

    /// Create a secrets file template
    InitSecrets,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("gups {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Sweep(args)) => {
            let config = Config::load(cli.config)?;
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Check(args)) => {
            let config = Config::load(cli.config)?;
            args.execute(&config).await?;
        }
        Some(Commands::Config) => {
            println!("gups Configuration");
            println!("==================");
            println!();
            match Config::resolve_path(cli.config) {
                Some(path) => {
                    println!("Config file: {}", path.display());
                    if path.exists() {
                        let config = Config::load_from_file(&path)?;
                        println!("  users: {}", config.users.len());
                        println!("  pools: {}", config.pools.len());
                        println!("  rules: {}", config.rules.len());
                        println!("  repos: {}", config.repos.len());
                    } else {
                        println!("  (not found)");
                    }
                }
                None => println!("Config file: (no config directory)"),
            }
            if let Some(path) = Secrets::default_secrets_path() {
                println!();
                println!("Secrets file: {}", path.display());
                if !path.exists() {
                    println!("  (not found - run `gups init-secrets`)");
                }
            }
        }
        Some(Commands::InitSecrets) => {
            let path = Secrets::create_template()?;
            println!("Created {}", path.display());
        }
        None => {
            println!("gups - pull request reviewer sweeps");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

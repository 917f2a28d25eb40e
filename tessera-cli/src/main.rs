use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(about = "Tessera CLI - score and balance region assignments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every command
#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Cluster description (JSON)
    #[arg(short, long)]
    cluster: PathBuf,

    /// Balancer configuration (TOML)
    #[arg(long, env = "TESSERA_CONFIG")]
    config: Option<PathBuf>,

    /// Host to rack table (TOML)
    #[arg(long)]
    racks: Option<PathBuf>,
}

impl InputArgs {
    fn load(&self) -> Result<commands::LoadedInputs> {
        commands::load_inputs(&self.cluster, self.config.as_deref(), self.racks.as_deref())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether the assignment is worth balancing
    NeedsBalance {
        #[command(flatten)]
        input: InputArgs,

        /// Table name for log output
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Print the weighted cost breakdown of the assignment
    Cost {
        #[command(flatten)]
        input: InputArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Search for a cheaper assignment and print the region moves
    Balance {
        #[command(flatten)]
        input: InputArgs,

        /// Write the full result as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::NeedsBalance { input, table } => {
            commands::run_needs_balance(&input.load()?, table.as_deref())?;
        }
        Commands::Cost { input, json } => {
            commands::run_cost(&input.load()?, json)?;
        }
        Commands::Balance {
            input,
            output,
            seed,
        } => {
            let mut loaded = input.load()?;
            if seed.is_some() {
                loaded.config.seed = seed;
            }
            commands::run_balance(&loaded, output.as_deref())?;
        }
    }

    Ok(())
}

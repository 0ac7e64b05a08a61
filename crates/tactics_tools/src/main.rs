//! Grid Tactics - Development Tools

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tactics_core::grid::GridCoord;
use tactics_core::unit::UnitId;
use tactics_tools::{inspect, validate};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "tactics-tools")]
#[command(about = "Development tools for Grid Tactics")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Print the tiles a unit can reach
    Reach {
        /// Scenario file
        scenario: PathBuf,
        /// Unit id, as numbered in spawn order from 1
        unit: u32,
        /// Balancing file
        #[arg(long, default_value = "assets/data/balancing.ron")]
        balancing: PathBuf,
    },
    /// Print the best route for a unit to a tile
    Route {
        /// Scenario file
        scenario: PathBuf,
        /// Unit id, as numbered in spawn order from 1
        unit: u32,
        /// Destination column
        x: i32,
        /// Destination row
        y: i32,
        /// Balancing file
        #[arg(long, default_value = "assets/data/balancing.ron")]
        balancing: PathBuf,
    },
}

fn run(command: Commands) -> tactics_tools::Result<()> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            let report = validate::validate_data_directory(&path)?.into_result()?;
            tracing::info!(warnings = report.warnings.len(), "Validation passed");
        }
        Commands::Reach {
            scenario,
            unit,
            balancing,
        } => {
            let session = inspect::load_session(&balancing, &scenario)?;
            println!("{}", inspect::describe_unit(&session, UnitId(unit))?);
            print!("{}", inspect::render_reach(&session, UnitId(unit))?);
        }
        Commands::Route {
            scenario,
            unit,
            x,
            y,
            balancing,
        } => {
            let session = inspect::load_session(&balancing, &scenario)?;
            println!("{}", inspect::describe_unit(&session, UnitId(unit))?);
            print!("{}", inspect::render_route(&session, UnitId(unit), GridCoord::new(x, y))?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

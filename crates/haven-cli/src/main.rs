//! # haven CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Uses clap derive macros for argument parsing.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Haven — tenancy lifecycle services.
///
/// Runs the API server for application review, lease execution, payment
/// settlement, and notification delivery, plus one-shot operational
/// tasks.
#[derive(Parser, Debug)]
#[command(name = "haven", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the API server (configuration from HAVEN_* env vars).
    Serve(ServeArgs),

    /// Run one overdue sweep against the configured database and exit.
    Sweep,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Listen port; overrides HAVEN_PORT.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => run_serve(args),
        Commands::Sweep => run_sweep(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = haven_api::bootstrap::config_from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(haven_api::bootstrap::run(config))?;
    Ok(())
}

fn run_sweep() -> anyhow::Result<()> {
    let config = haven_api::bootstrap::config_from_env();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let pool = haven_api::db::init_pool().await?;
        let state = haven_api::state::AppState::with_config(config, pool);
        if let Some(pool) = state.db_pool.clone() {
            let (applications, leases, payments, notifications) =
                haven_api::db::load_state(&pool).await?;
            state.hydrate(applications, leases, payments, notifications);
        }
        let report = haven_api::sweep::run_sweep(&state).await;
        tracing::info!(
            marked_overdue = report.marked_overdue,
            rent_materialized = report.rent_materialized,
            failures = report.failures,
            "sweep finished"
        );
        Ok::<_, anyhow::Error>(())
    })?;
    Ok(())
}

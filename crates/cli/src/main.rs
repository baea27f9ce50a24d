use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::{
    CalibrateArgs, LinesArgs, PredictArgs, SimulateArgs, SizeBetArgs, WatchArgs,
};

#[derive(Parser)]
#[command(name = "progno")]
#[command(about = "Sports prediction engine: ensemble, simulation, sizing and calibration", long_about = None)]
struct Cli {
    /// Directory holding Progno.toml and profile overrides
    #[arg(long, global = true, default_value = "config", env = "PROGNO_CONFIG_DIR")]
    config_dir: PathBuf,

    /// Configuration profile (loads Progno.<profile>.toml on top)
    #[arg(long, global = true, env = "PROGNO_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ensemble on one game
    Predict(PredictArgs),
    /// Run the Monte Carlo simulation on one game and size the consensus bet
    Simulate(SimulateArgs),
    /// Size a bet with fractional Kelly
    SizeBet(SizeBetArgs),
    /// Grid-search calibration parameters against historical games
    Calibrate(CalibrateArgs),
    /// Consensus line, outliers and arbitrage across sources
    Lines(LinesArgs),
    /// Hot-reload the parameter file and re-predict on every change
    Watch(WatchArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(&cli.config_dir, cli.profile.as_deref())?;

    match cli.command {
        Commands::Predict(args) => commands::predict::run(args, &config)?,
        Commands::Simulate(args) => commands::simulate::run(args, &config)?,
        Commands::SizeBet(args) => commands::size_bet::run(args, &config)?,
        Commands::Calibrate(args) => commands::calibrate::run(args, &config).await?,
        Commands::Lines(args) => commands::lines::run(args)?,
        Commands::Watch(args) => commands::watch::run(args, &config).await?,
    }

    Ok(())
}

//! `progno watch`: re-predict a game whenever the parameter file changes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use progno_core::{AppConfig, ParameterStore, ParameterWatcher};
use progno_signals::Aggregator;

use super::{load_game, load_parameters};

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Game context JSON file
    #[arg(short, long)]
    pub game: PathBuf,
}

pub async fn run(args: WatchArgs, config: &AppConfig) -> Result<()> {
    let ctx = load_game(&args.game)?;
    let store = ParameterStore::new(load_parameters(config)?);
    let mut rx = store.subscribe();

    let watcher = ParameterWatcher::new(store.clone(), &config.parameters_path);
    let mut watch_task = tokio::spawn(watcher.watch());

    tracing::info!(path = %config.parameters_path, "Watching parameter file (Ctrl-C to stop)");
    let mut aggregator = Aggregator::standard(store.current());
    super::predict::print_summary(&ctx.home_team, &ctx.away_team, &aggregator.predict(&ctx));

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let params = rx.borrow_and_update().clone();
                tracing::info!(id = %params.id, "Parameters reloaded");
                aggregator = Aggregator::standard(params);
                super::predict::print_summary(&ctx.home_team, &ctx.away_team, &aggregator.predict(&ctx));
            }
            res = &mut watch_task => {
                res.context("Parameter watcher panicked")??;
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    watch_task.abort();
    Ok(())
}

use std::time::Duration;

use anyhow::{Context, Result};
use replaydb_core::ReplayDb;
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::service::{reclaimer, watcher, worker};

pub async fn handle_serve(config: Config) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let (ready_tx, ready_rx) = watch::channel(false);

    let worker_task = tokio::spawn(worker::run(
        config.replay_folder.clone(),
        config.db_path.clone(),
        config.max_chunk_size,
        rx,
        ready_tx,
    ));
    let watcher_task = tokio::spawn(watcher::run(
        config.replay_folder.clone(),
        tx,
        ready_rx.clone(),
    ));
    let reclaimer_task = tokio::spawn(reclaimer::run(
        config.replay_folder.clone(),
        config.min_free_space_ratio,
        config.min_replay_retention_bytes,
        config.min_expected_disk_bytes,
        Duration::from_secs(config.clean_interval_seconds),
        ready_rx,
    ));

    let (worker_res, watcher_res, reclaimer_res) =
        tokio::join!(worker_task, watcher_task, reclaimer_task);
    worker_res.context("worker task panicked")??;
    watcher_res.context("watcher task panicked")??;
    reclaimer_res.context("reclaimer task panicked")??;
    Ok(())
}

pub fn handle_reconcile(config: Config) -> Result<()> {
    let mut db = ReplayDb::open(&config.replay_folder, &config.db_path, config.max_chunk_size)?;
    db.reconcile()?;
    tracing::info!(total = db.len(), "reconcile complete");
    Ok(())
}

pub fn handle_list(config: Config) -> Result<()> {
    let db = ReplayDb::open(&config.replay_folder, &config.db_path, config.max_chunk_size)?;
    for replay in db.list() {
        println!(
            "{}  {}  downloadable={}",
            replay.finished_at().to_rfc3339(),
            replay.filename(),
            replay.downloadable()
        );
    }
    Ok(())
}

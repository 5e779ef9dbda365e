//! Worker task: owns the index exclusively. Runs the initial reconciliation,
//! releases the ready latch, then serializes every subsequent ingest + save.
use std::path::PathBuf;

use anyhow::Result;
use replaydb_core::ReplayDb;
use tokio::sync::{mpsc, watch};

pub async fn run(
    replay_folder: PathBuf,
    db_path: PathBuf,
    max_chunk_size: usize,
    mut rx: mpsc::UnboundedReceiver<String>,
    ready_tx: watch::Sender<bool>,
) -> Result<()> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<String>();

    let forward = tokio::spawn(async move {
        while let Some(filename) = rx.recv().await {
            if std_tx.send(filename).is_err() {
                break;
            }
        }
    });

    let worker = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut db = ReplayDb::open(&replay_folder, &db_path, max_chunk_size)?;
        db.reconcile()?;
        tracing::info!(total = db.len(), "worker: index ready");
        let _ = ready_tx.send(true);

        for filename in std_rx {
            match db.ingest(&filename).and_then(|_| db.save()) {
                Ok(()) => tracing::debug!(filename, "worker: ingested"),
                Err(e) => tracing::warn!(filename, error = %e, "worker: ingest failed"),
            }
        }
        Ok(())
    });

    let (_, worker_result) = tokio::join!(forward, worker);
    worker_result??;
    Ok(())
}

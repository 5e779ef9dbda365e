//! Filesystem watcher task: waits for the index-ready latch, then forwards
//! present/absent filename events onto the worker's queue until the watch is lost.
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};

pub async fn run(
    replay_folder: PathBuf,
    tx: mpsc::UnboundedSender<String>,
    mut ready: watch::Receiver<bool>,
) -> Result<()> {
    ready.wait_for(|r| *r).await?;
    tracing::info!(folder = %replay_folder.display(), "watcher: starting");

    tokio::task::spawn_blocking(move || watch_blocking(&replay_folder, &tx)).await?
}

fn watch_blocking(replay_folder: &Path, tx: &mpsc::UnboundedSender<String>) -> Result<()> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = std_tx.send(res);
    })?;
    watcher.watch(replay_folder, RecursiveMode::NonRecursive)?;

    for res in std_rx {
        let event = res.map_err(|e| anyhow!("watcher: filesystem watch lost: {e}"))?;
        if !is_relevant(&event.kind) {
            continue;
        }
        for path in &event.paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(".rep") || name.ends_with(".rep.zip") {
                if tx.send(name.to_string()).is_err() {
                    return Ok(());
                }
            }
        }
    }
    Err(anyhow!("watcher: notify channel closed unexpectedly"))
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

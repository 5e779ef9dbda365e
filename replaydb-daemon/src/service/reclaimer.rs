//! Space reclaimer task (C7): periodically frees disk space by deleting the
//! oldest `.rep.zip` files, never crossing the retention floor. Scans the replay
//! directory directly; never touches the index.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use replaydb_core::filename::parse_finished_at_with_fallback;
use tokio::sync::watch;

pub async fn run(
    replay_folder: PathBuf,
    min_free_space_ratio: f64,
    min_replay_retention_bytes: u64,
    min_expected_disk_bytes: u64,
    interval: Duration,
    mut ready: watch::Receiver<bool>,
) -> Result<()> {
    ready.wait_for(|r| *r).await?;
    loop {
        if let Err(e) = clean_once(
            &replay_folder,
            min_free_space_ratio,
            min_replay_retention_bytes,
            min_expected_disk_bytes,
        ) {
            tracing::warn!(error = %e, "reclaimer: pass failed, continuing");
        }
        tokio::time::sleep(interval).await;
    }
}

fn clean_once(
    replay_folder: &Path,
    min_free_space_ratio: f64,
    min_replay_retention_bytes: u64,
    min_expected_disk_bytes: u64,
) -> Result<()> {
    let total = fs2::total_space(replay_folder)?;
    let free = fs2::available_space(replay_folder)?;
    if total == 0 || free > total || total < min_expected_disk_bytes {
        tracing::debug!(total, free, "reclaimer: disk usage reading invalid, skipping pass");
        return Ok(());
    }

    let shortfall = (min_free_space_ratio - (free as f64 / total as f64)) * total as f64;
    if shortfall <= 0.0 {
        return Ok(());
    }
    let shortfall = shortfall as u64;

    let mut entries = enumerate_replays(replay_folder)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    let total_bytes: u64 = entries.iter().map(|(_, _, size)| *size).sum();

    let mut freed: u64 = 0;
    for (_, name, size) in entries {
        if freed >= shortfall || total_bytes.saturating_sub(freed) < min_replay_retention_bytes {
            break;
        }
        let path = replay_folder.join(&name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                freed += size;
                tracing::info!(filename = %name, size, "reclaimer: evicted");
            }
            Err(e) => tracing::warn!(filename = %name, error = %e, "reclaimer: failed to evict"),
        }
    }
    Ok(())
}

fn enumerate_replays(replay_folder: &Path) -> Result<Vec<(DateTime<Utc>, String, u64)>> {
    let fallback = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
    let mut out = Vec::new();
    for entry in std::fs::read_dir(replay_folder)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".rep.zip") {
            continue;
        }
        let size = entry.metadata()?.len();
        let finished_at = parse_finished_at_with_fallback(&name, fallback);
        out.push((finished_at, name, size));
    }
    Ok(out)
}

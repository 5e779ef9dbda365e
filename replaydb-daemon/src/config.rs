//! Environment-driven configuration, parsed once at process start into an
//! immutable value shared by the watcher, worker and reclaimer tasks.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Chunk size for the persistent index; not externally configurable.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 256;

#[derive(Clone, Debug)]
pub struct Config {
    pub replay_folder: PathBuf,
    pub db_path: PathBuf,
    pub min_free_space_ratio: f64,
    pub min_replay_retention_bytes: u64,
    pub min_expected_disk_bytes: u64,
    pub clean_interval_seconds: u64,
    pub max_chunk_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let replay_folder = PathBuf::from(env_var("REPLAY_FOLDER")?);
        let db_path = PathBuf::from(env_var("DB_PATH")?);
        let min_free_space_ratio: f64 = env_var("MIN_FREE_SPACE_RATIO")?
            .parse()
            .context("MIN_FREE_SPACE_RATIO must be a float")?;
        let min_retention_mib: u64 = env_var("MIN_REPLAY_RETENTION_MiB")?
            .parse()
            .context("MIN_REPLAY_RETENTION_MiB must be an integer")?;
        let min_expected_disk_gib: u64 = env_var("MIN_EXPECTED_DISK_GiB")?
            .parse()
            .context("MIN_EXPECTED_DISK_GiB must be an integer")?;
        let clean_interval_seconds: u64 = env_var("CLEAN_INTERVAL_SECONDS")?
            .parse()
            .context("CLEAN_INTERVAL_SECONDS must be an integer")?;

        validate(min_free_space_ratio, clean_interval_seconds)?;

        Ok(Self {
            replay_folder,
            db_path,
            min_free_space_ratio,
            min_replay_retention_bytes: min_retention_mib * 1024 * 1024,
            min_expected_disk_bytes: min_expected_disk_gib * 1024 * 1024 * 1024,
            clean_interval_seconds,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        })
    }
}

fn validate(min_free_space_ratio: f64, clean_interval_seconds: u64) -> Result<()> {
    if !(min_free_space_ratio > 0.0 && min_free_space_ratio < 1.0) {
        bail!(
            "MIN_FREE_SPACE_RATIO must lie strictly between 0 and 1, got {min_free_space_ratio}"
        );
    }
    if clean_interval_seconds == 0 {
        bail!("CLEAN_INTERVAL_SECONDS must be greater than 0");
    }
    Ok(())
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ratio_outside_open_interval() {
        assert!(validate(0.0, 60).is_err());
        assert!(validate(1.0, 60).is_err());
        assert!(validate(-0.1, 60).is_err());
        assert!(validate(0.2, 60).is_ok());
    }

    #[test]
    fn rejects_zero_interval() {
        assert!(validate(0.2, 0).is_err());
        assert!(validate(0.2, 1).is_ok());
    }
}

//! The index manifest (`replays_header.json`): the commit point of a save.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReplayDbError, Result};

pub const HEADER_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub filename: String,
    pub oldest_replay_ts: DateTime<Utc>,
    pub latest_replay_ts: DateTime<Utc>,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub total_count: usize,
    pub max_chunk_size: usize,
    pub chunk_headers: Vec<ChunkHeader>,
}

impl Manifest {
    pub fn empty(max_chunk_size: usize) -> Self {
        Self {
            version: HEADER_VERSION,
            updated_at: Utc::now(),
            total_count: 0,
            max_chunk_size,
            chunk_headers: Vec::new(),
        }
    }

    /// Checks version and configured chunk size agreement, and that the declared
    /// total equals the sum of per-chunk counts. Either mismatch is fatal.
    pub fn validate(&self, expected_max_chunk_size: usize) -> Result<()> {
        if self.version != HEADER_VERSION {
            return Err(ReplayDbError::ManifestVersionMismatch(self.version));
        }
        if self.max_chunk_size != expected_max_chunk_size {
            return Err(ReplayDbError::ManifestConsistencyError(format!(
                "configured max_chunk_size {expected_max_chunk_size} does not match manifest's {}",
                self.max_chunk_size
            )));
        }
        let summed: usize = self.chunk_headers.iter().map(|c| c.count).sum();
        if summed != self.total_count {
            return Err(ReplayDbError::ManifestConsistencyError(format!(
                "total_count {} does not match sum of chunk counts {summed}",
                self.total_count
            )));
        }
        Ok(())
    }
}

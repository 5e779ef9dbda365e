//! Replay index data model.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub score: i32,
    pub team: i32,
    pub steam_id: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayMetadata {
    pub protocol_version: u32,
    pub host_name: String,
    pub game_mode: String,
    pub map_steam_id: u64,
    pub map_title: String,
    pub players: Vec<Player>,
    pub marker_count: u32,
    pub started_at: DateTime<Utc>,
}

/// One recorded game session.
///
/// Identity is the filename alone: two `Replay`s with the same `filename` are the
/// same record, regardless of `downloadable` or `metadata`. `filename` and
/// `finished_at` never change after construction; `downloadable` is the only
/// mutable field.
#[derive(Clone, Debug)]
pub struct Replay {
    filename: String,
    finished_at: DateTime<Utc>,
    downloadable: bool,
    metadata: Option<ReplayMetadata>,
}

impl Replay {
    pub fn new(
        filename: String,
        finished_at: DateTime<Utc>,
        downloadable: bool,
        metadata: Option<ReplayMetadata>,
    ) -> Self {
        Self {
            filename,
            finished_at,
            downloadable,
            metadata,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn downloadable(&self) -> bool {
        self.downloadable
    }

    pub fn metadata(&self) -> Option<&ReplayMetadata> {
        self.metadata.as_ref()
    }

    /// Returns `true` if the flag actually changed (used to decide dirtiness).
    pub fn set_downloadable(&mut self, value: bool) -> bool {
        if self.downloadable == value {
            return false;
        }
        self.downloadable = value;
        true
    }
}

impl PartialEq for Replay {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename
    }
}
impl Eq for Replay {}

impl std::hash::Hash for Replay {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.filename.hash(state);
    }
}

/// Orders by (`finished_at`, `filename`); ties broken deterministically by
/// filename.
impl PartialOrd for Replay {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Replay {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.finished_at
            .cmp(&other.finished_at)
            .then_with(|| self.filename.cmp(&other.filename))
    }
}

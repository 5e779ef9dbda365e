//! Dual in-memory index over replay records (C5): a filename map for identity
//! lookups and a time-ordered sequence supporting binary-search insertion and rank
//! queries. Backed by a single sorted `Vec`, so insertion is `O(n)` to shift; lookup
//! and rank are `O(log n)` via `binary_search_by`.
use std::collections::{HashMap, HashSet};

use crate::domain::Replay;

#[derive(Debug, Default)]
pub struct ReplayIndex {
    by_filename: HashMap<String, Replay>,
    order: Vec<String>,
    dirty_added: HashSet<String>,
    dirty_mutated: HashSet<String>,
}

impl ReplayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.by_filename.contains_key(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&Replay> {
        self.by_filename.get(filename)
    }

    /// Position of `filename` in time order, or `None` if not indexed.
    pub fn index_of(&self, filename: &str) -> Option<usize> {
        let replay = self.by_filename.get(filename)?;
        self.rank_of(replay).ok()
    }

    pub fn iter_by_time(&self) -> impl Iterator<Item = &Replay> {
        self.order.iter().map(move |f| &self.by_filename[f])
    }

    pub fn all_filenames(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn dirty_added(&self) -> &HashSet<String> {
        &self.dirty_added
    }

    pub fn dirty_mutated(&self) -> &HashSet<String> {
        &self.dirty_mutated
    }

    pub fn clear_dirty(&mut self) {
        self.dirty_added.clear();
        self.dirty_mutated.clear();
    }

    /// Inserts a freshly-decoded record. A filename already present is a no-op and
    /// does not dirty anything.
    pub fn upsert(&mut self, replay: Replay) {
        let filename = replay.filename().to_string();
        if self.by_filename.contains_key(&filename) {
            return;
        }
        let pos = self.rank_of(&replay).unwrap_or_else(|pos| pos);
        self.order.insert(pos, filename.clone());
        self.by_filename.insert(filename.clone(), replay);
        self.dirty_added.insert(filename);
    }

    /// Inserts a record read back from a chunk file, without marking it dirty.
    pub fn insert_loaded(&mut self, replay: Replay) {
        let filename = replay.filename().to_string();
        let pos = self.rank_of(&replay).unwrap_or_else(|pos| pos);
        self.order.insert(pos, filename.clone());
        self.by_filename.insert(filename, replay);
    }

    /// Flips `downloadable`, marking the record dirty only if it actually changed.
    /// Returns `true` on an actual change.
    pub fn set_downloadable(&mut self, filename: &str, value: bool) -> bool {
        let Some(replay) = self.by_filename.get_mut(filename) else {
            return false;
        };
        if replay.set_downloadable(value) {
            self.dirty_mutated.insert(filename.to_string());
            true
        } else {
            false
        }
    }

    fn rank_of(&self, replay: &Replay) -> Result<usize, usize> {
        self.order
            .binary_search_by(|candidate| self.by_filename[candidate].cmp(replay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Replay;
    use chrono::{TimeZone, Utc};

    fn replay(filename: &str, secs: i64) -> Replay {
        Replay::new(
            filename.to_string(),
            Utc.timestamp_opt(secs, 0).unwrap(),
            true,
            None,
        )
    }

    #[test]
    fn maintains_time_order_on_insert() {
        let mut idx = ReplayIndex::new();
        idx.upsert(replay("c.rep.zip", 300));
        idx.upsert(replay("a.rep.zip", 100));
        idx.upsert(replay("b.rep.zip", 200));
        let ordered: Vec<_> = idx.iter_by_time().map(|r| r.filename()).collect();
        assert_eq!(ordered, vec!["a.rep.zip", "b.rep.zip", "c.rep.zip"]);
    }

    #[test]
    fn duplicate_filename_upsert_is_a_no_op() {
        let mut idx = ReplayIndex::new();
        idx.upsert(replay("a.rep.zip", 100));
        idx.clear_dirty();
        idx.upsert(replay("a.rep.zip", 999));
        assert_eq!(idx.len(), 1);
        assert!(idx.dirty_added().is_empty());
        assert_eq!(idx.get("a.rep.zip").unwrap().finished_at().timestamp(), 100);
    }

    #[test]
    fn set_downloadable_dirties_only_on_change() {
        let mut idx = ReplayIndex::new();
        idx.upsert(replay("a.rep.zip", 100));
        idx.clear_dirty();
        assert!(!idx.set_downloadable("a.rep.zip", true));
        assert!(idx.dirty_mutated().is_empty());
        assert!(idx.set_downloadable("a.rep.zip", false));
        assert!(idx.dirty_mutated().contains("a.rep.zip"));
    }

    #[test]
    fn index_of_tracks_rank_after_insertion() {
        let mut idx = ReplayIndex::new();
        idx.upsert(replay("a.rep.zip", 100));
        idx.upsert(replay("c.rep.zip", 300));
        assert_eq!(idx.index_of("c.rep.zip"), Some(1));
        idx.upsert(replay("b.rep.zip", 200));
        assert_eq!(idx.index_of("b.rep.zip"), Some(1));
        assert_eq!(idx.index_of("c.rep.zip"), Some(2));
    }
}

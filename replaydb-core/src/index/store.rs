//! The persistent, chunked, time-ordered replay index (C4) and the reconciler that
//! keeps it aligned with the replay directory (C6).
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::canonicalize;
use crate::container::chunk;
use crate::container::manifest::{ChunkHeader, Manifest};
use crate::domain::Replay;
use crate::error::{ReplayDbError, Result};
use crate::filename;
use crate::header;
use crate::index::inmem::ReplayIndex;
use crate::util::{atomic, hash};

const MANIFEST_FILENAME: &str = "replays_header.json";

pub struct ReplayDb {
    replay_dir: PathBuf,
    db_dir: PathBuf,
    max_chunk_size: usize,
    index: ReplayIndex,
    chunk_headers: Vec<ChunkHeader>,
}

impl ReplayDb {
    /// Opens (and, if absent, initializes) the index at `db_dir`, loading every
    /// chunk referenced by its manifest. Does not touch `replay_dir`; call
    /// [`ReplayDb::reconcile`] afterwards to align with the filesystem.
    pub fn open(
        replay_dir: impl Into<PathBuf>,
        db_dir: impl Into<PathBuf>,
        max_chunk_size: usize,
    ) -> Result<Self> {
        let replay_dir = replay_dir.into();
        let db_dir = db_dir.into();
        std::fs::create_dir_all(&db_dir)?;

        let manifest_path = db_dir.join(MANIFEST_FILENAME);
        let mut index = ReplayIndex::new();

        let chunk_headers = if manifest_path.exists() {
            let bytes = std::fs::read(&manifest_path)?;
            let manifest: Manifest = serde_json::from_slice(&bytes)?;
            manifest.validate(max_chunk_size)?;

            for header in &manifest.chunk_headers {
                let chunk_path = db_dir.join(&header.filename);
                let chunk_bytes = std::fs::read(&chunk_path)?;
                let replays = chunk::decode_chunk(&chunk_bytes)?;
                if replays.len() != header.count {
                    return Err(ReplayDbError::ManifestConsistencyError(format!(
                        "chunk {} declares {} records, found {}",
                        header.filename,
                        header.count,
                        replays.len()
                    )));
                }
                for replay in replays {
                    index.insert_loaded(replay);
                }
            }
            if index.len() != manifest.total_count {
                return Err(ReplayDbError::ManifestConsistencyError(format!(
                    "manifest total_count {} does not match {} loaded records",
                    manifest.total_count,
                    index.len()
                )));
            }
            manifest.chunk_headers
        } else {
            let empty = Manifest::empty(max_chunk_size);
            atomic::write_atomic(&manifest_path, &serde_json::to_vec_pretty(&empty)?)?;
            Vec::new()
        };

        index.clear_dirty();
        atomic::sweep_tmp_files(&db_dir)?;

        Ok(Self {
            replay_dir,
            db_dir,
            max_chunk_size,
            index,
            chunk_headers,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, filename: &str) -> Option<&Replay> {
        self.index.get(filename)
    }

    /// Records ordered by `finished_at`, ties broken by filename.
    pub fn list(&self) -> Vec<Replay> {
        self.index.iter_by_time().cloned().collect()
    }

    /// Ingests a single filename, per the reconciler's single-entry rules: a known
    /// filename just has its presence re-checked; an unknown, present file is
    /// decoded, canonicalized and inserted under its canonical name.
    pub fn ingest(&mut self, filename_arg: &str) -> Result<Option<Replay>> {
        if self.index.contains(filename_arg) {
            let present = self.replay_dir.join(filename_arg).exists();
            self.index.set_downloadable(filename_arg, present);
            return Ok(self.index.get(filename_arg).cloned());
        }

        let path = self.replay_dir.join(filename_arg);
        if !path.exists() {
            return Ok(None);
        }

        let metadata = header::decode_header(&path).ok();
        let canonical_path = canonicalize::ensure_canonical(&path)?;
        let canonical_name = canonical_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename_arg)
            .to_string();

        if self.index.contains(&canonical_name) {
            self.index.set_downloadable(&canonical_name, true);
            return Ok(self.index.get(&canonical_name).cloned());
        }

        let finished_at = filename::parse_finished_at(&canonical_name)?;
        let replay = Replay::new(canonical_name.clone(), finished_at, true, metadata);
        self.index.upsert(replay);
        Ok(self.index.get(&canonical_name).cloned())
    }

    /// Full directory scan: ingest every unseen `.rep`/`.rep.zip`, mark known
    /// present entries downloadable, clear downloadable on everything else, then
    /// save.
    pub fn reconcile(&mut self) -> Result<()> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.replay_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".rep") || name.ends_with(".rep.zip") {
                names.push(name);
            }
        }

        let mut present: HashSet<String> = HashSet::new();
        for name in names {
            if self.index.contains(&name) {
                self.index.set_downloadable(&name, true);
                present.insert(name);
            } else if let Some(replay) = self.ingest(&name)? {
                present.insert(replay.filename().to_string());
            }
        }

        let absent: Vec<String> = self
            .index
            .all_filenames()
            .filter(|f| !present.contains(*f))
            .map(|s| s.to_string())
            .collect();
        for filename_arg in absent {
            self.index.set_downloadable(&filename_arg, false);
        }

        self.save()
    }

    /// Persists accumulated changes: a no-op unless the dirty sets are non-empty.
    pub fn save(&mut self) -> Result<()> {
        if self.index.dirty_added().is_empty() && self.index.dirty_mutated().is_empty() {
            return Ok(());
        }

        let affected = self.affected_chunk_indices();
        let old_filenames: HashSet<String> = affected
            .iter()
            .filter_map(|&i| self.chunk_headers.get(i))
            .map(|h| h.filename.clone())
            .collect();

        self.index.clear_dirty();

        let records: Vec<&Replay> = self.index.iter_by_time().collect();
        let total = records.len();
        let chunk_count = total.div_ceil(self.max_chunk_size.max(1));

        let mut new_headers = Vec::with_capacity(chunk_count);
        for idx in 0..chunk_count {
            let start = idx * self.max_chunk_size;
            let end = ((idx + 1) * self.max_chunk_size).min(total);
            let batch = &records[start..end];

            if affected.contains(&idx) {
                let bytes = chunk::encode_chunk(batch)?;
                let digest = hash::chunk_digest_hex(&bytes);
                let chunk_filename = format!("chunk_{idx}_{digest}.json");
                let chunk_path = self.db_dir.join(&chunk_filename);
                if !chunk_path.exists() {
                    atomic::write_atomic(&chunk_path, &bytes)?;
                }
                new_headers.push(ChunkHeader {
                    filename: chunk_filename,
                    oldest_replay_ts: batch.first().unwrap().finished_at(),
                    latest_replay_ts: batch.last().unwrap().finished_at(),
                    count: batch.len(),
                });
            } else {
                new_headers.push(self.chunk_headers[idx].clone());
            }
        }

        let manifest = Manifest {
            version: crate::container::manifest::HEADER_VERSION,
            updated_at: Utc::now(),
            total_count: total,
            max_chunk_size: self.max_chunk_size,
            chunk_headers: new_headers.clone(),
        };
        let manifest_path = self.db_dir.join(MANIFEST_FILENAME);
        atomic::write_atomic(&manifest_path, &serde_json::to_vec_pretty(&manifest)?)?;

        let new_filenames: HashSet<&str> =
            new_headers.iter().map(|h| h.filename.as_str()).collect();
        for old in &old_filenames {
            if !new_filenames.contains(old.as_str()) {
                remove_if_present(&self.db_dir.join(old))?;
            }
        }

        atomic::sweep_tmp_files(&self.db_dir)?;
        self.chunk_headers = new_headers;
        Ok(())
    }

    /// Chunks touched by the pending dirty sets: every chunk holding a mutated
    /// record, plus, if any record was added, every chunk from the earliest
    /// insertion point to the end, since an insertion shifts all later records.
    fn affected_chunk_indices(&self) -> HashSet<usize> {
        let mut affected = HashSet::new();
        let k = self.max_chunk_size.max(1);

        for filename_arg in self.index.dirty_mutated() {
            if let Some(pos) = self.index.index_of(filename_arg) {
                affected.insert(pos / k);
            }
        }

        if !self.index.dirty_added().is_empty() {
            let min_added = self
                .index
                .dirty_added()
                .iter()
                .filter_map(|f| self.index.index_of(f))
                .min();
            if let Some(e) = min_added {
                let last_index = self.index.len().saturating_sub(1);
                for i in (e / k)..=(last_index / k) {
                    affected.insert(i);
                }
            }
        }

        affected
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

//! Canonicalizer (C3): guarantees every accepted replay on disk ends in `.rep.zip`.
//!
//! Writes a DEFLATE zip to a `.tmp` sidecar, atomically renames it onto the canonical
//! path, then unlinks the original `.rep`. A crash between the rename and the unlink
//! leaves both files present; the reconciler (C6) treats that pair as one logical
//! replay.
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::error::Result;

/// Ensures `replay_path` has a canonical `.rep.zip` sibling and returns its path.
///
/// If `replay_path` already ends in `.zip`, it is returned unchanged. Otherwise a
/// `.rep.zip` is produced next to it (crash-safe via `.tmp` + rename) and the original
/// `.rep` is removed.
pub fn ensure_canonical(replay_path: &Path) -> Result<PathBuf> {
    let name = replay_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.ends_with(".zip") {
        return Ok(replay_path.to_path_buf());
    }

    let zip_path = with_zip_suffix(replay_path);
    let tmp_path = with_tmp_suffix(&zip_path);

    let mut src = std::fs::File::open(replay_path)?;
    let mut contents = Vec::new();
    src.read_to_end(&mut contents)?;

    let tmp_file = std::fs::File::create(&tmp_path)?;
    let mut writer = zip::ZipWriter::new(tmp_file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(name, options)?;
    writer.write_all(&contents)?;
    writer.finish()?;

    std::fs::rename(&tmp_path, &zip_path)?;
    std::fs::remove_file(replay_path)?;

    Ok(zip_path)
}

fn with_zip_suffix(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    path.with_file_name(format!("{name}.zip"))
}

fn with_tmp_suffix(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    path.with_file_name(format!("{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    #[test]
    fn returns_existing_zip_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.rep.zip");
        std::fs::write(&path, b"already zipped").unwrap();
        let out = ensure_canonical(&path).unwrap();
        assert_eq!(out, path);
    }

    #[test]
    fn compresses_rep_into_rep_zip_and_removes_original() {
        let dir = tempfile::tempdir().unwrap();
        let rep = dir.path().join("foo.rep");
        let contents = vec![0x42u8; 4096];
        std::fs::write(&rep, &contents).unwrap();

        let out = ensure_canonical(&rep).unwrap();
        assert_eq!(out, dir.path().join("foo.rep.zip"));
        assert!(!rep.exists());
        assert!(out.exists());

        let zip_size = std::fs::metadata(&out).unwrap().len();
        assert!((zip_size as usize) < contents.len());

        let f = std::fs::File::open(&out).unwrap();
        let mut archive = zip::ZipArchive::new(f).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "foo.rep");
        let mut decoded = Vec::new();
        entry.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, contents);
    }

    #[test]
    fn no_tmp_file_remains_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let rep = dir.path().join("bar.rep");
        std::fs::write(&rep, b"data").unwrap();
        ensure_canonical(&rep).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }
}

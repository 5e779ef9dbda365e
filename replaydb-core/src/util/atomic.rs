//! Atomic same-directory write: write to `<path>.tmp`, then rename onto `path`.
use std::path::Path;

use crate::error::Result;

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path_for(path);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    path.with_file_name(format!("{name}.tmp"))
}

/// Removes every `*.tmp` file directly inside `dir`, ignoring entries that vanish
/// between the listing and the unlink (another pass may have already cleaned them up).
pub fn sweep_tmp_files(dir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map(|e| e == "tmp").unwrap_or(false) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_leaves_no_tmp_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.json");
        write_atomic(&target, b"{}").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"{}");
        assert!(!tmp_path_for(&target).exists());
    }

    #[test]
    fn sweep_removes_tmp_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.tmp"), b"x").unwrap();
        std::fs::write(dir.path().join("b.json"), b"y").unwrap();
        sweep_tmp_files(dir.path()).unwrap();
        assert!(!dir.path().join("a.tmp").exists());
        assert!(dir.path().join("b.json").exists());
    }
}

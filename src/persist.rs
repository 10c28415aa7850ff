//! Atomic file persistence.
//!
//! The fingerprint cache and the chat history are rewritten wholesale;
//! a crash mid-write must never truncate the previous state. Writes go
//! to a sibling temp file which is renamed over the target.

use anyhow::{Context, Result};
use std::path::Path;

/// Write `contents` to `path` atomically (write-temp-then-rename).
///
/// On any failure the previous file, if one existed, is left intact.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write temp file: {}", tmp.display()))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        // Leave no stray temp file behind on a failed rename.
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to replace file: {}", path.display()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_new_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");
        write_atomic(&path, b"[]").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"[]");
    }

    #[test]
    fn replaces_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");
        std::fs::write(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a").join("b").join("out.json");
        write_atomic(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");
        write_atomic(&path, b"x").unwrap();
        assert!(!tmp.path().join("out.json.tmp").exists());
    }
}

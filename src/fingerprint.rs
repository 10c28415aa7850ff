//! File change detection.
//!
//! Scans the context root, computes a SHA-256 digest of each file's
//! bytes, and compares against a persisted fingerprint cache to decide
//! which files need (re)processing. The cache is the single source of
//! truth for "already indexed" state and is owned exclusively by this
//! module.
//!
//! Cache persistence is atomic (temp file + rename). An unparseable
//! cache is recovered as empty — everything gets reprocessed — rather
//! than aborting the run.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::models::SourceFile;
use crate::persist::write_atomic;

/// Persisted mapping from root-relative path to content digest.
#[derive(Debug)]
pub struct FingerprintCache {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FingerprintCache {
    /// Load the cache from disk. A missing file yields an empty cache;
    /// a corrupt file is recovered as empty with a warning.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    eprintln!(
                        "Warning: fingerprint cache at {} is corrupt ({}); reprocessing everything",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// A file needs processing iff its digest differs from the cached
    /// value or no cached value exists.
    pub fn is_changed(&self, rel_path: &str, fingerprint: &str) -> bool {
        self.entries.get(rel_path).map(String::as_str) != Some(fingerprint)
    }

    /// Record a freshly processed file. Takes effect on disk only after
    /// [`FingerprintCache::persist`].
    pub fn record(&mut self, rel_path: &str, fingerprint: &str) {
        self.entries
            .insert(rel_path.to_string(), fingerprint.to_string());
    }

    /// Atomically rewrite the cache file. Either the fully-updated map
    /// lands on disk or the previous file survives untouched.
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.path, json.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one directory scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Candidate files in deterministic (sorted relative path) order.
    pub files: Vec<SourceFile>,
    /// Files skipped for exceeding the size cap. Their cache state is
    /// left untouched.
    pub skipped_large: usize,
}

/// Walk the context root and fingerprint every candidate file.
pub fn scan_root(config: &IngestConfig) -> Result<ScanOutcome> {
    let root = &config.root;
    if !root.exists() {
        bail!("Context root does not exist: {}", root.display());
    }

    let mut default_excludes = vec!["**/.git/**".to_string()];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let max_bytes = config.max_file_bytes();
    let mut outcome = ScanOutcome::default();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        let size = entry.metadata()?.len();
        if size > max_bytes {
            eprintln!(
                "Warning: skipping large file ({} bytes): {}",
                size,
                path.display()
            );
            outcome.skipped_large += 1;
            continue;
        }

        let bytes = std::fs::read(path)?;
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        outcome.files.push(SourceFile {
            path: path.to_path_buf(),
            rel_path: rel_str,
            extension,
            size,
            fingerprint: digest_hex(&bytes),
        });
    }

    // Ingestion proceeds file-by-file in scan order; sort for a stable
    // order across platforms.
    outcome.files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    Ok(outcome)
}

/// SHA-256 hex digest of raw bytes.
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(root: &Path, cache: &Path) -> IngestConfig {
        IngestConfig {
            root: root.to_path_buf(),
            cache_path: cache.to_path_buf(),
            max_file_size_mb: 5,
            exclude_globs: Vec::new(),
        }
    }

    #[test]
    fn scan_lists_files_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.txt"), "beta").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "alpha").unwrap();

        let config = test_config(tmp.path(), &tmp.path().join("cache.json"));
        let outcome = scan_root(&config).unwrap();
        let rels: Vec<&str> = outcome.files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn single_byte_change_flips_fingerprint() {
        let a = digest_hex(b"my diary entry");
        let b = digest_hex(b"my diary entrz");
        assert_ne!(a, b);
        assert_eq!(a, digest_hex(b"my diary entry"));
    }

    #[test]
    fn unchanged_file_is_not_reported_changed() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join("cache.json");
        let mut cache = FingerprintCache::load(&cache_path);

        let fp = digest_hex(b"hello");
        assert!(cache.is_changed("notes/a.txt", &fp));
        cache.record("notes/a.txt", &fp);
        assert!(!cache.is_changed("notes/a.txt", &fp));

        // Content change reports changed again.
        assert!(cache.is_changed("notes/a.txt", &digest_hex(b"hello!")));
    }

    #[test]
    fn cache_round_trips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join("cache.json");

        let mut cache = FingerprintCache::load(&cache_path);
        cache.record("a.txt", "aaa");
        cache.record("b.txt", "bbb");
        cache.persist().unwrap();

        let reloaded = FingerprintCache::load(&cache_path);
        assert_eq!(reloaded.len(), 2);
        assert!(!reloaded.is_changed("a.txt", "aaa"));
        assert!(!reloaded.is_changed("b.txt", "bbb"));
    }

    #[test]
    fn corrupt_cache_recovers_as_empty() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join("cache.json");
        std::fs::write(&cache_path, "{ not json !!").unwrap();

        let cache = FingerprintCache::load(&cache_path);
        assert!(cache.is_empty());
        // Everything is considered changed again.
        assert!(cache.is_changed("a.txt", "aaa"));
    }

    #[test]
    fn oversized_files_are_skipped_without_cache_effect() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("big.txt"), vec![b'x'; 2048]).unwrap();
        std::fs::write(tmp.path().join("small.txt"), "ok").unwrap();

        let mut config = test_config(tmp.path(), &tmp.path().join("cache.json"));
        config.max_file_size_mb = 0; // cap of zero bytes skips everything non-empty

        let outcome = scan_root(&config).unwrap();
        assert_eq!(outcome.files.len(), 0);
        assert_eq!(outcome.skipped_large, 2);
    }

    #[test]
    fn excluded_globs_are_not_scanned() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        std::fs::write(tmp.path().join("drafts/skip.txt"), "draft").unwrap();
        std::fs::write(tmp.path().join("keep.txt"), "keep").unwrap();

        let mut config = test_config(tmp.path(), &tmp.path().join("cache.json"));
        config.exclude_globs = vec!["drafts/**".to_string()];

        let outcome = scan_root(&config).unwrap();
        let rels: Vec<&str> = outcome.files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["keep.txt"]);
    }
}

//! Batch ingestion orchestration.
//!
//! Drives the full pipeline for one run: scan the context root,
//! filter unchanged and unsupported files, load and split the rest,
//! and replace each file's index entries. The fingerprint cache is
//! advanced — and atomically persisted — after every successfully
//! processed file, so a crash mid-batch leaves the completed prefix
//! marked processed and the remainder eligible for the next run.
//!
//! Per-file failures never abort the batch; they are collected into
//! the report.

use anyhow::Result;

use crate::chunk::split_text;
use crate::config::Config;
use crate::db;
use crate::fingerprint::{scan_root, FingerprintCache};
use crate::index::VectorIndex;
use crate::loader::{load_file, FileKind};
use crate::models::DocumentChunk;

/// Outcome of one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_unchanged: usize,
    pub files_skipped_unsupported: usize,
    pub files_skipped_large: usize,
    pub chunks_embedded: u64,
    /// (source path, cause) per file that failed to load or embed.
    pub failures: Vec<(String, String)>,
}

pub async fn run_ingest(config: &Config, full: bool, dry_run: bool) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    let outcome = scan_root(&config.ingest)?;
    report.files_skipped_large = outcome.skipped_large;

    // Unrecognized extensions are excluded silently, before change
    // detection; they never enter the cache.
    let mut supported = Vec::new();
    for file in outcome.files {
        if FileKind::from_extension(&file.extension).is_supported() {
            supported.push(file);
        } else {
            report.files_skipped_unsupported += 1;
        }
    }
    report.files_seen = supported.len() + report.files_skipped_unsupported;

    let mut cache = FingerprintCache::load(&config.ingest.cache_path);
    let changed: Vec<_> = supported
        .into_iter()
        .filter(|f| {
            let needs_work = full || cache.is_changed(&f.rel_path, &f.fingerprint);
            if !needs_work {
                report.files_unchanged += 1;
            }
            needs_work
        })
        .collect();

    if dry_run {
        for file in &changed {
            match load_file(file) {
                Ok(segments) => {
                    report.files_indexed += 1;
                    for segment in segments {
                        report.chunks_embedded += split_text(
                            &segment.text,
                            config.chunking.max_chars,
                            config.chunking.overlap_chars,
                        )
                        .len() as u64;
                    }
                }
                Err(e) => report.failures.push((e.path, e.cause)),
            }
        }
        return Ok(report);
    }

    let pool = db::connect(config).await?;
    let index = VectorIndex::new(pool);

    for file in &changed {
        let segments = match load_file(file) {
            Ok(segments) => segments,
            Err(e) => {
                report.failures.push((e.path, e.cause));
                continue;
            }
        };

        let mut chunks = Vec::new();
        let mut seq: i64 = 0;
        for segment in &segments {
            for text in split_text(
                &segment.text,
                config.chunking.max_chars,
                config.chunking.overlap_chars,
            ) {
                chunks.push(DocumentChunk {
                    text,
                    source: segment.source.clone(),
                    tag: segment.tag.clone(),
                    seq,
                });
                seq += 1;
            }
        }

        match index
            .replace_source(&config.embedding, &file.rel_path, &chunks)
            .await
        {
            Ok(written) => {
                report.chunks_embedded += written;
                report.files_indexed += 1;
                // Advance the cache only for this successfully
                // processed file, atomically.
                cache.record(&file.rel_path, &file.fingerprint);
                cache.persist()?;
            }
            Err(e) => {
                report.failures.push((file.rel_path.clone(), e.to_string()));
            }
        }
    }

    index.pool().close().await;
    Ok(report)
}

impl IngestReport {
    /// Print the run summary in the CLI's `key: value` style.
    pub fn print(&self, dry_run: bool) {
        if dry_run {
            println!("ingest (dry-run)");
        } else {
            println!("ingest");
        }
        println!("  files seen: {}", self.files_seen);
        println!("  indexed: {}", self.files_indexed);
        println!("  unchanged: {}", self.files_unchanged);
        println!("  skipped (unsupported): {}", self.files_skipped_unsupported);
        println!("  skipped (too large): {}", self.files_skipped_large);
        println!("  chunks embedded: {}", self.chunks_embedded);
        if !self.failures.is_empty() {
            println!("  failures: {}", self.failures.len());
            for (path, cause) in &self.failures {
                println!("    {}: {}", path, cause);
            }
        }
        println!("ok");
    }
}

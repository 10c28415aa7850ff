//! Core data models used throughout Mnemo.
//!
//! These types represent the files, chunks, and conversation turns that
//! flow through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file discovered by the directory scan, with its content digest.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the context root; the cache key and the value
    /// attached to every chunk as its source.
    pub rel_path: String,
    pub extension: String,
    pub size: u64,
    /// SHA-256 hex digest of the raw bytes.
    pub fingerprint: String,
}

/// A span of raw text produced by the loader, before splitting.
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub source: String,
    pub tag: String,
}

/// A bounded-size span of text, the unit stored in the vector index.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub text: String,
    pub source: String,
    pub tag: String,
    /// Position within the source document, contiguous from 0.
    pub seq: i64,
}

/// A chunk returned from similarity retrieval.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub source: String,
    pub tag: String,
    pub score: f64,
}

/// One conversation turn. Immutable once appended to the history log.
///
/// Field names match the persisted JSON record shape:
/// `{"time": ..., "query": ..., "response": ..., "topic": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub time: String,
    pub query: String,
    pub response: String,
    pub topic: String,
}

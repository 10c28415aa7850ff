//! Extension-keyed document loading.
//!
//! Behavior is selected by file extension against a closed set of
//! supported kinds. Unrecognized extensions map to an explicit
//! [`FileKind::Unsupported`] variant and are silently excluded from
//! ingestion rather than treated as errors.
//!
//! Every produced segment carries its source path and a category tag
//! derived from the file's position in the two-level context taxonomy:
//! the first directory under the context root becomes the tag, files
//! directly under the root get the default tag.

use std::path::Path;

use crate::models::{Segment, SourceFile};

/// Tag for files that sit directly under the context root.
pub const DEFAULT_TAG: &str = "general";

/// The closed set of supported file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Markdown,
    Pdf,
    Tabular,
    Unsupported,
}

impl FileKind {
    pub fn from_extension(extension: &str) -> FileKind {
        match extension {
            "txt" => FileKind::Text,
            "md" => FileKind::Markdown,
            "pdf" => FileKind::Pdf,
            "csv" => FileKind::Tabular,
            _ => FileKind::Unsupported,
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, FileKind::Unsupported)
    }
}

/// Loading one file failed. The batch continues; failures are surfaced
/// in the ingestion report.
#[derive(Debug)]
pub struct LoadError {
    pub path: String,
    pub cause: String,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to load {}: {}", self.path, self.cause)
    }
}

impl std::error::Error for LoadError {}

/// Category tag from the root-relative path: first path segment when
/// the file sits in a subdirectory, [`DEFAULT_TAG`] otherwise.
pub fn tag_from_rel_path(rel_path: &str) -> String {
    match rel_path.split('/').next() {
        Some(first) if first != rel_path => first.to_string(),
        _ => DEFAULT_TAG.to_string(),
    }
}

/// Read a supported file into text segments with source and tag
/// metadata attached.
pub fn load_file(file: &SourceFile) -> Result<Vec<Segment>, LoadError> {
    let kind = FileKind::from_extension(&file.extension);
    let text = match kind {
        FileKind::Text | FileKind::Markdown => read_plain(&file.path, &file.rel_path)?,
        FileKind::Pdf => read_pdf(&file.path, &file.rel_path)?,
        FileKind::Tabular => read_tabular(&file.path, &file.rel_path)?,
        FileKind::Unsupported => {
            return Err(LoadError {
                path: file.rel_path.clone(),
                cause: format!("unsupported extension: .{}", file.extension),
            })
        }
    };

    Ok(vec![Segment {
        text,
        source: file.rel_path.clone(),
        tag: tag_from_rel_path(&file.rel_path),
    }])
}

fn read_plain(path: &Path, rel: &str) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError {
        path: rel.to_string(),
        cause: e.to_string(),
    })
}

fn read_pdf(path: &Path, rel: &str) -> Result<String, LoadError> {
    let bytes = std::fs::read(path).map_err(|e| LoadError {
        path: rel.to_string(),
        cause: e.to_string(),
    })?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| LoadError {
        path: rel.to_string(),
        cause: e.to_string(),
    })
}

/// Flatten a CSV file to one line per record, fields joined with ", ".
fn read_tabular(path: &Path, rel: &str) -> Result<String, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| LoadError {
            path: rel.to_string(),
            cause: e.to_string(),
        })?;

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| LoadError {
            path: rel.to_string(),
            cause: e.to_string(),
        })?;
        let fields: Vec<&str> = record.iter().map(str::trim).collect();
        lines.push(fields.join(", "));
    }

    Ok(lines.join("\n"))
}

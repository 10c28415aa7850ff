//! Overlapping text splitter.
//!
//! Splits loaded text into chunks of at most `max_chars` characters,
//! with `overlap_chars` of trailing context carried into the next
//! chunk. Cuts prefer natural boundaries (paragraph break, sentence
//! end, newline, space) over hard truncation, but the size bound holds
//! regardless. Pure and deterministic: the ingestion idempotence
//! property depends on the same input always producing the same
//! chunks.

/// Split `text` into ordered chunks.
///
/// Invariants:
/// - every chunk is at most `max_chars` characters;
/// - consecutive chunks overlap by up to `overlap_chars` characters,
///   so concatenated chunk spans cover the source with no gap;
/// - empty input produces no chunks.
///
/// `overlap_chars` is clamped below `max_chars` to guarantee progress.
pub fn split_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    debug_assert!(max_chars > 0);
    let max_chars = max_chars.max(1);
    let overlap = overlap_chars.min(max_chars - 1);

    let mut chunks = Vec::new();
    if text.is_empty() {
        return chunks;
    }

    let len = text.len();
    let mut start = 0usize;

    loop {
        let window_end = offset_after_chars(text, start, max_chars);
        let cut = if window_end >= len {
            len
        } else {
            match natural_cut(&text[start..window_end]) {
                Some(rel) => start + rel,
                None => window_end,
            }
        };

        chunks.push(text[start..cut].to_string());
        if cut >= len {
            break;
        }

        let rewound = offset_before_chars(text, cut, overlap);
        // The next window must begin past the previous start or a
        // large overlap could loop forever on short cuts.
        start = if rewound > start { rewound } else { cut };
    }

    chunks
}

/// Byte offset of the position `n` characters after `start`.
fn offset_after_chars(text: &str, start: usize, n: usize) -> usize {
    match text[start..].char_indices().nth(n) {
        Some((off, _)) => start + off,
        None => text.len(),
    }
}

/// Byte offset of the position `n` characters before `end`.
fn offset_before_chars(text: &str, end: usize, n: usize) -> usize {
    let mut idx = end;
    for _ in 0..n {
        match text[..idx].chars().next_back() {
            Some(c) => idx -= c.len_utf8(),
            None => break,
        }
    }
    idx
}

/// Best cut position within a full window, as a byte offset into it.
///
/// Preference order: paragraph break, sentence end, line break, word
/// break. The cut lands after the separator so the separator stays
/// with the preceding chunk. Returns `None` when the window holds a
/// single unbreakable run.
fn natural_cut(window: &str) -> Option<usize> {
    if let Some(pos) = window.rfind("\n\n") {
        if pos > 0 {
            return Some(pos + 2);
        }
    }
    if let Some(pos) = window.rfind(". ") {
        if pos > 0 {
            return Some(pos + 2);
        }
    }
    if let Some(pos) = window.rfind('\n') {
        if pos > 0 {
            return Some(pos + 1);
        }
    }
    if let Some(pos) = window.rfind(' ') {
        if pos > 0 {
            return Some(pos + 1);
        }
    }
    None
}

//! Prompt composition.
//!
//! Builds the instruction text sent to the language model from the
//! persona header, a bounded window of recent conversation turns, and
//! the current query — optionally with retrieved evidence. The total
//! length cap is enforced by dropping the oldest context turns first;
//! the current query and the retrieved evidence are never truncated.

use crate::models::{ChatTurn, RetrievedChunk};

/// Compose the prompt: persona header, retrieved evidence, bounded
/// history, query — under a length cap.
///
/// Starts from the full `recent` window and shrinks it from the oldest
/// turn until the prompt fits in `max_chars`. Evidence and the query
/// always survive; if they alone exceed the cap the zero-context
/// prompt is returned as-is. With no prior turns the context block is
/// omitted entirely and the query is framed directly; an empty section
/// is never emitted.
pub fn assemble_rag_prompt(
    name: &str,
    persona: &str,
    recent: &[ChatTurn],
    evidence: &[RetrievedChunk],
    query: &str,
    max_chars: usize,
) -> String {
    for window_start in 0..=recent.len() {
        let candidate = render(name, persona, &recent[window_start..], evidence, query);
        if candidate.chars().count() <= max_chars || window_start == recent.len() {
            return candidate;
        }
    }
    unreachable!("loop always returns on the final window");
}

fn render(
    name: &str,
    persona: &str,
    recent: &[ChatTurn],
    evidence: &[RetrievedChunk],
    query: &str,
) -> String {
    let mut prompt = format!("{}, here is your role:\n{}\n\n", name, persona);

    if !evidence.is_empty() {
        prompt.push_str("Relevant excerpts from my notes:\n");
        for chunk in evidence {
            prompt.push_str(&format!("- [{}] {}: {}\n", chunk.tag, chunk.source, chunk.text));
        }
        prompt.push('\n');
    }

    if recent.is_empty() {
        prompt.push_str(&format!("User says: {}", query));
    } else {
        let context: Vec<String> = recent
            .iter()
            .map(|turn| format!("You: {}\n{}: {}", turn.query, name, turn.response))
            .collect();
        prompt.push_str(&context.join("\n"));
        prompt.push_str(&format!("\n\nNow respond to: {}", query));
    }

    prompt
}

//! Durable chat memory.
//!
//! An append-only log of conversation turns, persisted as a JSON array
//! and fully reloaded at startup. Every append atomically rewrites the
//! file, so a crash between turns loses at most the in-flight turn and
//! never prior history.
//!
//! Topic inference is a pure keyword classification over a fixed
//! ordered category list; the first matching category wins.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::models::ChatTurn;
use crate::persist::write_atomic;

/// Topic assigned when no keyword category matches.
pub const DEFAULT_TOPIC: &str = "General";

/// Ordered keyword categories; precedence is list order.
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("Finance", &["finance", "money", "investment", "sip", "saving"]),
    ("Goals", &["goal", "project", "plan", "milestone", "dream"]),
    ("Health", &["health", "mental", "doctor", "therapy", "stress"]),
    ("Diary", &["journal", "diary", "life", "feeling", "emotion"]),
];

/// Classify a query into a coarse topic label. Pure: no I/O, no state.
pub fn infer_topic(query: &str) -> &'static str {
    let q = query.to_lowercase();
    for (topic, keywords) in TOPIC_KEYWORDS {
        if keywords.iter().any(|k| q.contains(k)) {
            return topic;
        }
    }
    DEFAULT_TOPIC
}

/// Persistent, append-only conversation log.
#[derive(Debug)]
pub struct ChatMemory {
    path: PathBuf,
    turns: Vec<ChatTurn>,
}

impl ChatMemory {
    /// Load the full history. A missing file yields an empty log; an
    /// unreadable one is an error — history is never silently wiped.
    pub fn load(path: &Path) -> Result<Self> {
        let turns = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse chat history: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read chat history: {}", path.display()))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            turns,
        })
    }

    /// Append one turn and persist. If persistence fails the in-memory
    /// log is rolled back so it always mirrors disk.
    pub fn append(&mut self, turn: ChatTurn) -> Result<()> {
        self.turns.push(turn);
        if let Err(e) = self.persist() {
            self.turns.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Discard all history and persist the empty log in one step.
    pub fn clear(&mut self) -> Result<()> {
        let drained = std::mem::take(&mut self.turns);
        if let Err(e) = self.persist() {
            self.turns = drained;
            return Err(e);
        }
        Ok(())
    }

    /// The last `n` turns in chronological order, oldest first.
    pub fn recent_turns(&self, n: usize) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.turns)?;
        write_atomic(&self.path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn turn(query: &str, response: &str) -> ChatTurn {
        ChatTurn {
            time: "2024-03-01 09:30".to_string(),
            query: query.to_string(),
            response: response.to_string(),
            topic: infer_topic(query).to_string(),
        }
    }

    #[test]
    fn topic_finance_from_sip() {
        assert_eq!(infer_topic("How should I plan my SIP investment?"), "Finance");
    }

    #[test]
    fn topic_precedence_first_match_wins() {
        // "stress" (Health) precedes "diary" (Diary) in category order.
        assert_eq!(infer_topic("I feel stressed about my diary entries"), "Health");
    }

    #[test]
    fn topic_default_for_unrelated_text() {
        assert_eq!(infer_topic("random unrelated text"), DEFAULT_TOPIC);
    }

    #[test]
    fn topic_matching_is_case_insensitive() {
        assert_eq!(infer_topic("MONEY matters"), "Finance");
    }

    #[test]
    fn history_round_trips_identically() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");

        let mut memory = ChatMemory::load(&path).unwrap();
        for i in 0..5 {
            memory
                .append(turn(&format!("question {i}"), &format!("answer {i}")))
                .unwrap();
        }

        let reloaded = ChatMemory::load(&path).unwrap();
        assert_eq!(reloaded.turns(), memory.turns());
        assert_eq!(reloaded.len(), 5);
        assert_eq!(reloaded.turns()[0].query, "question 0");
        assert_eq!(reloaded.turns()[4].query, "question 4");
    }

    #[test]
    fn recent_turns_are_chronological_oldest_first() {
        let tmp = TempDir::new().unwrap();
        let mut memory = ChatMemory::load(&tmp.path().join("h.json")).unwrap();
        for i in 0..5 {
            memory.append(turn(&format!("q{i}"), "a")).unwrap();
        }

        let recent = memory.recent_turns(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "q3");
        assert_eq!(recent[1].query, "q4");

        // Asking for more than exists returns everything.
        assert_eq!(memory.recent_turns(100).len(), 5);
    }

    #[test]
    fn clear_persists_an_empty_log() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("h.json");

        let mut memory = ChatMemory::load(&path).unwrap();
        memory.append(turn("q", "a")).unwrap();
        memory.clear().unwrap();
        assert!(memory.is_empty());

        let reloaded = ChatMemory::load(&path).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn corrupt_history_is_an_error_not_a_wipe() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("h.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(ChatMemory::load(&path).is_err());
        // The broken file is still there for the user to inspect.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn persisted_record_shape_matches_the_wire_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("h.json");
        let mut memory = ChatMemory::load(&path).unwrap();
        memory.append(turn("about my savings", "noted")).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let record = &value.as_array().unwrap()[0];
        assert!(record.get("time").is_some());
        assert!(record.get("query").is_some());
        assert!(record.get("response").is_some());
        assert_eq!(record.get("topic").unwrap(), "Finance");
    }
}

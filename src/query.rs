//! Query-turn orchestration.
//!
//! One user turn: retrieve relevant chunks for the raw query, compose
//! the retrieval-augmented prompt with persona and bounded history,
//! call the language model, infer the topic, and append the completed
//! turn to chat memory. The turn is appended only after a successful
//! response — a failed generation leaves history untouched.
//!
//! Session state (assistant name, persona, history) is an explicit
//! value passed in and mutated through; there are no process globals.

use anyhow::{bail, Result};
use chrono::Local;

use crate::config::Config;
use crate::db;
use crate::generate;
use crate::index::VectorIndex;
use crate::memory::{infer_topic, ChatMemory};
use crate::models::{ChatTurn, RetrievedChunk};
use crate::prompt::assemble_rag_prompt;

/// Conversation session: persona plus durable history.
pub struct Session {
    pub assistant_name: String,
    pub persona: String,
    pub memory: ChatMemory,
}

impl Session {
    pub fn load(config: &Config) -> Result<Self> {
        Ok(Self {
            assistant_name: config.assistant.name.clone(),
            persona: config.assistant.persona.clone(),
            memory: ChatMemory::load(&config.memory.path)?,
        })
    }
}

/// The assistant's answer plus the record appended to history.
pub struct TurnOutcome {
    pub response: String,
    pub turn: ChatTurn,
    pub retrieved: Vec<RetrievedChunk>,
}

/// Run one query turn against the index, the LM, and chat memory.
pub async fn run_turn(config: &Config, session: &mut Session, query: &str) -> Result<TurnOutcome> {
    if query.trim().is_empty() {
        bail!("Empty query");
    }
    if !config.embedding.is_enabled() {
        bail!("Retrieval requires embeddings. Set [embedding] provider in config.");
    }

    // The raw query, not the composed prompt, drives retrieval;
    // retrieval should not depend on persona wording.
    let pool = db::connect(config).await?;
    let index = VectorIndex::new(pool);
    let retrieved = index
        .retrieve(&config.embedding, query, config.retrieval.top_k)
        .await?;
    index.pool().close().await;

    let recent = session
        .memory
        .recent_turns(config.assistant.max_history_context);
    let prompt = assemble_rag_prompt(
        &session.assistant_name,
        &session.persona,
        recent,
        &retrieved,
        query,
        config.assistant.max_prompt_chars,
    );

    let response = generate::generate(&config.generation, &prompt).await?;

    let turn = ChatTurn {
        time: Local::now().format("%Y-%m-%d %H:%M").to_string(),
        query: query.to_string(),
        response: response.clone(),
        topic: infer_topic(query).to_string(),
    };
    session.memory.append(turn.clone())?;

    Ok(TurnOutcome {
        response,
        turn,
        retrieved,
    })
}

/// Greeting line for the interactive `ask` output.
pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AssistantConfig, ChunkingConfig, Config, DbConfig, EmbeddingConfig, GenerationConfig,
        IngestConfig, MemoryConfig, RetrievalConfig,
    };
    use tempfile::TempDir;

    fn test_config(tmp: &TempDir) -> Config {
        Config {
            db: DbConfig {
                path: tmp.path().join("mnemo.sqlite"),
            },
            assistant: AssistantConfig::default(),
            ingest: IngestConfig {
                root: tmp.path().to_path_buf(),
                cache_path: tmp.path().join("cache.json"),
                max_file_size_mb: 5,
                exclude_globs: Vec::new(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig {
                provider: "hash".to_string(),
                dims: Some(64),
                ..EmbeddingConfig::default()
            },
            generation: GenerationConfig::default(), // disabled
            memory: MemoryConfig {
                path: tmp.path().join("history.json"),
            },
        }
    }

    #[tokio::test]
    async fn failed_generation_appends_nothing_to_history() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        crate::migrate::run_migrations(&config).await.unwrap();

        let mut session = Session::load(&config).unwrap();
        // Generation provider is disabled, so the turn must fail...
        assert!(run_turn(&config, &mut session, "how are my goals?")
            .await
            .is_err());
        // ...and history must be untouched, in memory and on disk.
        assert!(session.memory.is_empty());
        let reloaded = ChatMemory::load(&config.memory.path).unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let mut session = Session::load(&config).unwrap();
        assert!(run_turn(&config, &mut session, "   ").await.is_err());
    }

    #[tokio::test]
    async fn disabled_embeddings_reject_the_turn() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.embedding = EmbeddingConfig::default(); // disabled
        let mut session = Session::load(&config).unwrap();
        assert!(run_turn(&config, &mut session, "anything").await.is_err());
    }

    #[test]
    fn greeting_tracks_the_clock() {
        assert_eq!(greeting(8), "Good morning");
        assert_eq!(greeting(13), "Good afternoon");
        assert_eq!(greeting(21), "Good evening");
    }
}

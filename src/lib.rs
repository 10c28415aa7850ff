//! # Mnemo
//!
//! A personal knowledge assistant that keeps a vector index of your
//! private notes current as files change and answers questions over
//! them with a configurable persona and persistent chat memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌───────────┐   ┌──────────┐
//! │ Scanner   │──▶│  Loader    │──▶│ Splitter  │──▶│  SQLite  │
//! │ + digests │   │ txt/md/pdf │   │ + overlap │   │  vectors │
//! └───────────┘   └────────────┘   └───────────┘   └────┬─────┘
//!                                                       │
//!                 ┌─────────────┐   ┌────────────┐      │
//!   user query ──▶│  Retrieval  │──▶│  Prompt    │──▶  LLM
//!                 └─────────────┘   │ + persona  │
//!                                   │ + memory   │
//!                                   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mnemo init                    # create the index database
//! mnemo ingest                  # index changed files under the context root
//! mnemo ask "what did I write about my savings plan?"
//! mnemo search "sip investment" --k 3
//! mnemo history --topic Finance
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`fingerprint`] | File change detection via content digests |
//! | [`loader`] | Extension-keyed document loading and tagging |
//! | [`chunk`] | Overlapping text splitting |
//! | [`index`] | Persistent vector index |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generate`] | Language-model provider abstraction |
//! | [`memory`] | Durable chat history and topic inference |
//! | [`prompt`] | Prompt composition |
//! | [`ingest`] | Batch ingestion orchestration |
//! | [`query`] | Query-turn orchestration |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod fingerprint;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod memory;
pub mod migrate;
pub mod models;
pub mod persist;
pub mod prompt;
pub mod query;

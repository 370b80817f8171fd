//! graphchat - graph-grounded retrieval-augmented chat over Neo4j.
//!
//! Answers questions by combining vector search inside the graph store with
//! entity-graph traversal, compressing the retrieved context, and invoking a
//! chat model. Sessions and their message history live in the graph
//! database; after every answer the history is compacted into a summary.

pub mod chat;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod llm;
pub mod prompts;
pub mod retrieval;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export primary types for convenience
pub use chat::{new_session_id, ChatEngine};
pub use config::ChatConfig;
pub use error::SetupError;
pub use graph::GraphStore;
pub use types::{ChatMessage, ChatRole, Document, QAResponse, ResetResponse};

// Re-export common types
pub use anyhow::{Error, Result};

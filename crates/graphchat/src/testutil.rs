//! Shared fakes for exercising the pipeline without external services.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::chat::history::MessageHistory;
use crate::embeddings::EmbeddingModel;
use crate::llm::LanguageModel;
use crate::retrieval::Retriever;
use crate::types::{ChatMessage, Document, DocumentMetadata};

/// Build a retrieval document.
pub(crate) fn doc(source: &str, content: &str, score: f32, chunk_ids: &[&str]) -> Document {
    Document {
        page_content: content.to_string(),
        score,
        metadata: DocumentMetadata {
            source: source.to_string(),
            chunk_ids: chunk_ids.iter().map(|id| id.to_string()).collect(),
        },
    }
}

/// Scripted chat model: pops one reply per call and records what it saw.
pub(crate) struct FakeLlm {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(Option<String>, usize)>>,
}

impl FakeLlm {
    pub fn scripted(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_message_count(&self) -> usize {
        self.calls.lock().last().map(|(_, count)| *count).unwrap_or(0)
    }

    pub fn last_system(&self) -> Option<String> {
        self.calls.lock().last().and_then(|(system, _)| system.clone())
    }
}

#[async_trait]
impl LanguageModel for FakeLlm {
    async fn generate(&self, system: Option<&str>, messages: &[ChatMessage]) -> Result<String> {
        self.calls
            .lock()
            .push((system.map(str::to_string), messages.len()));
        Ok(self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string()))
    }
}

/// Deterministic embedder: 26-dimensional letter-frequency vectors.
/// Identical texts embed identically; texts with disjoint letters are
/// orthogonal.
pub(crate) struct LetterEmbedder;

impl LetterEmbedder {
    fn embed(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; 26];
        for c in text.chars() {
            if c.is_ascii_alphabetic() {
                let idx = (c.to_ascii_lowercase() as u8 - b'a') as usize;
                vector[idx] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for LetterEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::embed(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        26
    }
}

/// Retriever returning a fixed document list, recording every query.
pub(crate) struct FakeRetriever {
    docs: Vec<Document>,
    queries: Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn returning(docs: Vec<Document>) -> Arc<Self> {
        Arc::new(Self {
            docs,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        self.queries.lock().push(query.to_string());
        Ok(self.docs.clone())
    }
}

/// In-memory message history.
pub(crate) struct FakeHistory {
    store: Mutex<Vec<ChatMessage>>,
}

impl FakeHistory {
    pub fn with_messages(messages: Vec<ChatMessage>) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(messages),
        })
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.store.lock().clone()
    }
}

#[async_trait]
impl MessageHistory for FakeHistory {
    async fn messages(&self) -> Result<Vec<ChatMessage>> {
        Ok(self.store.lock().clone())
    }

    async fn append(&self, message: &ChatMessage) -> Result<()> {
        self.store.lock().push(message.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.store.lock().clear();
        Ok(())
    }
}

//! Query-transforming retrieval.
//!
//! On the first turn the user's message is already a self-contained query,
//! so it is used verbatim and no LLM call is spent. With prior history, the
//! conversation is rewritten into a standalone search query first.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::debug;

use super::{CompressionPipeline, Retriever};
use crate::llm::LanguageModel;
use crate::prompts;
use crate::types::{ChatMessage, Document};

pub struct QueryTransformingRetriever {
    base: Arc<dyn Retriever>,
    compressor: CompressionPipeline,
    llm: Arc<dyn LanguageModel>,
}

impl QueryTransformingRetriever {
    pub fn new(
        base: Arc<dyn Retriever>,
        compressor: CompressionPipeline,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            base,
            compressor,
            llm,
        }
    }

    /// Retrieve compressed documents for the conversation's latest intent.
    pub async fn retrieve(&self, messages: &[ChatMessage]) -> Result<Vec<Document>> {
        let latest = messages
            .last()
            .ok_or_else(|| anyhow!("conversation has no messages"))?;

        let query = if messages.len() == 1 {
            latest.content.clone()
        } else {
            self.transform_query(messages).await?
        };
        debug!(query = %query, "search query resolved");

        let documents = self.base.retrieve(&query).await?;
        self.compressor.compress(documents, &query).await
    }

    async fn transform_query(&self, messages: &[ChatMessage]) -> Result<String> {
        let rewritten = self
            .llm
            .generate(Some(prompts::QUERY_TRANSFORM_PROMPT), messages)
            .await?;
        Ok(rewritten.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressionConfig;
    use crate::testutil::{doc, FakeLlm, FakeRetriever, LetterEmbedder};

    fn compressor() -> CompressionPipeline {
        CompressionPipeline::new(
            Arc::new(LetterEmbedder),
            CompressionConfig {
                segment_tokens: 2000,
                segment_overlap: 0,
                redundancy_threshold: 0.95,
                similarity_threshold: 0.0,
            },
        )
    }

    #[tokio::test]
    async fn first_turn_uses_raw_question_without_llm() {
        let base = FakeRetriever::returning(vec![doc("a.pdf", "alpha", 0.9, &["c1"])]);
        let llm = FakeLlm::scripted(&[]);
        let retriever = QueryTransformingRetriever::new(base.clone(), compressor(), llm.clone());

        let messages = vec![ChatMessage::user("what is alpha")];
        let documents = retriever.retrieve(&messages).await.unwrap();

        assert_eq!(llm.call_count(), 0);
        assert_eq!(base.queries(), vec!["what is alpha".to_string()]);
        assert_eq!(documents.len(), 1);
    }

    #[tokio::test]
    async fn later_turns_rewrite_the_query_first() {
        let base = FakeRetriever::returning(vec![doc("a.pdf", "alpha", 0.9, &["c1"])]);
        let llm = FakeLlm::scripted(&["  standalone alpha query \n"]);
        let retriever = QueryTransformingRetriever::new(base.clone(), compressor(), llm.clone());

        let messages = vec![
            ChatMessage::user("what is alpha"),
            ChatMessage::assistant("alpha is a letter"),
            ChatMessage::user("tell me more"),
        ];
        let documents = retriever.retrieve(&messages).await.unwrap();

        assert_eq!(llm.call_count(), 1);
        assert_eq!(base.queries(), vec!["standalone alpha query".to_string()]);
        assert_eq!(documents.len(), 1);
    }

    #[tokio::test]
    async fn empty_conversation_is_an_error() {
        let base = FakeRetriever::returning(Vec::new());
        let llm = FakeLlm::scripted(&[]);
        let retriever = QueryTransformingRetriever::new(base, compressor(), llm);

        assert!(retriever.retrieve(&[]).await.is_err());
    }
}

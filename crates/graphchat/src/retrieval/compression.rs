//! Context compression pipeline.
//!
//! Three stages in fixed order: token-bounded segmentation, embedding
//! redundancy removal, and a query-similarity floor. Each stage receives the
//! previous stage's output, and every segment keeps the metadata of the
//! document it came from. The stage-3 query similarity becomes the segment's
//! relevance score used for ranking downstream.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::config::CompressionConfig;
use crate::embeddings::{cosine_similarity, EmbeddingModel};
use crate::types::Document;

pub struct CompressionPipeline {
    embedder: Arc<dyn EmbeddingModel>,
    config: CompressionConfig,
}

impl CompressionPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingModel>, config: CompressionConfig) -> Self {
        Self { embedder, config }
    }

    /// Run all stages over the retrieved documents.
    pub async fn compress(&self, documents: Vec<Document>, query: &str) -> Result<Vec<Document>> {
        let input_count = documents.len();
        let segments = split_documents(
            &documents,
            self.config.segment_tokens,
            self.config.segment_overlap,
        );
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = segments.iter().map(|d| d.page_content.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;

        let kept = drop_redundant(&embeddings, self.config.redundancy_threshold);

        let query_embedding = self.embedder.embed_query(query).await?;
        let mut survivors = Vec::new();
        for idx in kept {
            let similarity = cosine_similarity(&query_embedding, &embeddings[idx]);
            if similarity >= self.config.similarity_threshold {
                let mut doc = segments[idx].clone();
                doc.score = similarity;
                survivors.push(doc);
            }
        }

        debug!(
            input = input_count,
            segments = segments.len(),
            output = survivors.len(),
            "compression pipeline complete"
        );
        Ok(survivors)
    }
}

/// Stage 1: split each document into token-bounded segments, each carrying
/// the originating document's metadata and score.
fn split_documents(documents: &[Document], max_tokens: usize, overlap: usize) -> Vec<Document> {
    let mut segments = Vec::new();
    for doc in documents {
        if doc.page_content.trim().is_empty() {
            continue;
        }
        for text in split_tokens(&doc.page_content, max_tokens, overlap) {
            segments.push(Document {
                page_content: text,
                score: doc.score,
                metadata: doc.metadata.clone(),
            });
        }
    }
    segments
}

/// Split text into whitespace-token windows of at most `max_tokens`.
/// Text within the bound is returned unchanged.
fn split_tokens(text: &str, max_tokens: usize, overlap: usize) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() <= max_tokens {
        return vec![text.to_string()];
    }

    // overlap < max_tokens is enforced by config validation
    let step = max_tokens - overlap;
    let mut segments = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let end = (start + max_tokens).min(tokens.len());
        segments.push(tokens[start..end].join(" "));
        if end == tokens.len() {
            break;
        }
        start += step;
    }
    segments
}

/// Stage 2: drop segments whose embedding is a near-duplicate of an earlier
/// kept segment. Returns indices of survivors in original order.
fn drop_redundant(embeddings: &[Vec<f32>], threshold: f32) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::new();
    'candidates: for i in 0..embeddings.len() {
        for &j in &kept {
            if cosine_similarity(&embeddings[i], &embeddings[j]) > threshold {
                continue 'candidates;
            }
        }
        kept.push(i);
    }
    kept
}

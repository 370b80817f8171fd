//! Remote embedding service over an OpenAI-style embeddings API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroUsize;

use super::EmbeddingModel;
use crate::config::EmbeddingConfig;

/// Embedding client with an LRU cache keyed by input text.
///
/// The compression pipeline re-embeds identical segment text across its
/// stages and across requests; the cache absorbs those repeats.
pub struct RemoteEmbeddings {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl RemoteEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(15))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let capacity = NonZeroUsize::new(config.cache_size.max(1))
            .unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let endpoint = format!("{}/embeddings", self.base_url);
        let request = json!({
            "model": self.model,
            "input": inputs,
        });

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Embedding request to {} timed out", endpoint)
                } else {
                    anyhow!("Embedding request to {} failed: {}", endpoint, e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(anyhow!("Embedding API error ({}): {}", status, error));
        }

        let mut result: EmbeddingsResponse = response.json().await?;
        if result.data.len() != inputs.len() {
            return Err(anyhow!(
                "Embedding API returned {} vectors for {} inputs",
                result.data.len(),
                inputs.len()
            ));
        }

        result.data.sort_by_key(|d| d.index);
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingModel for RemoteEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_documents(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned"))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Resolve cache hits first; only misses go over the wire.
        let mut resolved: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut misses: Vec<(usize, String)> = Vec::new();
        {
            let mut cache = self.cache.lock();
            for (i, text) in texts.iter().enumerate() {
                if text.trim().is_empty() {
                    resolved[i] = Some(Vec::new());
                } else if let Some(hit) = cache.get(text) {
                    resolved[i] = Some(hit.clone());
                } else {
                    misses.push((i, text.clone()));
                }
            }
        }

        if !misses.is_empty() {
            let inputs: Vec<String> = misses.iter().map(|(_, t)| t.clone()).collect();
            tracing::debug!(count = inputs.len(), "embedding cache misses");
            let fetched = self.request_embeddings(&inputs).await?;

            let mut cache = self.cache.lock();
            for ((i, text), embedding) in misses.into_iter().zip(fetched.into_iter()) {
                cache.put(text, embedding.clone());
                resolved[i] = Some(embedding);
            }
        }

        Ok(resolved.into_iter().flatten().collect())
    }

    fn dimension(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 1536,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_follows_model_table() {
        let mut config = EmbeddingConfig {
            model: "text-embedding-3-large".to_string(),
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            cache_size: 10,
        };
        let embedder = RemoteEmbeddings::new(&config).unwrap();
        assert_eq!(embedder.dimension(), 3072);

        config.model = "text-embedding-3-small".to_string();
        let embedder = RemoteEmbeddings::new(&config).unwrap();
        assert_eq!(embedder.dimension(), 1536);
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let config = EmbeddingConfig {
            model: "text-embedding-3-small".to_string(),
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            cache_size: 10,
        };
        let embedder = RemoteEmbeddings::new(&config).unwrap();
        let result = embedder.embed_documents(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn whitespace_only_text_gets_empty_vector_without_network() {
        let config = EmbeddingConfig {
            model: "text-embedding-3-small".to_string(),
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            cache_size: 10,
        };
        let embedder = RemoteEmbeddings::new(&config).unwrap();
        let result = embedder
            .embed_documents(&["   ".to_string()])
            .await
            .unwrap();
        assert_eq!(result, vec![Vec::<f32>::new()]);
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, constructed once at process start and passed by
/// reference into every component constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub graph: GraphConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub compression: CompressionConfig,
}

/// Bolt connection parameters for the graph database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

/// Provider credentials and generation limits for the chat models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub google_api_key: String,
    pub google_base_url: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Remote embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub cache_size: usize,
}

/// Vector-index retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub index_name: String,
    pub top_k: usize,
    pub score_threshold: f32,
    /// How many of the highest-scoring documents are rendered into the
    /// context block handed to the answering chain.
    pub max_context_documents: usize,
}

/// Compression pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub segment_tokens: usize,
    pub segment_overlap: usize,
    pub redundancy_threshold: f32,
    pub similarity_threshold: f32,
}

impl ChatConfig {
    /// Validate config values, returning errors for clearly broken
    /// configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.retrieval.index_name.is_empty() {
            return Err("retrieval.index_name must not be empty".into());
        }
        if self.retrieval.top_k == 0 {
            return Err("retrieval.top_k must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.retrieval.score_threshold) {
            return Err("retrieval.score_threshold must be in [0.0, 1.0]".into());
        }
        if self.retrieval.max_context_documents == 0 {
            return Err("retrieval.max_context_documents must be > 0".into());
        }
        if self.compression.segment_tokens == 0 {
            return Err("compression.segment_tokens must be > 0".into());
        }
        if self.compression.segment_overlap >= self.compression.segment_tokens {
            return Err("compression.segment_overlap must be < segment_tokens".into());
        }
        if !(0.0..=1.0).contains(&self.compression.similarity_threshold) {
            return Err("compression.similarity_threshold must be in [0.0, 1.0]".into());
        }
        if !(0.0..=1.0).contains(&self.compression.redundancy_threshold) {
            return Err("compression.redundancy_threshold must be in [0.0, 1.0]".into());
        }
        if self.llm.max_tokens == 0 {
            return Err("llm.max_tokens must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Build config from the environment, starting from defaults.
    ///
    /// Recognized variables: `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD`
    /// (required), `OPENAI_API_KEY`, `GOOGLE_API_KEY`, `EMBEDDING_MODEL`.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        if let Ok(uri) = std::env::var("NEO4J_URI") {
            config.graph.uri = uri;
        }
        if let Ok(user) = std::env::var("NEO4J_USERNAME") {
            config.graph.user = user;
        }
        config.graph.password =
            std::env::var("NEO4J_PASSWORD").map_err(|_| "NEO4J_PASSWORD not set".to_string())?;
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = key.clone();
            config.embedding.api_key = key;
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            config.llm.google_api_key = key;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig {
                uri: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password: String::new(),
            },
            llm: LlmConfig {
                openai_api_key: String::new(),
                openai_base_url: "https://api.openai.com/v1".to_string(),
                google_api_key: String::new(),
                google_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                max_tokens: 1000,
                temperature: 0.0,
            },
            embedding: EmbeddingConfig {
                model: "text-embedding-3-small".to_string(),
                api_key: String::new(),
                base_url: "https://api.openai.com/v1".to_string(),
                cache_size: 1000,
            },
            retrieval: RetrievalConfig {
                index_name: "vector".to_string(),
                top_k: 2,
                score_threshold: 0.7,
                max_context_documents: 5,
            },
            compression: CompressionConfig {
                segment_tokens: 2000,
                segment_overlap: 0,
                redundancy_threshold: 0.95,
                similarity_threshold: 0.35,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ChatConfig::default().validate().is_ok());
    }

    #[test]
    fn default_retrieval_parameters() {
        let config = ChatConfig::default();
        assert_eq!(config.retrieval.index_name, "vector");
        assert_eq!(config.retrieval.top_k, 2);
        assert!((config.retrieval.score_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.max_context_documents, 5);
    }

    #[test]
    fn zero_top_k_rejected() {
        let mut config = ChatConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_thresholds_rejected() {
        let mut config = ChatConfig::default();
        config.retrieval.score_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.compression.similarity_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overlap_must_be_smaller_than_segment() {
        let mut config = ChatConfig::default();
        config.compression.segment_overlap = config.compression.segment_tokens;
        assert!(config.validate().is_err());
    }
}

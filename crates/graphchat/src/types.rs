use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation. Messages are immutable once stored;
/// summarization replaces the stored sequence wholesale rather than editing
/// messages in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Metadata attached to a retrieved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source identifier: the document's URL, falling back to its file name.
    pub source: String,
    /// Ids of the chunks that contributed to this document's text.
    pub chunk_ids: Vec<String>,
}

/// A retrieval result: concatenated chunk texts plus rendered entity
/// relationship triples, scored by relevance to the query. Transient:
/// produced per request, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_content: String,
    pub score: f32,
    pub metadata: DocumentMetadata,
}

/// The `info` block of a [`QAResponse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseInfo {
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "chunkids")]
    pub chunk_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response envelope returned to the caller.
///
/// `info.error` is present only on failure, in which case `sources` and
/// `chunk_ids` are empty vectors (never null) and `message` is the fixed
/// fallback phrase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QAResponse {
    pub session_id: String,
    pub message: String,
    pub info: ResponseInfo,
    pub user: String,
}

impl QAResponse {
    pub fn failure(session_id: &str, error: String) -> Self {
        Self {
            session_id: session_id.to_string(),
            message: crate::prompts::FALLBACK_MESSAGE.to_string(),
            info: ResponseInfo {
                sources: Vec::new(),
                model: None,
                chunk_ids: Vec::new(),
                error: Some(error),
            },
            user: crate::prompts::RESPONDER_TAG.to_string(),
        }
    }
}

/// Envelope returned by a session reset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub message: String,
    pub user: String,
}

/// An LLM answer split into its parts: the visible content with citation
/// brackets stripped, the cited source names, and the chunk ids recovered
/// from retrieved-document metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub content: String,
    pub sources: Vec<String>,
    pub chunk_ids: Vec<String>,
}

//! Best-effort extraction of cited sources from free-text model answers.
//!
//! The answering prompt mandates a `[Sources: a, b]` footer, but the model
//! is free text: missing or malformed citations must degrade gracefully, and
//! sources the model invents are kept in the list without contributing chunk
//! ids.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::{Document, ParsedResponse};

static SOURCES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Sources: ([^\]]+)\]").expect("sources regex is valid"));

static SOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Source: ([^\]]+)\]").expect("source regex is valid"));

/// Parse a raw model answer against the retrieved documents.
///
/// The first plural match and the first singular match are captured (plural
/// first in the merged list); every occurrence of both patterns is stripped
/// from the returned content. Chunk ids accumulate for cited sources that
/// appear in the retrieved documents' metadata.
pub fn parse_ai_response(response: &str, documents: &[Document]) -> ParsedResponse {
    let mut sources: Vec<String> = SOURCES_RE
        .captures(response)
        .map(|captures| captures[1].split(", ").map(str::to_string).collect())
        .unwrap_or_default();
    let content = SOURCES_RE.replace_all(response, "").into_owned();

    if let Some(captures) = SOURCE_RE.captures(response) {
        sources.extend(captures[1].split(", ").map(str::to_string));
    }
    let content = SOURCE_RE.replace_all(&content, "").into_owned();

    let mut metadata_index: HashMap<&str, &[String]> = HashMap::new();
    for doc in documents {
        metadata_index.insert(doc.metadata.source.as_str(), &doc.metadata.chunk_ids);
    }

    let mut chunk_ids = Vec::new();
    for source in &sources {
        if let Some(ids) = metadata_index.get(source.as_str()) {
            chunk_ids.extend(ids.iter().cloned());
        }
    }

    ParsedResponse {
        content,
        sources,
        chunk_ids,
    }
}

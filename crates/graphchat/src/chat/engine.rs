//! QA orchestration: the per-request sequence from model resolution to the
//! response envelope.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use super::history::{GraphMessageHistory, MessageHistory};
use super::parser::parse_ai_response;
use super::summarizer::summarize_session;
use crate::config::ChatConfig;
use crate::embeddings::{EmbeddingModel, RemoteEmbeddings};
use crate::error::error_descriptor;
use crate::graph::GraphStore;
use crate::llm::{resolve_model, LanguageModel};
use crate::prompts;
use crate::retrieval::{CompressionPipeline, QueryTransformingRetriever, VectorGraphRetriever};
use crate::types::{
    ChatMessage, Document, ParsedResponse, QAResponse, ResetResponse, ResponseInfo,
};

/// The question-answering engine. One instance is shared across requests;
/// each call builds its own model handle, retriever, and history view.
pub struct ChatEngine {
    config: ChatConfig,
    store: GraphStore,
    embedder: Arc<dyn EmbeddingModel>,
}

impl ChatEngine {
    /// Validate the config, connect to the graph store, and set up the
    /// embedding client.
    pub async fn connect(config: ChatConfig) -> Result<Self> {
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        let store = GraphStore::connect(&config.graph).await?;
        store.verify_connectivity().await?;
        let embedder: Arc<dyn EmbeddingModel> = Arc::new(RemoteEmbeddings::new(&config.embedding)?);
        Ok(Self {
            config,
            store,
            embedder,
        })
    }

    /// Answer a question within a session.
    ///
    /// Never returns an error: any failure at any stage is folded into the
    /// envelope with a populated `info.error`, empty sources/chunk ids, and
    /// the fixed fallback message. No partial results are surfaced.
    pub async fn answer(&self, model: &str, question: &str, session_id: &str) -> QAResponse {
        let started = Instant::now();
        let outcome = self.answer_inner(model, question, session_id).await;
        info!(
            session = session_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "QA request complete"
        );
        respond(session_id, outcome)
    }

    async fn answer_inner(
        &self,
        model: &str,
        question: &str,
        session_id: &str,
    ) -> Result<(ParsedResponse, String)> {
        let setup_started = Instant::now();
        let selection = resolve_model(model, &self.config.llm, None)?;
        let base =
            VectorGraphRetriever::attach(&self.store, self.embedder.clone(), &self.config.retrieval)
                .await?;
        let retriever = QueryTransformingRetriever::new(
            Arc::new(base),
            CompressionPipeline::new(self.embedder.clone(), self.config.compression.clone()),
            selection.llm.clone(),
        );
        let history = GraphMessageHistory::open(&self.store, session_id).await?;
        info!(
            elapsed_ms = setup_started.elapsed().as_millis() as u64,
            "chat setup complete"
        );

        let parsed = run_pipeline(
            selection.llm.as_ref(),
            &retriever,
            &history,
            question,
            self.config.retrieval.max_context_documents,
        )
        .await?;

        Ok((parsed, selection.version))
    }

    /// Clear the stored history for a session and return the reset envelope.
    pub async fn reset_session(&self, session_id: &str) -> Result<ResetResponse> {
        let history = GraphMessageHistory::open(&self.store, session_id).await?;
        history.clear().await?;
        info!(session = session_id, "chat history cleared");

        Ok(ResetResponse {
            session_id: session_id.to_string(),
            message: prompts::RESET_MESSAGE.to_string(),
            user: prompts::RESPONDER_TAG.to_string(),
        })
    }
}

/// The QA sequence shared by the engine: load history, retrieve, answer,
/// parse, then compact the history.
pub(crate) async fn run_pipeline(
    llm: &dyn LanguageModel,
    retriever: &QueryTransformingRetriever,
    history: &dyn MessageHistory,
    question: &str,
    max_context_documents: usize,
) -> Result<ParsedResponse> {
    let mut messages = history.messages().await?;
    messages.push(ChatMessage::user(question));

    let retrieval_started = Instant::now();
    let documents = retriever.retrieve(&messages).await?;
    let context = format_documents(&documents, max_context_documents);
    info!(
        count = documents.len(),
        elapsed_ms = retrieval_started.elapsed().as_millis() as u64,
        "documents retrieved"
    );

    let predict_started = Instant::now();
    let response = run_rag_chain(llm, &messages[..messages.len() - 1], &context, question).await?;
    let parsed = parse_ai_response(&response, &documents);
    info!(
        elapsed_ms = predict_started.elapsed().as_millis() as u64,
        "response predicted"
    );

    messages.push(ChatMessage::assistant(response));

    let summarize_started = Instant::now();
    summarize_session(llm, history, &messages).await?;
    info!(
        elapsed_ms = summarize_started.elapsed().as_millis() as u64,
        "chat history summarized"
    );

    Ok(parsed)
}

/// Invoke the answering chain once: system prompt with the context block,
/// the prior conversation (excluding the just-asked question), then the
/// question itself.
pub(crate) async fn run_rag_chain(
    llm: &dyn LanguageModel,
    prior: &[ChatMessage],
    context: &str,
    question: &str,
) -> Result<String> {
    let system = prompts::render_system_prompt(context);
    let mut messages: Vec<ChatMessage> = prior.to_vec();
    messages.push(ChatMessage::user(format!("User question: {}", question)));
    llm.generate(Some(&system), &messages).await
}

/// Render the highest-scoring documents into the context block, descending
/// by relevance score, capped at `limit`.
pub(crate) fn format_documents(documents: &[Document], limit: usize) -> String {
    let mut sorted: Vec<&Document> = documents.iter().collect();
    sorted.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(limit);

    sorted
        .iter()
        .map(|doc| {
            format!(
                "Document start\nContent: {}\nMetadata:- source : {}\nDocument end\n",
                doc.page_content, doc.metadata.source
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fold the pipeline outcome into the response envelope.
pub(crate) fn respond(session_id: &str, outcome: Result<(ParsedResponse, String)>) -> QAResponse {
    match outcome {
        Ok((parsed, version)) => QAResponse {
            session_id: session_id.to_string(),
            message: parsed.content,
            info: ResponseInfo {
                sources: parsed.sources,
                model: Some(version),
                chunk_ids: parsed.chunk_ids,
                error: None,
            },
            user: prompts::RESPONDER_TAG.to_string(),
        },
        Err(err) => {
            error!(error = %err, session = session_id, "QA pipeline failed");
            QAResponse::failure(session_id, error_descriptor(&err))
        }
    }
}

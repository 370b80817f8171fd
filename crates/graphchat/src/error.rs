//! Typed soft-failure taxonomy for component construction.
//!
//! Construction failures (unknown model, vector index missing, history store
//! unreachable) are recoverable conditions the orchestrator folds into the
//! failure envelope. Runtime errors elsewhere propagate as `anyhow::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("unsupported model: {0}")]
    UnknownModel(String),

    #[error("failed to attach to vector index '{index}': {reason}")]
    Retriever { index: String, reason: String },

    #[error("failed to open chat history for session '{session}': {reason}")]
    History { session: String, reason: String },

    #[error("graph connection failed: {0}")]
    Connection(String),
}

impl SetupError {
    /// Short name used in the error descriptor of the failure envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownModel(_) => "UnknownModel",
            Self::Retriever { .. } => "RetrieverError",
            Self::History { .. } => "HistoryError",
            Self::Connection(_) => "ConnectionError",
        }
    }
}

/// Render an error as `"<Kind> :- <message>"` for the `info.error` field.
pub fn error_descriptor(err: &anyhow::Error) -> String {
    let kind = err
        .downcast_ref::<SetupError>()
        .map(SetupError::kind)
        .unwrap_or("RuntimeError");
    format!("{} :- {}", kind, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_descriptor_carries_kind_and_message() {
        let err = anyhow::Error::new(SetupError::UnknownModel("GPT-9".to_string()));
        assert_eq!(error_descriptor(&err), "UnknownModel :- unsupported model: GPT-9");
    }

    #[test]
    fn runtime_error_descriptor_uses_generic_kind() {
        let err = anyhow::anyhow!("embedding request timed out");
        assert_eq!(
            error_descriptor(&err),
            "RuntimeError :- embedding request timed out"
        );
    }
}

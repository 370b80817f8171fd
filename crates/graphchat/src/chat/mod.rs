//! Conversation surface: session history, response parsing, summarization,
//! and the QA engine itself.

pub mod engine;
pub mod history;
pub mod parser;
pub mod summarizer;

pub use engine::ChatEngine;
pub use history::{GraphMessageHistory, MessageHistory};
pub use parser::parse_ai_response;

use uuid::Uuid;

/// Generate a fresh opaque session identifier.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }
}

//! Lossy compaction of chat history.
//!
//! After every answer the accumulated conversation is distilled into a
//! single summary message, and the stored history is replaced with a fixed
//! marker plus that summary. Verbatim turn-by-turn detail is deliberately
//! discarded to bound context growth.

use anyhow::Result;
use tracing::debug;

use super::history::MessageHistory;
use crate::llm::LanguageModel;
use crate::prompts;
use crate::types::ChatMessage;

/// Summarize the conversation and replace the stored history.
///
/// Returns `false` (leaving history untouched) when there is nothing to
/// summarize. Otherwise the post-condition is exactly two stored messages:
/// the marker user message followed by the assistant summary.
pub async fn summarize_session(
    llm: &dyn LanguageModel,
    history: &dyn MessageHistory,
    messages: &[ChatMessage],
) -> Result<bool> {
    if messages.is_empty() {
        return Ok(false);
    }

    let mut prompt_messages: Vec<ChatMessage> = messages.to_vec();
    prompt_messages.push(ChatMessage::user(prompts::SUMMARIZATION_PROMPT));
    let summary = llm.generate(None, &prompt_messages).await?;

    history.clear().await?;
    history
        .append(&ChatMessage::user(prompts::SUMMARY_MARKER))
        .await?;
    history.append(&ChatMessage::assistant(summary)).await?;

    debug!(compacted = messages.len(), "chat history summarized");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeHistory, FakeLlm};
    use crate::types::ChatRole;

    #[tokio::test]
    async fn empty_history_is_a_no_op() {
        let llm = FakeLlm::scripted(&["should not be called"]);
        let history = FakeHistory::with_messages(Vec::new());

        let summarized = summarize_session(llm.as_ref(), history.as_ref(), &[])
            .await
            .unwrap();

        assert!(!summarized);
        assert_eq!(llm.call_count(), 0);
        assert!(history.snapshot().is_empty());
    }

    #[tokio::test]
    async fn history_is_replaced_by_marker_and_summary() {
        let llm = FakeLlm::scripted(&["they prefer concise answers about alpha"]);
        let history = FakeHistory::with_messages(vec![
            ChatMessage::user("old question"),
            ChatMessage::assistant("old answer"),
        ]);
        let messages = vec![
            ChatMessage::user("old question"),
            ChatMessage::assistant("old answer"),
            ChatMessage::user("what is alpha"),
            ChatMessage::assistant("alpha is a letter"),
        ];

        let summarized = summarize_session(llm.as_ref(), history.as_ref(), &messages)
            .await
            .unwrap();

        assert!(summarized);
        let stored = history.snapshot();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, ChatRole::User);
        assert_eq!(stored[0].content, prompts::SUMMARY_MARKER);
        assert_eq!(stored[1].role, ChatRole::Assistant);
        assert_eq!(stored[1].content, "they prefer concise answers about alpha");
    }

    #[tokio::test]
    async fn summarization_prompt_is_appended_to_the_conversation() {
        let llm = FakeLlm::scripted(&["summary"]);
        let history = FakeHistory::with_messages(Vec::new());
        let messages = vec![ChatMessage::user("q"), ChatMessage::assistant("a")];

        summarize_session(llm.as_ref(), history.as_ref(), &messages)
            .await
            .unwrap();

        // One call, seeing the conversation plus the instruction message.
        assert_eq!(llm.call_count(), 1);
        assert_eq!(llm.last_message_count(), 3);
    }
}

//! Fixed prompt text used by the QA pipeline.
//!
//! The citation footer format in [`SYSTEM_TEMPLATE`] is a contract with the
//! response parser: sources must appear as `[Sources: source1, source2]`
//! using the exact source names from document metadata. The model is free
//! text, so the parser treats the format as best-effort.

/// System prompt for the answering chain. `{context}` is replaced with the
/// formatted document block before the call.
pub const SYSTEM_TEMPLATE: &str = "\
You are an AI-powered question-answering agent. Provide accurate and concise \
responses to user queries based on the given context, the chat history, and \
available resources.

### Response guidelines:
1. **Direct answers**: Answer the user's query straightforwardly, without \
headers unless requested. Avoid speculative responses.
2. **Use history and context**: Draw on relevant information from previous \
turns, the current input, and the context below.
3. **No greetings in follow-ups**: Greet only in the initial interaction, \
not in subsequent responses unless the chat restarts.
4. **Source citation**: Cite your sources from the corresponding document's \
metadata within the context, using the exact source names as provided, \
without modification. If no information from the context is used, include no \
sources. Format: `[Sources: source1, source2]`.
5. **Admit unknowns**: State clearly when an answer is unknown. Make no \
unsupported statements.
6. **Avoid hallucination**: Only provide information grounded in the \
context. Do not invent information.
7. **Response length**: Keep responses concise and relevant, within 2-3 \
sentences unless more detail is requested.
8. **Tone**: Professional, informative, friendly.
9. **Ambiguity**: If a query is unclear, ask for clarification rather than \
guessing.
10. **Fallback**: If the required information is not in the context, respond \
politely, e.g. \"I don't have that information right now. Would you like me \
to look it up for you?\"

### Context:
<context>
{context}
</context>

***IMPORTANT***: output sources in the format `[Sources: source1, source2]` \
and keep each source exactly as it appears in the context metadata.";

/// Instruction for rewriting a conversation into a standalone search query.
pub const QUERY_TRANSFORM_PROMPT: &str = "\
Given the below conversation, generate a search query to look up in order \
to get information relevant to the conversation. Only respond with the \
query, nothing else.";

/// Human instruction appended to the message list when summarizing history.
pub const SUMMARIZATION_PROMPT: &str = "\
Summarize the above chat messages into a concise message, focusing on key \
points and relevant details. Highlight specific user preferences, requests, \
and essential context that will aid in future conversations. Exclude all \
introductions and extraneous information.";

/// Marker user message stored ahead of the summary after each compaction.
pub const SUMMARY_MARKER: &str = "Our current conversation summary till now";

/// User-facing message of the failure envelope.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Message returned when a session's history is cleared.
pub const RESET_MESSAGE: &str = "The chat history is cleared";

/// Fixed tag identifying the responder in every envelope.
pub const RESPONDER_TAG: &str = "chatbot";

/// Render the answering system prompt with the retrieved context block.
pub fn render_system_prompt(context: &str) -> String {
    SYSTEM_TEMPLATE.replace("{context}", context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_injects_context() {
        let prompt = render_system_prompt("Document start\nContent: hello\nDocument end");
        assert!(prompt.contains("Content: hello"));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn system_template_mandates_citation_format() {
        assert!(SYSTEM_TEMPLATE.contains("[Sources: source1, source2]"));
    }
}

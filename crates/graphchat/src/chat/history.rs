//! Session-scoped chat message persistence in the graph database.
//!
//! Sessions are created implicitly on first use and persist until cleared.
//! Messages hang off the session node and are read back oldest-first.
//! Concurrent appends to one session carry no ordering guarantee beyond what
//! the database provides transactionally.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use neo4rs::{query, Graph};
use tracing::warn;

use crate::error::SetupError;
use crate::graph::GraphStore;
use crate::types::{ChatMessage, ChatRole};

/// Capability interface for session message storage.
#[async_trait]
pub trait MessageHistory: Send + Sync {
    /// All messages for the session, oldest first.
    async fn messages(&self) -> Result<Vec<ChatMessage>>;

    /// Append one message.
    async fn append(&self, message: &ChatMessage) -> Result<()>;

    /// Delete all messages for the session.
    async fn clear(&self) -> Result<()>;
}

/// Message history stored as
/// `(s:Session {id})-[:HAS_MESSAGE]->(m:Message {role, content, seq, created_at})`.
pub struct GraphMessageHistory {
    graph: Graph,
    session_id: String,
}

impl GraphMessageHistory {
    /// Open (creating if needed) the session's history.
    ///
    /// An unreachable store is a recoverable soft failure
    /// ([`SetupError::History`]) the orchestrator must handle.
    pub async fn open(store: &GraphStore, session_id: &str) -> Result<Self, SetupError> {
        let ensure = query("MERGE (s:Session {id: $session_id})").param("session_id", session_id);
        store.graph().run(ensure).await.map_err(|e| SetupError::History {
            session: session_id.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            graph: store.graph().clone(),
            session_id: session_id.to_string(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl MessageHistory for GraphMessageHistory {
    async fn messages(&self) -> Result<Vec<ChatMessage>> {
        let q = query(
            "MATCH (s:Session {id: $session_id})-[:HAS_MESSAGE]->(m:Message)
             RETURN m.role AS role, m.content AS content
             ORDER BY m.seq ASC, m.created_at ASC",
        )
        .param("session_id", self.session_id.as_str());

        let mut rows = self.graph.execute(q).await?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            let role: String = row.get("role")?;
            let content: String = row.get("content")?;
            match parse_role(&role) {
                Some(role) => messages.push(ChatMessage { role, content }),
                None => warn!(role = %role, "skipping stored message with unknown role"),
            }
        }
        Ok(messages)
    }

    async fn append(&self, message: &ChatMessage) -> Result<()> {
        let q = query(
            "MATCH (s:Session {id: $session_id})
             OPTIONAL MATCH (s)-[:HAS_MESSAGE]->(existing:Message)
             WITH s, count(existing) AS n
             CREATE (s)-[:HAS_MESSAGE]->(:Message {
                 role: $role,
                 content: $content,
                 seq: n,
                 created_at: $created_at
             })",
        )
        .param("session_id", self.session_id.as_str())
        .param("role", message.role.as_str())
        .param("content", message.content.as_str())
        .param("created_at", Utc::now().timestamp_millis());

        self.graph.run(q).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let q = query(
            "MATCH (s:Session {id: $session_id})-[:HAS_MESSAGE]->(m:Message) DETACH DELETE m",
        )
        .param("session_id", self.session_id.as_str());

        self.graph.run(q).await?;
        Ok(())
    }
}

fn parse_role(role: &str) -> Option<ChatRole> {
    match role {
        "user" => Some(ChatRole::User),
        "assistant" => Some(ChatRole::Assistant),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_storage_form() {
        assert_eq!(parse_role(ChatRole::User.as_str()), Some(ChatRole::User));
        assert_eq!(
            parse_role(ChatRole::Assistant.as_str()),
            Some(ChatRole::Assistant)
        );
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert_eq!(parse_role("system"), None);
        assert_eq!(parse_role(""), None);
    }
}

//! Graph database connection handle.

use anyhow::Result;
use neo4rs::{query, Graph};
use tracing::info;

use crate::config::GraphConfig;
use crate::error::SetupError;

/// Bolt connection to the graph database. `neo4rs::Graph` is internally
/// pooled and cheap to clone; one `GraphStore` is shared across requests.
#[derive(Clone)]
pub struct GraphStore {
    graph: Graph,
}

impl GraphStore {
    /// Connect to the graph database.
    pub async fn connect(config: &GraphConfig) -> Result<Self, SetupError> {
        let graph = Graph::new(config.uri.as_str(), config.user.as_str(), config.password.as_str())
            .await
            .map_err(|e| SetupError::Connection(e.to_string()))?;

        info!(uri = %config.uri, "connected to graph database");
        Ok(Self { graph })
    }

    /// Run a trivial query to confirm the connection is usable.
    pub async fn verify_connectivity(&self) -> Result<()> {
        let mut result = self.graph.execute(query("RETURN 1 AS ok")).await?;
        result.next().await?;
        Ok(())
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

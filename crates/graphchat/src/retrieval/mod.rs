//! Retrieval over the graph store: vector-index search plus entity-graph
//! traversal, followed by context compression.

pub mod compression;
pub mod query_transform;

use anyhow::Result;
use async_trait::async_trait;
use neo4rs::{query, Graph};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingModel;
use crate::error::SetupError;
use crate::graph::GraphStore;
use crate::types::{Document, DocumentMetadata};

pub use compression::CompressionPipeline;
pub use query_transform::QueryTransformingRetriever;

/// Capability interface: ranked documents relevant to a query string.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>>;
}

/// Fixed retrieval query bound to the vector index.
///
/// For each matching chunk: find the owning document, traverse up to 3 hops
/// outward from entities linked via HAS_ENTITY (excluding HAS_ENTITY and
/// PART_OF edges), deduplicate the collected relationships, and render them
/// as `Type:ID RELATION Type:ID` triples beneath the concatenated chunk
/// texts. Grouped per document with the average chunk score.
const RETRIEVAL_QUERY: &str = r#"
CALL db.index.vector.queryNodes($index_name, $k, $embedding)
YIELD node, score
WITH node AS chunk, score
WHERE score >= $score_threshold
MATCH (chunk)-[:PART_OF]->(d:Document)
CALL { WITH chunk
MATCH (chunk)-[:HAS_ENTITY]->(e)
MATCH path=(e)(()-[rels:!HAS_ENTITY&!PART_OF]-()){0,3}(:!Chunk&!Document)
UNWIND rels AS r
RETURN collect(distinct r) AS rels
}
WITH d, collect(DISTINCT chunk) AS chunks, avg(score) AS score,
     apoc.coll.toSet(apoc.coll.flatten(collect(rels))) AS rels
WITH d, score,
     [c IN chunks | c.text] AS texts,
     [c IN chunks | c.id] AS chunkIds,
     [r IN rels |
        coalesce(apoc.coll.removeAll(labels(startNode(r)), ['__Entity__'])[0], '')
        + ':' + startNode(r).id + ' ' + type(r) + ' '
        + coalesce(apoc.coll.removeAll(labels(endNode(r)), ['__Entity__'])[0], '')
        + ':' + endNode(r).id] AS entities
RETURN apoc.text.join(texts, '\n----\n') + apoc.text.join(entities, '\n') AS text,
       score,
       coalesce(CASE WHEN d.url CONTAINS 'None' THEN d.fileName ELSE d.url END, d.fileName) AS source,
       chunkIds
"#;

const INDEX_CHECK_QUERY: &str = "SHOW INDEXES YIELD name, type WHERE type = 'VECTOR' RETURN name";

/// Retriever attached to a pre-existing vector index in the graph store.
pub struct VectorGraphRetriever {
    graph: Graph,
    embedder: Arc<dyn EmbeddingModel>,
    index_name: String,
    top_k: usize,
    score_threshold: f32,
}

impl VectorGraphRetriever {
    /// Attach to the named vector index.
    ///
    /// A missing index or an unreachable store is a recoverable soft failure
    /// ([`SetupError::Retriever`]) the orchestrator must handle.
    pub async fn attach(
        store: &GraphStore,
        embedder: Arc<dyn EmbeddingModel>,
        config: &RetrievalConfig,
    ) -> Result<Self, SetupError> {
        let setup_failure = |reason: String| SetupError::Retriever {
            index: config.index_name.clone(),
            reason,
        };

        let check = query(INDEX_CHECK_QUERY);
        let mut rows = store
            .graph()
            .execute(check)
            .await
            .map_err(|e| setup_failure(e.to_string()))?;
        let mut found = false;
        while let Some(row) = rows.next().await.map_err(|e| setup_failure(e.to_string()))? {
            let name: String = row.get("name").map_err(|e| setup_failure(e.to_string()))?;
            if name == config.index_name {
                found = true;
                break;
            }
        }
        if !found {
            return Err(setup_failure("vector index not found".to_string()));
        }

        info!(
            index = %config.index_name,
            top_k = config.top_k,
            score_threshold = config.score_threshold,
            "attached to vector index"
        );

        Ok(Self {
            graph: store.graph().clone(),
            embedder,
            index_name: config.index_name.clone(),
            top_k: config.top_k,
            score_threshold: config.score_threshold,
        })
    }
}

#[async_trait]
impl Retriever for VectorGraphRetriever {
    async fn retrieve(&self, query_text: &str) -> Result<Vec<Document>> {
        let embedding: Vec<f64> = self
            .embedder
            .embed_query(query_text)
            .await?
            .into_iter()
            .map(f64::from)
            .collect();

        let q = query(RETRIEVAL_QUERY)
            .param("index_name", self.index_name.as_str())
            .param("k", self.top_k as i64)
            .param("embedding", embedding)
            .param("score_threshold", f64::from(self.score_threshold));

        let mut rows = self.graph.execute(q).await?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let text: String = row.get("text")?;
            let score: f64 = row.get("score")?;
            let source: String = row.get("source")?;
            let chunk_ids: Vec<String> = row.get("chunkIds")?;

            documents.push(Document {
                page_content: text,
                score: score as f32,
                metadata: DocumentMetadata { source, chunk_ids },
            });
        }

        debug!(count = documents.len(), "vector index returned documents");
        Ok(documents)
    }
}

// src/knowledge/mod.rs

//! Knowledge search over the vector store.
//!
//! Maps raw store matches into the normalised `SearchHit` shape and
//! ingests new documents. The store itself is injected as a trait object
//! so handlers never reach for a global client.

pub mod embed;
pub mod store;

pub use store::{KnowledgeStore, LocalVectorStore, Metadata, NewDocument, StoredMatch};

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("vector store I/O failed at {0:?}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("vector store file {0:?} is unreadable: {1}")]
    Corrupt(PathBuf, #[source] serde_json::Error),

    #[error("failed to serialise vector store: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("vector store was built with {stored} dimensions, embedder uses {expected}")]
    Dimensions { stored: usize, expected: usize },

    #[error("vector store write task failed: {0}")]
    Task(#[source] tokio::task::JoinError),

    #[error("got {documents} documents but {metadatas} metadata entries")]
    Mismatch { documents: usize, metadatas: usize },
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: Option<String>,
    pub score: f64,
}

/// Search and ingestion front-end for a `KnowledgeStore`.
#[derive(Clone)]
pub struct KnowledgeBase {
    store: Arc<dyn KnowledgeStore>,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Return at most `k` hits ordered by descending score.
    ///
    /// `score = 1 - distance`, rounded to four decimals. Distances above 1
    /// produce negative scores; they are not clamped.
    pub async fn search_kb(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, KnowledgeError> {
        let matches = self.store.query(query, k).await?;

        let mut hits: Vec<SearchHit> = matches.into_iter().map(to_hit).collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    /// Ingest documents and return their fresh ids.
    ///
    /// Without metadata every document gets a generated `doc-<uuid>` title.
    /// Identical content added twice is stored twice.
    pub async fn add_documents(
        &self,
        documents: Vec<String>,
        metadatas: Option<Vec<Metadata>>,
    ) -> Result<Vec<String>, KnowledgeError> {
        let metadatas = match metadatas {
            Some(m) if m.len() != documents.len() => {
                return Err(KnowledgeError::Mismatch {
                    documents: documents.len(),
                    metadatas: m.len(),
                })
            }
            Some(m) => m,
            None => documents.iter().map(|_| generated_title()).collect(),
        };

        let batch: Vec<NewDocument> = documents
            .into_iter()
            .zip(metadatas)
            .map(|(text, metadata)| NewDocument {
                id: Uuid::new_v4().to_string(),
                text,
                metadata,
            })
            .collect();

        let ids = batch.iter().map(|d| d.id.clone()).collect();
        self.store.add(batch).await?;
        Ok(ids)
    }

    pub async fn count(&self) -> Result<usize, KnowledgeError> {
        self.store.count().await
    }
}

fn generated_title() -> Metadata {
    let mut meta = Metadata::new();
    meta.insert(
        "title".to_string(),
        Value::String(format!("doc-{}", Uuid::new_v4())),
    );
    meta
}

fn to_hit(m: StoredMatch) -> SearchHit {
    let title = m
        .metadata
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Untitled")
        .to_string();

    let url = m
        .metadata
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string);

    SearchHit {
        title,
        snippet: m.document,
        url,
        score: round4(1.0 - f64::from(m.distance)),
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

// src/knowledge/store.rs

//! Vector store seam and the local persisted implementation.

use super::embed::{cosine_distance, HashingEmbedder};
use super::KnowledgeError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;

pub type Metadata = Map<String, Value>;

const COLLECTION_NAME: &str = "default";

/// A document ready to be stored.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// A raw nearest-neighbour match, closest first.
#[derive(Debug, Clone)]
pub struct StoredMatch {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub distance: f32,
}

/// Nearest-neighbour text search over stored documents.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Return up to `n_results` documents ordered by ascending distance.
    async fn query(&self, text: &str, n_results: usize) -> Result<Vec<StoredMatch>, KnowledgeError>;

    /// Append documents. Existing ids are not checked.
    async fn add(&self, documents: Vec<NewDocument>) -> Result<(), KnowledgeError>;

    async fn count(&self) -> Result<usize, KnowledgeError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    id: String,
    document: String,
    #[serde(default)]
    metadata: Metadata,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct CollectionFile {
    dimensions: usize,
    records: Vec<Record>,
}

/// Single-collection store persisted as JSON under a directory.
///
/// The whole collection is kept in memory; every `add` rewrites the file
/// through a temp file and an atomic rename.
pub struct LocalVectorStore {
    dir: PathBuf,
    file: PathBuf,
    embedder: HashingEmbedder,
    records: RwLock<Vec<Record>>,
}

impl LocalVectorStore {
    /// Open (or create) the store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, KnowledgeError> {
        Self::open_with(dir, HashingEmbedder::default())
    }

    pub fn open_with(dir: &Path, embedder: HashingEmbedder) -> Result<Self, KnowledgeError> {
        std::fs::create_dir_all(dir).map_err(|e| KnowledgeError::Io(dir.to_path_buf(), e))?;

        let file = dir.join(format!("{}.json", COLLECTION_NAME));
        let records = if file.exists() {
            let raw = std::fs::read_to_string(&file)
                .map_err(|e| KnowledgeError::Io(file.clone(), e))?;
            let collection: CollectionFile = serde_json::from_str(&raw)
                .map_err(|e| KnowledgeError::Corrupt(file.clone(), e))?;

            if collection.dimensions != embedder.dimensions() {
                return Err(KnowledgeError::Dimensions {
                    stored: collection.dimensions,
                    expected: embedder.dimensions(),
                });
            }
            collection.records
        } else {
            Vec::new()
        };

        tracing::debug!(path = %file.display(), documents = records.len(), "vector store opened");

        Ok(Self {
            dir: dir.to_path_buf(),
            file,
            embedder,
            records: RwLock::new(records),
        })
    }
}

#[derive(Serialize)]
struct CollectionRef<'a> {
    name: &'a str,
    dimensions: usize,
    records: &'a [Record],
}

/// Write the collection through a temp file in `dir`, then rename it over `file`.
fn persist(dir: &Path, file: &Path, dimensions: usize, records: &[Record]) -> Result<(), KnowledgeError> {
    let collection = CollectionRef {
        name: COLLECTION_NAME,
        dimensions,
        records,
    };
    let bytes = serde_json::to_vec(&collection).map_err(KnowledgeError::Serialize)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| KnowledgeError::Io(dir.to_path_buf(), e))?;
    tmp.write_all(&bytes)
        .map_err(|e| KnowledgeError::Io(tmp.path().to_path_buf(), e))?;
    tmp.persist(file)
        .map_err(|e| KnowledgeError::Io(file.to_path_buf(), e.error))?;

    Ok(())
}

#[async_trait]
impl KnowledgeStore for LocalVectorStore {
    async fn query(&self, text: &str, n_results: usize) -> Result<Vec<StoredMatch>, KnowledgeError> {
        let query = self.embedder.embed(text);
        let records = self.records.read().await;

        let mut matches: Vec<StoredMatch> = records
            .iter()
            .map(|r| StoredMatch {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                distance: cosine_distance(&query, &r.embedding),
            })
            .collect();

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(n_results);
        Ok(matches)
    }

    async fn add(&self, documents: Vec<NewDocument>) -> Result<(), KnowledgeError> {
        let mut records = self.records.write().await;

        let mut next = records.clone();
        next.extend(documents.into_iter().map(|doc| Record {
            embedding: self.embedder.embed(&doc.text),
            id: doc.id,
            document: doc.text,
            metadata: doc.metadata,
        }));

        // Lock stays held so concurrent writers persist in order. Memory is
        // only updated once the file is written.
        let dir = self.dir.clone();
        let file = self.file.clone();
        let dimensions = self.embedder.dimensions();
        let next = tokio::task::spawn_blocking(move || {
            persist(&dir, &file, dimensions, &next).map(|()| next)
        })
        .await
        .map_err(KnowledgeError::Task)??;

        *records = next;
        Ok(())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> NewDocument {
        NewDocument {
            id: id.to_string(),
            text: text.to_string(),
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn query_orders_by_distance_and_bounds_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path()).unwrap();

        store
            .add(vec![
                doc("a", "docker compose volumes"),
                doc("b", "python list comprehension"),
                doc("c", "python dict comprehension"),
            ])
            .await
            .unwrap();

        let hits = store.query("python list comprehension", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalVectorStore::open(dir.path()).unwrap();
            store.add(vec![doc("a", "persist me")]).await.unwrap();
        }

        let reopened = LocalVectorStore::open(dir.path()).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(reopened.query("persist me", 5).await.unwrap()[0].id, "a");
    }

    #[tokio::test]
    async fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let store = LocalVectorStore::open(&root).unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        assert!(matches!(
            store.add(vec![doc("a", "ghost doc")]).await,
            Err(KnowledgeError::Io(..))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.query("ghost doc", 5).await.unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.json"), "{not json").unwrap();

        assert!(matches!(
            LocalVectorStore::open(dir.path()),
            Err(KnowledgeError::Corrupt(..))
        ));
    }

    #[tokio::test]
    async fn dimension_change_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::open_with(dir.path(), HashingEmbedder::new(8)).unwrap();
        store.add(vec![doc("a", "x")]).await.unwrap();

        assert!(matches!(
            LocalVectorStore::open_with(dir.path(), HashingEmbedder::new(16)),
            Err(KnowledgeError::Dimensions { stored: 8, expected: 16 })
        ));
    }
}

// src/ingest.rs

//! Bulk ingestion of a directory into the knowledge store.
//!
//! Every readable UTF-8 file becomes one document:
//! - title: the file name
//! - url: the file path
//!
//! Binary or unreadable files are skipped with a warning. Running the
//! same ingestion twice stores everything twice.

use crate::knowledge::{KnowledgeBase, Metadata};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use walkdir::WalkDir;

pub async fn ingest_dir(kb: &KnowledgeBase, dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    let mut documents = Vec::new();
    let mut metadatas = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        if text.trim().is_empty() {
            continue;
        }

        let mut meta = Metadata::new();
        meta.insert(
            "title".to_string(),
            Value::String(entry.file_name().to_string_lossy().to_string()),
        );
        meta.insert("url".to_string(), Value::String(path.display().to_string()));

        documents.push(text);
        metadatas.push(meta);
    }

    let count = documents.len();
    if count > 0 {
        kb.add_documents(documents, Some(metadatas))
            .await
            .context("Failed to add documents to the knowledge store")?;
    }

    tracing::info!(dir = %dir.display(), documents = count, "ingestion finished");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::LocalVectorStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn text_files_become_titled_documents() {
        let docs = tempfile::tempdir().unwrap();
        std::fs::create_dir(docs.path().join("nested")).unwrap();
        std::fs::write(docs.path().join("pandas.md"), "read_csv loads a CSV file").unwrap();
        std::fs::write(docs.path().join("nested/julia.md"), "broadcast with dot syntax").unwrap();
        std::fs::write(docs.path().join("empty.md"), "   ").unwrap();
        std::fs::write(docs.path().join("blob.bin"), [0xffu8, 0xfe, 0x00]).unwrap();

        let store_dir = tempfile::tempdir().unwrap();
        let kb = KnowledgeBase::new(Arc::new(LocalVectorStore::open(store_dir.path()).unwrap()));

        assert_eq!(ingest_dir(&kb, docs.path()).await.unwrap(), 2);

        let hits = kb.search_kb("read_csv loads a CSV file", 1).await.unwrap();
        assert_eq!(hits[0].title, "pandas.md");
        assert!(hits[0].url.as_deref().unwrap().ends_with("pandas.md"));
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let store_dir = tempfile::tempdir().unwrap();
        let kb = KnowledgeBase::new(Arc::new(LocalVectorStore::open(store_dir.path()).unwrap()));

        assert!(ingest_dir(&kb, &store_dir.path().join("nope")).await.is_err());
    }
}

// src/knowledge/embed.rs

//! Stable feature-hashing text embedder.
//!
//! Tokens are lower-cased words. Each token is hashed with SHA-256; the
//! digest picks a bucket and a sign. Vectors are L2-normalised, so the
//! dot product of two embeddings is their cosine similarity.
//!
//! SHA-256 keeps bucket assignment identical across builds and platforms,
//! which matters because embeddings are persisted.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+").unwrap());

pub const DEFAULT_DIMENSIONS: usize = 384;

#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];

        for token in TOKEN.find_iter(text) {
            let digest = Sha256::digest(token.as_str().to_lowercase().as_bytes());

            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;

            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalise(&mut vector);
        vector
    }
}

fn normalise(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine distance between two normalised vectors.
///
/// Ranges over [0, 2]. A zero vector is at distance 1 from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - dot
}

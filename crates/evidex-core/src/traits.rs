use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, ChunkId, MetaFilter, Metadata, SearchHit};

/// Text to fixed-width vectors.
///
/// Embedding never fails from the caller's point of view: implementations
/// absorb their own errors and degrade to a cheaper representation.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    /// Batch embedding. Order-preserving and equivalent to calling
    /// `embed_one` per item. Empty input yields an empty output.
    fn embed_many(&self, texts: &[String]) -> Vec<Vec<f32>>;

    fn embed_one(&self, text: &str) -> Vec<f32> {
        self.embed_many(&[text.to_string()]).pop().unwrap_or_default()
    }
}

pub trait TextIndexer: Send + Sync {
    /// Replaces all prior state with the given chunks.
    fn index(&mut self, chunks: &[Chunk]) -> Result<()>;
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Similarity-search backend over `(vector, id, metadata)` triples.
///
/// One instance holds vectors of a single width. Inserting a batch of a
/// different width reinitializes the backend empty at the new width.
#[async_trait]
pub trait VectorIndexer: Send + Sync {
    /// Current vector width, `None` before the first insert.
    fn dim(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `vectors`, `ids` and `metadata` must have equal lengths.
    async fn insert(&mut self, vectors: Vec<Vec<f32>>, ids: Vec<ChunkId>, metadata: Vec<Metadata>) -> Result<()>;

    /// Top-`k` by similarity, higher score is better. The filter is applied
    /// to the retrieved candidates before truncation, so fewer than `k`
    /// results may come back.
    async fn search(&self, query: &[f32], k: usize, filter: Option<&MetaFilter>) -> Result<Vec<SearchHit>>;

    /// Backends without native deletion rebuild from the surviving entries,
    /// which costs O(N) in the number of stored vectors.
    async fn delete(&mut self, ids: &[ChunkId]) -> Result<()>;

    async fn clear(&mut self) -> Result<()>;
}

/// Source of truth for chunk records. The engines only read from it.
pub trait ChunkStore: Send + Sync {
    fn list_chunks(&self, owner_id: &str) -> Result<Vec<Chunk>>;
    fn put_chunks(&self, owner_id: &str, chunks: &[Chunk]) -> Result<()>;
    fn clear(&self, owner_id: &str) -> Result<()>;
}

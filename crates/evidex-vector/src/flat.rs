use async_trait::async_trait;
use std::collections::HashSet;

use evidex_core::error::{Error, Result};
use evidex_core::traits::VectorIndexer;
use evidex_core::types::{matches_filter, ChunkId, MetaFilter, Metadata, SearchHit, SourceKind};

#[derive(Debug, Clone)]
struct Entry {
    id: ChunkId,
    vector: Vec<f32>,
    metadata: Metadata,
}

/// Exact nearest-neighbour search over an in-memory list.
///
/// Distance is squared Euclidean, score is `1 / (1 + d)`. Equal distances
/// keep insertion order. Re-inserting an id replaces the earlier entry.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: Option<usize>,
    entries: Vec<Entry>,
    candidate_multiplier: usize,
}

impl Default for FlatIndex {
    fn default() -> Self {
        Self::new(2)
    }
}

impl FlatIndex {
    pub fn new(candidate_multiplier: usize) -> Self {
        Self { dim: None, entries: Vec::new(), candidate_multiplier: candidate_multiplier.max(1) }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }
}

pub(crate) fn check_batch(vectors: &[Vec<f32>], ids: &[ChunkId], metadata: &[Metadata]) -> Result<Option<usize>> {
    if vectors.len() != ids.len() || ids.len() != metadata.len() {
        return Err(Error::Contract(format!(
            "insert needs equal lengths, got {} vectors, {} ids, {} metadata",
            vectors.len(),
            ids.len(),
            metadata.len()
        )));
    }
    let Some(first) = vectors.first() else { return Ok(None) };
    let width = first.len();
    if width == 0 {
        return Err(Error::Contract("vectors must not be empty".into()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != width) {
        return Err(Error::Contract(format!("mixed widths in one batch: {} and {}", width, bad.len())));
    }
    Ok(Some(width))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[async_trait]
impl VectorIndexer for FlatIndex {
    fn dim(&self) -> Option<usize> {
        self.dim
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn insert(&mut self, vectors: Vec<Vec<f32>>, ids: Vec<ChunkId>, metadata: Vec<Metadata>) -> Result<()> {
        let Some(width) = check_batch(&vectors, &ids, &metadata)? else { return Ok(()) };
        if let Some(current) = self.dim.filter(|d| *d != width) {
            tracing::warn!(from = current, to = width, dropped = self.entries.len(), "vector width changed, reinitializing flat index");
            self.entries.clear();
        }
        self.dim = Some(width);

        let incoming: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if self.entries.iter().any(|e| incoming.contains(e.id.as_str())) {
            self.entries.retain(|e| !incoming.contains(e.id.as_str()));
        }
        for ((vector, id), metadata) in vectors.into_iter().zip(ids).zip(metadata) {
            self.entries.push(Entry { id, vector, metadata });
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize, filter: Option<&MetaFilter>) -> Result<Vec<SearchHit>> {
        let Some(dim) = self.dim else { return Ok(Vec::new()) };
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != dim {
            return Err(Error::Dimension { expected: dim, got: query.len() });
        }

        let mut scored: Vec<(usize, f32)> = self.entries.iter().enumerate().map(|(i, e)| (i, squared_l2(query, &e.vector))).collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let pool = if filter.is_some() { k.saturating_mul(self.candidate_multiplier) } else { k };
        Ok(scored
            .into_iter()
            .take(pool)
            .filter(|(i, _)| filter.map_or(true, |f| matches_filter(&self.entries[*i].metadata, f)))
            .take(k)
            .map(|(i, d)| SearchHit::new(self.entries[i].id.clone(), 1.0 / (1.0 + d), SourceKind::Vector))
            .collect())
    }

    /// Rebuilds the entry list from the survivors.
    async fn delete(&mut self, ids: &[ChunkId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.entries.len();
        self.entries = std::mem::take(&mut self.entries).into_iter().filter(|e| !doomed.contains(e.id.as_str())).collect();
        tracing::debug!(removed = before - self.entries.len(), remaining = self.entries.len(), "flat index rebuilt after delete");
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use evidex_core::config::{RetrievalSettings, Settings};
use evidex_core::error::{Error, Result};
use evidex_core::traits::{ChunkStore, Embedder, TextIndexer, VectorIndexer};
use evidex_core::types::{matches_filter, Chunk, ChunkId, Evidence, MetaFilter, MetaValue, Metadata, OwnerId, SearchHit};
use evidex_embed::{hash_embed_many, EmbeddingProvider};
use evidex_text::KeywordIndex;
use evidex_vector::FallbackVectorIndex;

use crate::evidence::materialize;
use crate::fusion::fuse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Empty,
    /// `vector_ready` is false when the last vector step failed and queries
    /// run keyword-only.
    Indexed { vector_ready: bool },
}

/// Metadata stored with each vector and used for filtering.
fn vector_metadata(chunk: &Chunk) -> Metadata {
    let mut meta = chunk.metadata.clone();
    meta.insert("kind".into(), MetaValue::from(chunk.kind.as_str()));
    meta.insert("source".into(), MetaValue::from(chunk.source.as_str()));
    meta.insert("owner_id".into(), MetaValue::from(chunk.owner_id.as_str()));
    meta
}

fn passes(chunk: &Chunk, filter: Option<&MetaFilter>) -> bool {
    filter.map_or(true, |f| matches_filter(&vector_metadata(chunk), f))
}

/// One owner's keyword index, vector index and indexed chunks.
pub struct HybridRetriever<TI = KeywordIndex, VI = FallbackVectorIndex>
where
    TI: TextIndexer,
    VI: VectorIndexer,
{
    owner_id: OwnerId,
    text: TI,
    vector: VI,
    embedder: Arc<dyn Embedder>,
    settings: RetrievalSettings,
    embed_timeout: Duration,
    store: Option<Arc<dyn ChunkStore>>,
    chunks: Vec<Chunk>,
    positions: HashMap<ChunkId, usize>,
    state: IndexState,
    /// The stored vectors came from the hash tier after an embedding timeout;
    /// queries must be hashed too to stay comparable.
    hash_vectors: bool,
}

impl HybridRetriever<KeywordIndex, FallbackVectorIndex> {
    /// Builds a retriever from settings and indexes whatever `store` holds
    /// for the owner.
    pub async fn open(owner_id: impl Into<String>, store: Arc<dyn ChunkStore>, settings: &Settings) -> Result<Self> {
        let embedding = settings.embedding.clone();
        let embedder: Arc<dyn Embedder> = tokio::task::spawn_blocking(move || Arc::new(EmbeddingProvider::new(&embedding)) as Arc<dyn Embedder>)
            .await
            .map_err(|e| Error::Operation(format!("embedding provider init: {e}")))?;
        Self::open_with_embedder(owner_id, store, settings, embedder).await
    }

    pub async fn open_with_embedder(
        owner_id: impl Into<String>,
        store: Arc<dyn ChunkStore>,
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let owner_id = owner_id.into();
        let text = KeywordIndex::with_params(&settings.bm25)?;
        let vector = FallbackVectorIndex::from_settings(&settings.vector, &owner_id).await;
        let mut retriever = Self::new(owner_id.clone(), text, vector, embedder, settings.retrieval.clone())
            .with_embed_timeout(Duration::from_millis(settings.embedding.timeout_ms))
            .with_store(Arc::clone(&store));

        let existing = store.list_chunks(&owner_id)?;
        if !existing.is_empty() {
            retriever.index(&existing).await?;
            tracing::info!(owner = %owner_id, chunks = existing.len(), "loaded existing chunks");
        }
        Ok(retriever)
    }
}

impl<TI, VI> HybridRetriever<TI, VI>
where
    TI: TextIndexer,
    VI: VectorIndexer,
{
    pub fn new(owner_id: impl Into<String>, text: TI, vector: VI, embedder: Arc<dyn Embedder>, settings: RetrievalSettings) -> Self {
        Self {
            owner_id: owner_id.into(),
            text,
            vector,
            embedder,
            settings,
            embed_timeout: Duration::from_secs(30),
            store: None,
            chunks: Vec::new(),
            positions: HashMap::new(),
            state: IndexState::Empty,
            hash_vectors: false,
        }
    }

    /// Chunks in the store that were never indexed are used to pad results.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    /// Indexed chunks in indexing order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn text_index(&self) -> &TI {
        &self.text
    }

    pub fn vector_index(&self) -> &VI {
        &self.vector
    }

    /// Embeds on the blocking pool. A timeout or panic yields hash vectors of
    /// the same width, flagged by the returned bool.
    async fn embed(&self, texts: Vec<String>) -> (Vec<Vec<f32>>, bool) {
        if texts.is_empty() {
            return (Vec::new(), false);
        }
        let embedder = Arc::clone(&self.embedder);
        let dim = embedder.dim();
        let backup = texts.clone();
        let task = tokio::task::spawn_blocking(move || embedder.embed_many(&texts));
        match tokio::time::timeout(self.embed_timeout, task).await {
            Ok(Ok(vectors)) => (vectors, false),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "embedding task failed, using hash embeddings");
                (hash_embed_many(&backup, dim), true)
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.embed_timeout.as_millis() as u64, "embedding timed out, using hash embeddings");
                (hash_embed_many(&backup, dim), true)
            }
        }
    }

    fn set_chunks(&mut self, chunks: Vec<Chunk>) {
        self.positions = chunks.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        self.chunks = chunks;
    }

    async fn rebuild_vectors(&mut self) -> Result<()> {
        let texts: Vec<String> = self.chunks.iter().map(|c| c.text.clone()).collect();
        let (vectors, hashed) = self.embed(texts).await;
        self.hash_vectors = hashed;
        let ids: Vec<ChunkId> = self.chunks.iter().map(|c| c.id.clone()).collect();
        let metadata: Vec<Metadata> = self.chunks.iter().map(vector_metadata).collect();
        self.vector.clear().await?;
        self.vector.insert(vectors, ids, metadata).await
    }

    /// Replaces everything indexed for this owner. Only contract violations
    /// are returned; a failed vector step leaves keyword retrieval working.
    pub async fn index(&mut self, chunks: &[Chunk]) -> Result<()> {
        let started = Instant::now();
        let mut seen = HashSet::new();
        for chunk in chunks {
            chunk.validate()?;
            if !seen.insert(chunk.id.as_str()) {
                return Err(Error::Contract(format!("duplicate chunk id '{}'", chunk.id)));
            }
        }

        self.text.index(chunks)?;
        self.set_chunks(chunks.to_vec());

        let vector_ready = match self.rebuild_vectors().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(owner = %self.owner_id, error = %e, "vector indexing failed, keyword retrieval only");
                false
            }
        };
        self.state = IndexState::Indexed { vector_ready };
        tracing::info!(
            owner = %self.owner_id,
            chunks = chunks.len(),
            vector_ready,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "indexed chunks"
        );
        Ok(())
    }

    /// Drops chunks by id. The flat vector backend rebuilds in O(N); the
    /// keyword index is rebuilt over the survivors.
    pub async fn remove_chunks(&mut self, ids: &[ChunkId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.vector.delete(ids).await {
            tracing::warn!(owner = %self.owner_id, error = %e, "vector delete failed");
        }
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let remaining: Vec<Chunk> = self.chunks.iter().filter(|c| !doomed.contains(c.id.as_str())).cloned().collect();
        self.text.index(&remaining)?;
        tracing::debug!(owner = %self.owner_id, removed = self.chunks.len() - remaining.len(), "removed chunks");
        self.set_chunks(remaining);
        Ok(())
    }

    /// Forgets all indexed state.
    pub async fn clear(&mut self) -> Result<()> {
        self.text.clear();
        self.vector.clear().await?;
        self.set_chunks(Vec::new());
        self.state = IndexState::Empty;
        self.hash_vectors = false;
        Ok(())
    }

    /// Top-`k` evidence for `query`. Never fails: sub-search errors count as
    /// empty and empty rankings degrade to unranked known chunks.
    pub async fn query(&self, query: &str, k: usize, filter: Option<&MetaFilter>) -> Vec<Evidence> {
        if k == 0 {
            return Vec::new();
        }
        let IndexState::Indexed { vector_ready } = self.state else {
            tracing::warn!(owner = %self.owner_id, "owner not indexed, returning unranked chunks");
            return self.pad(Vec::new(), k, filter);
        };

        let vector_hits = async {
            if !vector_ready {
                return Vec::new();
            }
            let q = if self.hash_vectors {
                hash_embed_many(&[query.to_string()], self.embedder.dim()).pop().unwrap_or_default()
            } else {
                let (mut q, hashed) = self.embed(vec![query.to_string()]).await;
                if hashed {
                    tracing::warn!(owner = %self.owner_id, "query embedding fell back to hash, skipping vector search");
                    return Vec::new();
                }
                q.pop().unwrap_or_default()
            };
            match self.vector.search(&q, self.settings.k_vector, filter).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(owner = %self.owner_id, error = %e, "vector search failed");
                    Vec::new()
                }
            }
        };
        let keyword_hits = async {
            match self.text.search(query, self.settings.k_bm25) {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(owner = %self.owner_id, error = %e, "keyword search failed");
                    Vec::new()
                }
            }
        };
        let (vector_hits, keyword_hits) = futures::join!(vector_hits, keyword_hits);
        let keyword_hits: Vec<SearchHit> = keyword_hits
            .into_iter()
            .filter(|h| self.positions.get(&h.id).is_some_and(|&i| passes(&self.chunks[i], filter)))
            .collect();
        tracing::debug!(owner = %self.owner_id, vector = vector_hits.len(), keyword = keyword_hits.len(), "sub-search results");

        if vector_hits.is_empty() && keyword_hits.is_empty() {
            tracing::warn!(owner = %self.owner_id, "both searches empty, returning unranked chunks");
            return self.pad(Vec::new(), k, filter);
        }

        let ranked: Vec<Evidence> = fuse(&vector_hits, &keyword_hits, self.settings.w_vector, self.settings.w_bm25)
            .into_iter()
            .filter_map(|(id, score)| self.positions.get(&id).map(|&i| materialize(&self.chunks[i], score, self.settings.snippet_chars)))
            .take(k)
            .collect();

        if self.settings.pad_results || ranked.is_empty() {
            self.pad(ranked, k, filter)
        } else {
            ranked
        }
    }

    /// Fills up to `k` with indexed chunks in order, then with unindexed
    /// store chunks in id order, all at the fallback confidence.
    fn pad(&self, mut out: Vec<Evidence>, k: usize, filter: Option<&MetaFilter>) -> Vec<Evidence> {
        if out.len() >= k {
            return out;
        }
        let conf = self.settings.fallback_confidence;
        let max_chars = self.settings.snippet_chars;
        let mut used: HashSet<ChunkId> = out.iter().map(|e| e.id.clone()).collect();
        for chunk in &self.chunks {
            if out.len() >= k {
                return out;
            }
            if passes(chunk, filter) && used.insert(chunk.id.clone()) {
                out.push(materialize(chunk, conf, max_chars));
            }
        }

        let Some(store) = self.store.as_ref() else { return out };
        let mut extra = match store.list_chunks(&self.owner_id) {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(owner = %self.owner_id, error = %e, "chunk store unavailable for padding");
                return out;
            }
        };
        extra.sort_by(|a, b| a.id.cmp(&b.id));
        for chunk in &extra {
            if out.len() >= k {
                break;
            }
            if !self.positions.contains_key(&chunk.id) && passes(chunk, filter) && used.insert(chunk.id.clone()) {
                out.push(materialize(chunk, conf, max_chars));
            }
        }
        out
    }
}

use async_trait::async_trait;
use std::time::Duration;

use evidex_core::config::VectorSettings;
use evidex_core::error::Result;
use evidex_core::traits::VectorIndexer;
use evidex_core::types::{ChunkId, MetaFilter, Metadata, SearchHit};

use crate::flat::{check_batch, FlatIndex};
use crate::lance::LanceBackend;

/// Local flat index mirrored to an optional external backend.
///
/// Writes go to both; external failures and timeouts are logged and
/// swallowed. Searches ask the external backend first and answer from the
/// flat index when it errors, times out or comes back empty.
pub struct FallbackVectorIndex {
    local: FlatIndex,
    remote: Option<Box<dyn VectorIndexer>>,
    timeout: Duration,
}

impl FallbackVectorIndex {
    pub fn local_only(candidate_multiplier: usize) -> Self {
        Self { local: FlatIndex::new(candidate_multiplier), remote: None, timeout: Duration::from_secs(2) }
    }

    pub fn with_remote(local: FlatIndex, remote: Box<dyn VectorIndexer>, timeout: Duration) -> Self {
        Self { local, remote: Some(remote), timeout }
    }

    /// Connects the owner's LanceDB tables when enabled. A failed connection
    /// leaves the index local-only.
    pub async fn from_settings(settings: &VectorSettings, owner_id: &str) -> Self {
        let local = FlatIndex::new(settings.candidate_multiplier);
        let remote = &settings.remote;
        if !remote.enabled {
            return Self { local, remote: None, timeout: Duration::from_millis(remote.timeout_ms) };
        }
        match LanceBackend::connect(remote, owner_id, settings.candidate_multiplier).await {
            Ok(backend) => Self::with_remote(local, Box::new(backend), Duration::from_millis(remote.timeout_ms)),
            Err(e) => {
                tracing::warn!(error = %e, uri = %remote.uri, "remote vector backend unavailable, using local index only");
                Self { local, remote: None, timeout: Duration::from_millis(remote.timeout_ms) }
            }
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn local(&self) -> &FlatIndex {
        &self.local
    }
}

/// Runs a remote write under the timeout. Failures and timeouts are logged;
/// the local index stays authoritative.
async fn mirror<F>(op: &'static str, timeout: Duration, write: F)
where
    F: std::future::Future<Output = Result<()>>,
{
    match tokio::time::timeout(timeout, write).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(op, error = %e, "remote vector write failed"),
        Err(_) => tracing::warn!(op, timeout_ms = timeout.as_millis() as u64, "remote vector write timed out"),
    }
}

#[async_trait]
impl VectorIndexer for FallbackVectorIndex {
    fn dim(&self) -> Option<usize> {
        self.local.dim()
    }

    fn len(&self) -> usize {
        self.local.len()
    }

    async fn insert(&mut self, vectors: Vec<Vec<f32>>, ids: Vec<ChunkId>, metadata: Vec<Metadata>) -> Result<()> {
        check_batch(&vectors, &ids, &metadata)?;
        let timeout = self.timeout;
        if let Some(remote) = self.remote.as_mut() {
            mirror("insert", timeout, remote.insert(vectors.clone(), ids.clone(), metadata.clone())).await;
        }
        self.local.insert(vectors, ids, metadata).await
    }

    async fn search(&self, query: &[f32], k: usize, filter: Option<&MetaFilter>) -> Result<Vec<SearchHit>> {
        if let Some(remote) = self.remote.as_ref() {
            match tokio::time::timeout(self.timeout, remote.search(query, k, filter)).await {
                Ok(Ok(hits)) if !hits.is_empty() => return Ok(hits),
                Ok(Ok(_)) => tracing::warn!("remote vector search returned nothing, using local index"),
                Ok(Err(e)) => tracing::warn!(error = %e, "remote vector search failed, using local index"),
                Err(_) => tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "remote vector search timed out, using local index"),
            }
        }
        self.local.search(query, k, filter).await
    }

    async fn delete(&mut self, ids: &[ChunkId]) -> Result<()> {
        let timeout = self.timeout;
        if let Some(remote) = self.remote.as_mut() {
            mirror("delete", timeout, remote.delete(ids)).await;
        }
        self.local.delete(ids).await
    }

    async fn clear(&mut self) -> Result<()> {
        let timeout = self.timeout;
        if let Some(remote) = self.remote.as_mut() {
            mirror("clear", timeout, remote.clear()).await;
        }
        self.local.clear().await
    }
}

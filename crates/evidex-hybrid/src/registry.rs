use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use evidex_core::config::Settings;
use evidex_core::error::Result;
use evidex_core::traits::ChunkStore;
use evidex_core::types::OwnerId;

use crate::retriever::HybridRetriever;

/// A retriever behind its own lock: one writer per owner.
pub type SharedRetriever = Arc<RwLock<HybridRetriever>>;

/// Process-wide owner id → retriever map. Owners never share a lock or an
/// embedding provider; only the sentence model singleton is shared.
pub struct RetrieverRegistry {
    settings: Settings,
    store: Arc<dyn ChunkStore>,
    retrievers: RwLock<HashMap<OwnerId, SharedRetriever>>,
}

impl RetrieverRegistry {
    pub fn new(settings: Settings, store: Arc<dyn ChunkStore>) -> Self {
        Self { settings, store, retrievers: RwLock::new(HashMap::new()) }
    }

    pub fn store(&self) -> Arc<dyn ChunkStore> {
        Arc::clone(&self.store)
    }

    pub async fn get(&self, owner_id: &str) -> Option<SharedRetriever> {
        self.retrievers.read().await.get(owner_id).cloned()
    }

    /// Returns the owner's retriever, opening it from the chunk store on
    /// first use with its own embedding provider, so corpus-fitted tiers
    /// (TF-IDF) never leak across owners. Opening happens outside the map
    /// lock; if two callers race, the first one registered wins.
    pub async fn get_or_open(&self, owner_id: &str) -> Result<SharedRetriever> {
        if let Some(existing) = self.get(owner_id).await {
            return Ok(existing);
        }
        let opened = HybridRetriever::open(owner_id, self.store(), &self.settings).await?;
        let mut map = self.retrievers.write().await;
        Ok(Arc::clone(map.entry(owner_id.to_string()).or_insert_with(|| Arc::new(RwLock::new(opened)))))
    }

    /// Registers a retriever, replacing any previous one for the owner.
    pub async fn insert(&self, retriever: HybridRetriever) -> SharedRetriever {
        let owner = retriever.owner_id().to_string();
        let shared = Arc::new(RwLock::new(retriever));
        self.retrievers.write().await.insert(owner, Arc::clone(&shared));
        shared
    }

    /// Drops the owner's retriever and clears its indexes and stored chunks.
    pub async fn remove(&self, owner_id: &str) -> Result<bool> {
        let removed = self.retrievers.write().await.remove(owner_id);
        if let Some(retriever) = &removed {
            retriever.write().await.clear().await?;
        }
        self.store.clear(owner_id)?;
        tracing::info!(owner = owner_id, existed = removed.is_some(), "owner removed");
        Ok(removed.is_some())
    }

    pub async fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = self.retrievers.read().await.keys().cloned().collect();
        owners.sort();
        owners
    }
}

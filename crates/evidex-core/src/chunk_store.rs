//! Chunk stores: the read side the retrievers rebuild from.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::traits::ChunkStore;
use crate::types::Chunk;

fn poisoned() -> Error {
    Error::Operation("chunk store lock poisoned".into())
}

/// Process-local store, mostly for tests and single-shot runs.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn list_chunks(&self, owner_id: &str) -> Result<Vec<Chunk>> {
        let guard = self.chunks.read().map_err(|_| poisoned())?;
        Ok(guard.get(owner_id).cloned().unwrap_or_default())
    }

    fn put_chunks(&self, owner_id: &str, chunks: &[Chunk]) -> Result<()> {
        let mut guard = self.chunks.write().map_err(|_| poisoned())?;
        guard.insert(owner_id.to_string(), chunks.to_vec());
        Ok(())
    }

    fn clear(&self, owner_id: &str) -> Result<()> {
        let mut guard = self.chunks.write().map_err(|_| poisoned())?;
        guard.remove(owner_id);
        Ok(())
    }
}

/// One `{owner}.json` file per owner under `dir`, fronted by an in-memory
/// cache. Reads hit the cache first and fall back to disk.
#[derive(Debug)]
pub struct JsonChunkStore {
    dir: PathBuf,
    cache: MemoryChunkStore,
}

impl JsonChunkStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, cache: MemoryChunkStore::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn owner_file(&self, owner_id: &str) -> Result<PathBuf> {
        if owner_id.is_empty() || owner_id.contains(['/', '\\']) || owner_id.starts_with('.') {
            return Err(Error::Contract(format!("owner id '{owner_id}' is not usable as a file name")));
        }
        Ok(self.dir.join(format!("{owner_id}.json")))
    }
}

impl ChunkStore for JsonChunkStore {
    fn list_chunks(&self, owner_id: &str) -> Result<Vec<Chunk>> {
        let cached = self.cache.list_chunks(owner_id)?;
        if !cached.is_empty() {
            return Ok(cached);
        }
        let path = self.owner_file(owner_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        let chunks: Vec<Chunk> = serde_json::from_str(&raw)?;
        tracing::debug!(owner = owner_id, count = chunks.len(), path = %path.display(), "loaded chunks from disk");
        self.cache.put_chunks(owner_id, &chunks)?;
        Ok(chunks)
    }

    fn put_chunks(&self, owner_id: &str, chunks: &[Chunk]) -> Result<()> {
        let path = self.owner_file(owner_id)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(chunks)?)?;
        fs::rename(&tmp, &path)?;
        self.cache.put_chunks(owner_id, chunks)?;
        tracing::debug!(owner = owner_id, count = chunks.len(), "stored chunks");
        Ok(())
    }

    fn clear(&self, owner_id: &str) -> Result<()> {
        let path = self.owner_file(owner_id)?;
        self.cache.clear(owner_id)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

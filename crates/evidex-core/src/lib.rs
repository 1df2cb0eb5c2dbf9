//! evidex-core
//!
//! Shared data model, engine traits, error type and configuration for the
//! evidex retrieval workspace.

pub mod chunk_store;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{Chunk, ChunkId, ChunkKind, Evidence, MetaFilter, MetaValue, Metadata, SearchHit, SourceKind};

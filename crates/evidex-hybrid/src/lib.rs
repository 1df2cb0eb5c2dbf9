//! evidex-hybrid
//!
//! Per-owner hybrid retrieval: BM25 and vector search fused into ranked,
//! citable evidence.
pub mod evidence;
pub mod fusion;
pub mod registry;
pub mod retriever;

pub use registry::{RetrieverRegistry, SharedRetriever};
pub use retriever::{HybridRetriever, IndexState};

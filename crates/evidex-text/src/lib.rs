//! evidex-text
//!
//! Tantivy analyzers and an exact in-memory BM25 keyword index.
pub mod analyzer;
pub mod index;

pub use analyzer::Analyzer;
pub use index::KeywordIndex;

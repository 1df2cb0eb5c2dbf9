//! evidex-embed
//!
//! Text embeddings with a model → TF-IDF → hash fallback chain.
pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod provider;
pub mod tfidf;
pub mod tokenize;

pub use hash::{hash_embed_many, hash_embedding};
pub use pool::masked_mean_l2;
pub use provider::EmbeddingProvider;
pub use tfidf::TfidfVectorizer;

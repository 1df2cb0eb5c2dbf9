//! evidex-vector
//!
//! Vector similarity backends: an exact in-memory flat index, a LanceDB
//! backend, and a wrapper that falls back from the latter to the former.
pub mod fallback;
pub mod flat;
pub mod lance;
pub mod schema;

pub use fallback::FallbackVectorIndex;
pub use flat::FlatIndex;
pub use lance::LanceBackend;

use sha2::{Digest, Sha256};

/// Deterministic pseudo-embedding. Component `i` is derived from
/// SHA-256(`"{text}_{i}"`): the first four digest bytes as a big-endian `u32`
/// mapped onto `[-1, 1)`. Carries no semantic signal.
pub fn hash_embedding(text: &str, dim: usize) -> Vec<f32> {
    (0..dim)
        .map(|i| {
            let digest = Sha256::digest(format!("{text}_{i}").as_bytes());
            let u = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
            ((f64::from(u) / 4_294_967_296.0 - 0.5) * 2.0) as f32
        })
        .collect()
}

pub fn hash_embed_many(texts: &[String], dim: usize) -> Vec<Vec<f32>> {
    texts.iter().map(|t| hash_embedding(t, dim)).collect()
}

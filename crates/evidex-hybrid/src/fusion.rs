//! Score normalization and weighted fusion of the two ranked lists.

use std::collections::HashMap;

use evidex_core::types::{ChunkId, SearchHit};

/// Divides each score by the list maximum and clamps into `[0, 1]`. A
/// non-positive maximum maps every entry to 0.5. Repeated ids keep their
/// first score.
pub fn normalize(hits: &[SearchHit]) -> Vec<(ChunkId, f32)> {
    let max = hits.iter().map(|h| h.score).fold(f32::NEG_INFINITY, f32::max);
    let mut seen = std::collections::HashSet::new();
    hits.iter()
        .filter(|h| seen.insert(h.id.as_str()))
        .map(|h| {
            let s = if max > 0.0 && max.is_finite() { (h.score / max).clamp(0.0, 1.0) } else { 0.5 };
            // NaN scores contribute nothing
            (h.id.clone(), if s.is_nan() { 0.0 } else { s })
        })
        .collect()
}

/// `w_vector * v + w_bm25 * b` per id, highest first. Equal scores keep
/// first-encountered order, vector list before keyword list.
pub fn fuse(vector: &[SearchHit], keyword: &[SearchHit], w_vector: f32, w_bm25: f32) -> Vec<(ChunkId, f32)> {
    let mut order: Vec<ChunkId> = Vec::new();
    let mut combined: HashMap<ChunkId, f32> = HashMap::new();
    for (list, weight) in [(normalize(vector), w_vector), (normalize(keyword), w_bm25)] {
        for (id, s) in list {
            match combined.get_mut(&id) {
                Some(total) => *total += weight * s,
                None => {
                    combined.insert(id.clone(), weight * s);
                    order.push(id);
                }
            }
        }
    }
    let mut fused: Vec<(ChunkId, f32)> = order
        .into_iter()
        .map(|id| {
            let s = combined.get(&id).copied().unwrap_or(0.0);
            (id, s)
        })
        .collect();
    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused
}

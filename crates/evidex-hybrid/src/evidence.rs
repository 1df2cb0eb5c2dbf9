use evidex_core::types::{Chunk, ChunkKind, Evidence};

/// Citation string: `p{page}` for slides, `t={timestamp}` for transcripts,
/// otherwise the chunk source. The explicit hint wins over metadata.
pub fn location(chunk: &Chunk) -> String {
    match chunk.kind {
        ChunkKind::Slide => {
            let page = chunk.location_hint.clone().or_else(|| chunk.metadata.get("page").map(ToString::to_string));
            format!("p{}", page.unwrap_or_else(|| "1".to_string()))
        }
        ChunkKind::Transcript => {
            let ts = chunk.location_hint.clone().or_else(|| chunk.metadata.get("timestamp").map(ToString::to_string));
            format!("t={}", ts.unwrap_or_else(|| "00:00".to_string()))
        }
        ChunkKind::Url | ChunkKind::Text => chunk.source.clone(),
    }
}

/// First `max_chars` characters, with `...` appended when cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn materialize(chunk: &Chunk, score: f32, max_chars: usize) -> Evidence {
    Evidence {
        id: chunk.id.clone(),
        kind: chunk.kind,
        location: location(chunk),
        snippet: snippet(&chunk.text, max_chars),
        confidence: score.clamp(0.0, 1.0),
    }
}

//! Directory ingestion: `.txt` files into word-window chunks.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{Chunk, ChunkKind};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub words_per_chunk: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { words_per_chunk: 300, overlap_percent: 0.2 }
    }
}

#[derive(Debug, Default)]
pub struct Ingestor {
    chunking: ChunkingConfig,
}

impl Ingestor {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    /// Sorted list of `.txt` files below `root`.
    pub fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
            .collect();
        files.sort();
        files
    }

    pub fn process_directory(&self, data_dir: &Path, owner_id: &str) -> Result<Vec<Chunk>> {
        let files = self.list_txt_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut all = Vec::new();
        for path in &files {
            all.extend(self.process_file(path, owner_id)?);
        }
        tracing::info!(files = files.len(), chunks = all.len(), "processed directory");
        Ok(all)
    }

    /// Chunks one file. Ids are `{stem}:{i}`; `source` is the file name.
    pub fn process_file(&self, path: &Path, owner_id: &str) -> Result<Vec<Chunk>> {
        let content = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => String::from_utf8_lossy(&fs::read(path)?).into_owned(),
        };
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let source = path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

        let windows = self.split_words(&content);
        let total = windows.len();
        let chunks = windows
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                Chunk::new(format!("{stem}:{i}"), owner_id, text)
                    .with_kind(ChunkKind::Text)
                    .with_source(source.clone())
                    .with_meta("chunk_index", i as i64)
                    .with_meta("total_chunks", total as i64)
            })
            .collect();
        tracing::debug!(file = %path.display(), chunks = total, "chunked file");
        Ok(chunks)
    }

    /// Fixed word windows with overlap. Empty or whitespace-only text yields
    /// no windows.
    pub fn split_words(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let size = self.chunking.words_per_chunk.max(1);
        let overlap = ((size as f32 * self.chunking.overlap_percent) as usize).min(size - 1);
        let mut out = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + size).min(words.len());
            out.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap;
        }
        out
    }
}

use std::collections::HashMap;

use evidex_core::config::Bm25Settings;
use evidex_core::error::Result;
use evidex_core::traits::TextIndexer;
use evidex_core::types::{Chunk, ChunkId, SearchHit, SourceKind};

use crate::analyzer::Analyzer;

/// In-memory Okapi BM25 over analyzed chunk text.
///
/// idf is `ln((N - df + 0.5) / (df + 0.5))` and may be zero or negative for
/// terms present in half the corpus or more. Every chunk sharing at least one
/// query term is a candidate whatever its score.
#[derive(Debug)]
pub struct KeywordIndex {
	analyzer: Analyzer,
	k1: f64,
	b: f64,
	ids: Vec<ChunkId>,
	doc_lens: Vec<usize>,
	// term -> (doc position, term frequency), doc positions ascending
	postings: HashMap<String, Vec<(usize, u32)>>,
	avg_len: f64,
}

impl KeywordIndex {
	pub fn new() -> Result<Self> {
		Self::with_params(&Bm25Settings::default())
	}

	pub fn with_params(params: &Bm25Settings) -> Result<Self> {
		Ok(Self {
			analyzer: Analyzer::keyword()?,
			k1: f64::from(params.k1),
			b: f64::from(params.b),
			ids: Vec::new(),
			doc_lens: Vec::new(),
			postings: HashMap::new(),
			avg_len: 0.0,
		})
	}

	pub fn analyzer(&self) -> &Analyzer {
		&self.analyzer
	}

	pub fn doc_frequency(&self, term: &str) -> usize {
		self.postings.get(term).map_or(0, Vec::len)
	}

	pub fn average_length(&self) -> f64 {
		self.avg_len
	}

	fn idf(&self, df: usize) -> f64 {
		let n = self.ids.len() as f64;
		let df = df as f64;
		((n - df + 0.5) / (df + 0.5)).ln()
	}
}

impl TextIndexer for KeywordIndex {
	fn index(&mut self, chunks: &[Chunk]) -> Result<()> {
		self.clear();
		let mut total = 0usize;
		for (pos, chunk) in chunks.iter().enumerate() {
			let tokens = self.analyzer.tokenize(&chunk.text);
			total += tokens.len();
			self.doc_lens.push(tokens.len());
			self.ids.push(chunk.id.clone());

			let mut tf: HashMap<String, u32> = HashMap::new();
			for t in tokens {
				*tf.entry(t).or_insert(0) += 1;
			}
			for (term, count) in tf {
				self.postings.entry(term).or_default().push((pos, count));
			}
		}
		self.avg_len = if self.ids.is_empty() { 0.0 } else { total as f64 / self.ids.len() as f64 };
		tracing::debug!(docs = self.ids.len(), terms = self.postings.len(), avg_len = self.avg_len, "bm25 index built");
		Ok(())
	}

	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		if self.ids.is_empty() || k == 0 {
			return Ok(Vec::new());
		}
		let mut scores: Vec<Option<f64>> = vec![None; self.ids.len()];
		// repeated query terms contribute once per occurrence
		for token in self.analyzer.tokenize(query) {
			let Some(posting) = self.postings.get(&token) else { continue };
			let idf = self.idf(posting.len());
			for &(pos, tf) in posting {
				let tf = f64::from(tf);
				let norm = 1.0 - self.b + self.b * (self.doc_lens[pos] as f64 / self.avg_len);
				let s = idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm);
				*scores[pos].get_or_insert(0.0) += s;
			}
		}

		let mut ranked: Vec<(usize, f64)> = scores.into_iter().enumerate().filter_map(|(pos, s)| s.map(|s| (pos, s))).collect();
		// stable: equal scores keep insertion order
		ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
		ranked.truncate(k);
		Ok(ranked
			.into_iter()
			.map(|(pos, s)| SearchHit::new(self.ids[pos].clone(), s as f32, SourceKind::Text))
			.collect())
	}

	fn clear(&mut self) {
		self.ids.clear();
		self.doc_lens.clear();
		self.postings.clear();
		self.avg_len = 0.0;
	}

	fn len(&self) -> usize {
		self.ids.len()
	}
}

//! TF-IDF features over unigrams and bigrams.
//!
//! Vocabulary is the `dim` most frequent terms of the fitting corpus (ties
//! alphabetical), indexed alphabetically. Weights are raw counts times the
//! smoothed idf `ln((1 + n) / (1 + df)) + 1`; rows are L2 normalized and
//! zero-padded to `dim`.

use anyhow::{bail, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

use evidex_text::Analyzer;

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    analyzer: Analyzer,
    dim: usize,
    vocab: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    pub fn fit(texts: &[String], dim: usize) -> Result<Self> {
        let analyzer = Analyzer::tfidf()?;
        let n = texts.len();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut dfs: HashMap<String, usize> = HashMap::new();
        for text in texts {
            let terms = ngrams(&analyzer, text);
            let mut seen = HashSet::new();
            for term in terms {
                if seen.insert(term.clone()) {
                    *dfs.entry(term.clone()).or_insert(0) += 1;
                }
                *counts.entry(term).or_insert(0) += 1;
            }
        }
        if counts.is_empty() {
            bail!("empty vocabulary; documents contain only stop words");
        }

        // BTreeMap iteration is alphabetical, so the stable sort breaks ties alphabetically
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(dim);
        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let idf = terms
            .iter()
            .map(|t| {
                let df = dfs.get(t).copied().unwrap_or(0);
                (((1 + n) as f64 / (1 + df) as f64).ln() + 1.0) as f32
            })
            .collect();
        let vocab = terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();
        Ok(Self { analyzer, dim, vocab, idf })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocab.len()
    }

    pub fn transform(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.transform_one(t)).collect()
    }

    fn transform_one(&self, text: &str) -> Vec<f32> {
        let mut row = vec![0f32; self.dim];
        for term in ngrams(&self.analyzer, text) {
            if let Some(&i) = self.vocab.get(&term) {
                row[i] += 1.0;
            }
        }
        for (w, idf) in row.iter_mut().zip(&self.idf) {
            *w *= idf;
        }
        let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for w in &mut row {
                *w /= norm;
            }
        }
        row
    }
}

/// Unigrams plus space-joined bigrams of adjacent kept tokens.
fn ngrams(analyzer: &Analyzer, text: &str) -> Vec<String> {
    let tokens = analyzer.tokenize(text);
    let mut out = Vec::with_capacity(tokens.len() * 2);
    for pair in tokens.windows(2) {
        out.push(format!("{} {}", pair[0], pair[1]));
    }
    out.extend(tokens);
    out
}

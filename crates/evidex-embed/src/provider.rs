use std::sync::{Arc, Mutex};

use evidex_core::config::{EmbeddingSettings, EmbeddingTier};
use evidex_core::traits::Embedder;

use crate::hash::hash_embed_many;
use crate::model::{shared_model, SentenceModel};
use crate::tfidf::TfidfVectorizer;

fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Embedding provider with a fixed fallback chain: model, TF-IDF, hash.
///
/// The chain is settled at construction. The hash tier always terminates it,
/// listed or not, so `embed_many` cannot fail.
pub struct EmbeddingProvider {
    dim: usize,
    tiers: Vec<EmbeddingTier>,
    model: Option<Arc<SentenceModel>>,
    tfidf: Mutex<Option<TfidfVectorizer>>,
}

impl EmbeddingProvider {
    pub fn new(settings: &EmbeddingSettings) -> Self {
        let mut requested = settings.tiers.clone();
        if fake_embeddings_forced() {
            tracing::info!("APP_USE_FAKE_EMBEDDINGS set, using hash embeddings only");
            requested = vec![EmbeddingTier::Hash];
        }

        let mut model = None;
        if requested.contains(&EmbeddingTier::Model) {
            model = shared_model(settings.model_path(), settings.max_len).filter(|m| {
                let fits = m.hidden_size() == settings.dim;
                if !fits {
                    tracing::warn!(model_dim = m.hidden_size(), dim = settings.dim, "model width differs from embedding.dim, skipping model tier");
                }
                fits
            });
        }

        let mut tiers = Vec::new();
        for tier in [EmbeddingTier::Model, EmbeddingTier::Tfidf, EmbeddingTier::Hash] {
            let usable = match tier {
                EmbeddingTier::Model => model.is_some(),
                EmbeddingTier::Tfidf => requested.contains(&tier),
                EmbeddingTier::Hash => true,
            };
            if usable {
                tiers.push(tier);
            }
        }
        tracing::info!(dim = settings.dim, ?tiers, "embedding provider ready");
        Self { dim: settings.dim, tiers, model, tfidf: Mutex::new(None) }
    }

    /// Hash tier only. Deterministic and offline.
    pub fn hash_only(dim: usize) -> Self {
        Self::new(&EmbeddingSettings::hash_only(dim))
    }

    /// Tiers in the order they will be tried.
    pub fn tiers(&self) -> &[EmbeddingTier] {
        &self.tiers
    }

    pub fn tfidf_fitted(&self) -> bool {
        self.tfidf.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    fn embed_tfidf(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut guard = self.tfidf.lock().map_err(|_| anyhow::anyhow!("tfidf lock poisoned"))?;
        if guard.is_none() {
            let fitted = TfidfVectorizer::fit(texts, self.dim)?;
            tracing::debug!(vocabulary = fitted.vocabulary_len(), docs = texts.len(), "tfidf vectorizer fitted");
            *guard = Some(fitted);
        }
        match guard.as_ref() {
            Some(v) => Ok(v.transform(texts)),
            None => Err(anyhow::anyhow!("tfidf vectorizer not fitted")),
        }
    }
}

impl Embedder for EmbeddingProvider {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_many(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if texts.is_empty() {
            return Vec::new();
        }
        for tier in &self.tiers {
            match tier {
                EmbeddingTier::Model => {
                    let Some(model) = &self.model else { continue };
                    match model.embed(texts) {
                        Ok(v) => return v,
                        Err(e) => tracing::warn!(error = %e, "model embedding failed, trying next tier"),
                    }
                }
                EmbeddingTier::Tfidf => match self.embed_tfidf(texts) {
                    Ok(v) => return v,
                    Err(e) => tracing::warn!(error = %e, "tfidf embedding failed, trying next tier"),
                },
                EmbeddingTier::Hash => break,
            }
        }
        hash_embed_many(texts, self.dim)
    }
}

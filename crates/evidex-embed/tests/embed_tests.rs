use evidex_core::config::{EmbeddingSettings, EmbeddingTier};
use evidex_core::traits::Embedder;
use evidex_embed::{hash_embedding, model, EmbeddingProvider, TfidfVectorizer};

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedding_is_idempotent_and_bounded() {
    let a = hash_embedding("revenue growth", 384);
    let b = hash_embedding("revenue growth", 384);
    assert_eq!(a, b);
    assert_eq!(a.len(), 384);
    assert!(a.iter().all(|x| (-1.0..1.0).contains(x)));
    assert_ne!(a, hash_embedding("revenue growth.", 384));
}

#[test]
fn hash_only_provider_matches_direct_hash() {
    let p = EmbeddingProvider::hash_only(64);
    assert_eq!(p.tiers(), &[EmbeddingTier::Hash]);
    assert_eq!(p.dim(), 64);
    let out = p.embed_many(&texts(&["a", "b"]));
    assert_eq!(out[0], hash_embedding("a", 64));
    assert_eq!(out[1], hash_embedding("b", 64));
    assert_eq!(p.embed_one("a"), out[0]);
    assert!(p.embed_many(&[]).is_empty());
}

#[test]
fn tfidf_rows_are_unit_length_and_padded() {
    let corpus = texts(&["Revenue grew 40% year over year", "The team has 5 engineers"]);
    let v = TfidfVectorizer::fit(&corpus, 384).unwrap();
    let rows = v.transform(&corpus);
    assert_eq!(rows[0].len(), 384);
    for row in &rows {
        let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
    // no shared terms
    assert!(cosine(&rows[0], &rows[1]).abs() < 1e-6);
}

#[test]
fn tfidf_caps_vocabulary_at_dim() {
    let corpus = texts(&["alpha beta gamma delta epsilon", "alpha beta"]);
    let v = TfidfVectorizer::fit(&corpus, 3).unwrap();
    assert_eq!(v.vocabulary_len(), 3);
    assert_eq!(v.transform(&corpus)[0].len(), 3);
}

#[test]
fn tfidf_rejects_stop_word_only_corpus() {
    assert!(TfidfVectorizer::fit(&texts(&["the and of", "a"]), 16).is_err());
}

#[test]
fn tfidf_tier_fits_once_and_reuses_vocabulary() {
    let settings = EmbeddingSettings { dim: 32, tiers: vec![EmbeddingTier::Tfidf, EmbeddingTier::Hash], ..EmbeddingSettings::default() };
    let p = EmbeddingProvider::new(&settings);
    assert!(!p.tfidf_fitted());

    let corpus = texts(&["revenue grew strongly", "engineers joined the team"]);
    let first = p.embed_many(&corpus);
    assert!(p.tfidf_fitted());

    // a query with only unseen words maps to the zero vector of the fitted vocabulary
    let q = p.embed_one("unseen vocabulary words");
    assert_eq!(q.len(), 32);
    assert!(q.iter().all(|x| *x == 0.0));

    let again = p.embed_many(&corpus);
    assert_eq!(first, again);
    let q = p.embed_one("revenue growth");
    assert!(cosine(&q, &first[0]) > cosine(&q, &first[1]));
}

#[test]
fn tfidf_failure_falls_through_to_hash_and_retries_later() {
    let settings = EmbeddingSettings { dim: 16, tiers: vec![EmbeddingTier::Tfidf], ..EmbeddingSettings::default() };
    let p = EmbeddingProvider::new(&settings);
    let out = p.embed_many(&texts(&["the and of"]));
    assert_eq!(out[0], hash_embedding("the and of", 16));
    assert!(!p.tfidf_fitted());

    p.embed_many(&texts(&["pricing strategy"]));
    assert!(p.tfidf_fitted());
}

#[test]
fn missing_model_degrades_and_loads_once() {
    let settings = EmbeddingSettings {
        dim: 24,
        model_dir: Some("/nonexistent/evidex-model".into()),
        ..EmbeddingSettings::default()
    };
    let a = EmbeddingProvider::new(&settings);
    let b = EmbeddingProvider::new(&settings);
    assert_eq!(model::load_attempts(), 1);
    assert_eq!(a.tiers(), &[EmbeddingTier::Tfidf, EmbeddingTier::Hash]);
    let out = b.embed_many(&texts(&["board meeting notes"]));
    assert_eq!(out[0].len(), 24);
}

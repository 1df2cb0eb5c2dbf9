use std::fs;

use tempfile::TempDir;

use evidex_core::chunk_store::{JsonChunkStore, MemoryChunkStore};
use evidex_core::config::{Config, EmbeddingTier, Settings};
use evidex_core::ingest::{ChunkingConfig, Ingestor};
use evidex_core::traits::ChunkStore;
use evidex_core::types::{matches_filter, Chunk, ChunkKind, MetaFilter, MetaValue};

#[test]
fn default_settings_are_valid() {
    let s = Settings::default();
    s.validate().expect("defaults validate");
    assert_eq!(s.retrieval.k_vector, 8);
    assert!((s.retrieval.w_vector - 0.7).abs() < 1e-6);
    assert!((s.retrieval.w_bm25 - 0.3).abs() < 1e-6);
    assert_eq!(s.embedding.dim, 384);
    assert_eq!(
        s.embedding.tiers,
        vec![EmbeddingTier::Model, EmbeddingTier::Tfidf, EmbeddingTier::Hash]
    );
}

#[test]
fn config_merges_toml_and_env() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [retrieval]
            w_vector = 0.5
            w_bm25 = 0.5

            [embedding]
            tiers = ["hash"]
            dim = 64
            "#,
        )?;
        jail.set_env("APP_RETRIEVAL__K_BM25", "4");

        let cfg = Config::load().map_err(|e| e.to_string())?;
        let s = cfg.settings().map_err(|e| e.to_string())?;
        assert_eq!(s.retrieval.k_bm25, 4);
        assert_eq!(s.retrieval.k_vector, 8, "untouched keys keep defaults");
        assert!((s.retrieval.w_vector - 0.5).abs() < 1e-6);
        assert_eq!(s.embedding.tiers, vec![EmbeddingTier::Hash]);
        assert_eq!(s.embedding.dim, 64);

        let k: usize = cfg.get("retrieval.k_bm25").map_err(|e| e.to_string())?;
        assert_eq!(k, 4);
        Ok(())
    });
}

#[test]
fn config_rejects_invalid_weights() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("APP_RETRIEVAL__W_VECTOR", "-1.0");
        assert!(Config::load().is_err());
        Ok(())
    });
}

#[test]
fn chunk_validation_rejects_empty_id_and_nan() {
    assert!(Chunk::new("", "o", "text").validate().unwrap_err().is_contract());
    let bad = Chunk::new("c1", "o", "text").with_meta("score", f64::NAN);
    assert!(bad.validate().unwrap_err().is_contract());
    assert!(Chunk::new("c1", "o", "text").with_meta("page", 3).validate().is_ok());
}

#[test]
fn filter_is_exact_conjunction() {
    let chunk = Chunk::new("c1", "o", "x").with_meta("lang", "en").with_meta("page", 2);
    let mut filter = MetaFilter::new();
    filter.insert("lang".into(), MetaValue::from("en"));
    assert!(matches_filter(&chunk.metadata, &filter));
    filter.insert("page".into(), MetaValue::Int(3));
    assert!(!matches_filter(&chunk.metadata, &filter));
}

#[test]
fn parsed_filter_values_match_typed_metadata() {
    assert_eq!(MetaValue::parse("3"), MetaValue::Int(3));
    assert_eq!(MetaValue::parse("-7"), MetaValue::Int(-7));
    assert_eq!(MetaValue::parse("2.5"), MetaValue::Float(2.5));
    assert_eq!(MetaValue::parse("true"), MetaValue::Bool(true));
    assert_eq!(MetaValue::parse("en"), MetaValue::from("en"));
    assert_eq!(MetaValue::parse("NaN"), MetaValue::from("NaN"));

    let chunk = Chunk::new("deck:3", "o", "x").with_meta("page", 3).with_meta("draft", false);
    let mut filter = MetaFilter::new();
    filter.insert("page".into(), MetaValue::parse("3"));
    filter.insert("draft".into(), MetaValue::parse("false"));
    assert!(matches_filter(&chunk.metadata, &filter));
}

#[test]
fn chunk_json_roundtrip_keeps_kind_and_metadata() {
    let chunk = Chunk::new("deck:1", "owner", "Revenue grew")
        .with_kind(ChunkKind::Slide)
        .with_location("4")
        .with_meta("tags", vec!["q1".to_string(), "finance".to_string()]);
    let raw = serde_json::to_string(&chunk).unwrap();
    let back: Chunk = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, chunk);

    let minimal: Chunk = serde_json::from_str(r#"{"id":"a","owner_id":"o","text":"t"}"#).unwrap();
    assert_eq!(minimal.kind, ChunkKind::Text);
    assert!(minimal.location_hint.is_none());
}

#[test]
fn memory_store_put_list_clear() {
    let store = MemoryChunkStore::new();
    assert!(store.list_chunks("o").unwrap().is_empty());
    store.put_chunks("o", &[Chunk::new("a", "o", "alpha")]).unwrap();
    assert_eq!(store.list_chunks("o").unwrap().len(), 1);
    assert!(store.list_chunks("other").unwrap().is_empty());
    store.clear("o").unwrap();
    assert!(store.list_chunks("o").unwrap().is_empty());
}

#[test]
fn json_store_persists_across_instances() {
    let tmp = TempDir::new().unwrap();
    let chunks = vec![Chunk::new("a", "o1", "alpha"), Chunk::new("b", "o1", "bravo")];
    {
        let store = JsonChunkStore::open(tmp.path()).unwrap();
        store.put_chunks("o1", &chunks).unwrap();
    }
    assert!(tmp.path().join("o1.json").exists());

    let reopened = JsonChunkStore::open(tmp.path()).unwrap();
    assert_eq!(reopened.list_chunks("o1").unwrap(), chunks);

    reopened.clear("o1").unwrap();
    assert!(!tmp.path().join("o1.json").exists());
    assert!(reopened.list_chunks("o1").unwrap().is_empty());
}

#[test]
fn json_store_rejects_path_like_owner() {
    let tmp = TempDir::new().unwrap();
    let store = JsonChunkStore::open(tmp.path()).unwrap();
    assert!(store.put_chunks("../escape", &[]).unwrap_err().is_contract());
}

#[test]
fn ingest_single_small_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("notes.txt"), "Short text\n").unwrap();

    let chunks = Ingestor::default().process_directory(tmp.path(), "o").expect("process");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, "notes:0");
    assert_eq!(chunks[0].source, "notes.txt");
    assert_eq!(chunks[0].kind, ChunkKind::Text);
    assert_eq!(chunks[0].text, "Short text");
}

#[test]
fn ingest_windows_overlap() {
    let ingestor = Ingestor::new(ChunkingConfig { words_per_chunk: 10, overlap_percent: 0.2 });
    let text: Vec<String> = (0..25).map(|i| format!("w{i}")).collect();
    let windows = ingestor.split_words(&text.join(" "));
    assert_eq!(windows.len(), 3);
    assert!(windows[0].starts_with("w0 ") && windows[0].ends_with("w9"));
    assert!(windows[1].starts_with("w8 "), "two words of overlap");
    assert!(windows[2].ends_with("w24"));
    assert!(ingestor.split_words("   ").is_empty());
}

#[test]
fn ingest_skips_non_txt_and_sorts() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("b.txt"), "bravo").unwrap();
    fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
    fs::write(tmp.path().join("c.md"), "ignored").unwrap();

    let chunks = Ingestor::default().process_directory(tmp.path(), "o").unwrap();
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a:0", "b:0"]);
}

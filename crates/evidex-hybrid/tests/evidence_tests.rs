use evidex_core::types::{Chunk, ChunkKind, SearchHit, SourceKind};
use evidex_hybrid::evidence::{location, materialize, snippet};
use evidex_hybrid::fusion::{fuse, normalize};

fn hit(id: &str, score: f32, source: SourceKind) -> SearchHit {
    SearchHit::new(id, score, source)
}

#[test]
fn slide_location_prefers_hint_then_page_then_one() {
    let c = Chunk::new("s", "o", "x").with_kind(ChunkKind::Slide);
    assert_eq!(location(&c), "p1");
    assert_eq!(location(&c.clone().with_meta("page", 7)), "p7");
    assert_eq!(location(&c.with_meta("page", 7).with_location("12")), "p12");
}

#[test]
fn transcript_location_uses_timestamp() {
    let c = Chunk::new("t", "o", "x").with_kind(ChunkKind::Transcript);
    assert_eq!(location(&c), "t=00:00");
    assert_eq!(location(&c.clone().with_meta("timestamp", "03:21")), "t=03:21");
    assert_eq!(location(&c.with_location("10:05")), "t=10:05");
}

#[test]
fn other_kinds_cite_source() {
    let c = Chunk::new("u", "o", "x").with_kind(ChunkKind::Url).with_source("https://example.com/pricing");
    assert_eq!(location(&c), "https://example.com/pricing");
    assert_eq!(location(&Chunk::new("n", "o", "x").with_source("notes.txt")), "notes.txt");
}

#[test]
fn snippet_cuts_at_char_boundary() {
    assert_eq!(snippet("short", 200), "short");
    let exact = "a".repeat(200);
    assert_eq!(snippet(&exact, 200), exact);
    let long = "é".repeat(250);
    let s = snippet(&long, 200);
    assert!(s.ends_with("..."));
    assert_eq!(s.chars().count(), 203);
}

#[test]
fn materialize_caps_confidence() {
    let e = materialize(&Chunk::new("a", "o", "text"), 1.4, 200);
    assert!((e.confidence - 1.0).abs() < f32::EPSILON);
    assert_eq!(e.kind, ChunkKind::Text);
}

#[test]
fn normalize_by_max_and_flat_when_non_positive() {
    let n = normalize(&[hit("a", 4.0, SourceKind::Text), hit("b", 1.0, SourceKind::Text)]);
    assert_eq!(n, vec![("a".to_string(), 1.0), ("b".to_string(), 0.25)]);

    let n = normalize(&[hit("a", 0.0, SourceKind::Text), hit("b", -2.0, SourceKind::Text)]);
    assert!(n.iter().all(|(_, s)| (*s - 0.5).abs() < 1e-6));

    // negative entries under a positive max clamp to zero
    let n = normalize(&[hit("a", 2.0, SourceKind::Text), hit("b", -1.0, SourceKind::Text)]);
    assert_eq!(n[1].1, 0.0);
    assert!(normalize(&[]).is_empty());
}

#[test]
fn fused_scores_stay_within_weight_sum() {
    let lists = [
        (vec![hit("a", 0.9, SourceKind::Vector), hit("b", 0.2, SourceKind::Vector)], vec![hit("b", 7.5, SourceKind::Text), hit("c", -3.0, SourceKind::Text)]),
        (vec![], vec![hit("x", 0.0, SourceKind::Text)]),
        (vec![hit("y", 0.33, SourceKind::Vector)], vec![]),
        (vec![hit("a", 0.5, SourceKind::Vector), hit("a", 0.1, SourceKind::Vector)], vec![hit("a", 2.0, SourceKind::Text)]),
    ];
    let (wv, wb) = (0.7, 0.3);
    for (v, b) in &lists {
        for (_, s) in fuse(v, b, wv, wb) {
            assert!((0.0..=wv + wb + 1e-6).contains(&s), "score {s} out of range");
        }
    }
}

#[test]
fn fusion_ties_keep_vector_list_first() {
    let v = vec![hit("v1", 1.0, SourceKind::Vector)];
    let b = vec![hit("k1", 3.0, SourceKind::Text)];
    let fused = fuse(&v, &b, 0.5, 0.5);
    assert_eq!(fused.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>(), vec!["v1", "k1"]);
}

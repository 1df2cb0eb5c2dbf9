use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use evidex_core::error::{Error, Result};
use evidex_core::traits::VectorIndexer;
use evidex_core::types::{ChunkId, MetaFilter, Metadata, SearchHit, SourceKind};
use evidex_vector::{FallbackVectorIndex, FlatIndex};

#[derive(Clone, Copy)]
enum Mode {
    Fail,
    Slow,
    Empty,
    Answer,
    Hang,
}

struct ScriptedRemote {
    mode: Mode,
    writes: Arc<AtomicUsize>,
}

#[async_trait]
impl VectorIndexer for ScriptedRemote {
    fn dim(&self) -> Option<usize> {
        Some(2)
    }

    fn len(&self) -> usize {
        0
    }

    async fn insert(&mut self, _: Vec<Vec<f32>>, _: Vec<ChunkId>, _: Vec<Metadata>) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Fail => Err(Error::Backend("offline".into())),
            Mode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn search(&self, _: &[f32], _: usize, _: Option<&MetaFilter>) -> Result<Vec<SearchHit>> {
        match self.mode {
            Mode::Fail => Err(Error::Backend("offline".into())),
            Mode::Slow => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(vec![SearchHit::new("late", 1.0, SourceKind::Vector)])
            }
            Mode::Empty | Mode::Hang => Ok(vec![]),
            Mode::Answer => Ok(vec![SearchHit::new("remote-hit", 0.9, SourceKind::Vector)]),
        }
    }

    async fn delete(&mut self, _: &[ChunkId]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Mode::Hang = self.mode {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Err(Error::Backend("offline".into()))
    }

    async fn clear(&mut self) -> Result<()> {
        if let Mode::Hang = self.mode {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(())
    }
}

async fn seeded(mode: Mode) -> (FallbackVectorIndex, Arc<AtomicUsize>) {
    let writes = Arc::new(AtomicUsize::new(0));
    let remote = ScriptedRemote { mode, writes: writes.clone() };
    let mut idx = FallbackVectorIndex::with_remote(FlatIndex::default(), Box::new(remote), Duration::from_millis(50));
    idx.insert(vec![vec![0.0, 0.0], vec![1.0, 1.0]], vec!["a".into(), "b".into()], vec![Metadata::new(); 2])
        .await
        .unwrap();
    (idx, writes)
}

#[tokio::test]
async fn remote_error_falls_back_to_local() {
    let (idx, writes) = seeded(Mode::Fail).await;
    assert_eq!(writes.load(Ordering::SeqCst), 1, "insert mirrored even though it failed");
    let hits = idx.search(&[0.0, 0.0], 2, None).await.unwrap();
    assert_eq!(hits[0].id, "a");
}

#[tokio::test]
async fn remote_timeout_falls_back_to_local() {
    let (idx, _) = seeded(Mode::Slow).await;
    let hits = idx.search(&[1.0, 1.0], 1, None).await.unwrap();
    assert_eq!(hits[0].id, "b");
}

#[tokio::test]
async fn remote_empty_falls_back_to_local() {
    let (idx, _) = seeded(Mode::Empty).await;
    assert_eq!(idx.search(&[0.0, 0.0], 2, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn remote_answer_is_preferred() {
    let (idx, _) = seeded(Mode::Answer).await;
    let hits = idx.search(&[0.0, 0.0], 2, None).await.unwrap();
    assert_eq!(hits[0].id, "remote-hit");
}

#[tokio::test]
async fn remote_delete_failure_is_swallowed() {
    let (mut idx, writes) = seeded(Mode::Fail).await;
    idx.delete(&["a".to_string()]).await.unwrap();
    assert_eq!(writes.load(Ordering::SeqCst), 2);
    assert_eq!(idx.len(), 1);
}

#[tokio::test]
async fn hung_remote_writes_do_not_block_the_local_index() {
    let outcome = tokio::time::timeout(Duration::from_secs(2), async {
        let (mut idx, writes) = seeded(Mode::Hang).await;
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        idx.delete(&["a".to_string()]).await.unwrap();
        assert_eq!(idx.len(), 1);
        idx.clear().await.unwrap();
        assert!(idx.is_empty());
        idx.insert(vec![vec![3.0, 3.0]], vec!["c".into()], vec![Metadata::new()]).await.unwrap();
        idx.search(&[3.0, 3.0], 1, None).await.unwrap()
    })
    .await
    .expect("remote writes are bounded by the timeout");
    assert_eq!(outcome[0].id, "c");
}

#[tokio::test]
async fn contract_errors_still_surface() {
    let (mut idx, writes) = seeded(Mode::Answer).await;
    let err = idx.insert(vec![vec![0.0, 0.0]], vec![], vec![]).await.unwrap_err();
    assert!(err.is_contract());
    assert_eq!(writes.load(Ordering::SeqCst), 1, "bad batch never reaches the remote");
}

#[tokio::test]
async fn disabled_remote_settings_give_local_only() {
    let idx = FallbackVectorIndex::from_settings(&Default::default(), "acme").await;
    assert!(!idx.has_remote());
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

use ragchat_memory::{Chunk, EmbeddedChunk, FlatIndex, VectorIndex};
use ragchat_session::{SessionRegistry, SessionState};
use std::sync::Arc;
use std::time::Duration;

/// Helper: a ready-made single-chunk index.
fn tiny_index() -> Arc<dyn VectorIndex> {
    let entry = EmbeddedChunk {
        chunk: Chunk {
            index: 0,
            text: "Refunds within 30 days.".into(),
            start: 0,
            end: 23,
        },
        vector: vec![0.6, 0.8],
    };
    Arc::new(FlatIndex::from_embedded(vec![entry]).unwrap())
}

#[tokio::test]
async fn test_busy_session_does_not_block_others() {
    let registry = Arc::new(SessionRegistry::new());
    let busy = registry.create();
    let idle = registry.create();

    // Hold the busy session's lock for a long time.
    let handle = registry.handle(busy);
    let guard = handle.lock().await;

    let other = registry.handle(idle);
    let result = tokio::time::timeout(Duration::from_secs(1), async {
        let mut state = other.lock().await;
        state.install_index(tiny_index(), vec!["doc.txt".into()]);
        state.status()
    })
    .await
    .expect("independent session must not wait");

    assert!(result.ready);
    drop(guard);
}

#[tokio::test]
async fn test_same_session_requests_are_serialized() {
    let registry = Arc::new(SessionRegistry::new());
    let id = registry.create();
    {
        let handle = registry.handle(id);
        handle.lock().await.install_index(tiny_index(), Vec::new());
    }

    let mut tasks = Vec::new();
    for i in 0..8 {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let handle = registry.handle(id);
            let mut state = handle.lock().await;
            tokio::task::yield_now().await;
            state.record_exchange(format!("q{i}"), format!("a{i}"));
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let handle = registry.get(id).unwrap();
    let state = handle.lock().await;
    let turns = state.history().turns();
    assert_eq!(turns.len(), 16);
    for pair in turns.chunks(2) {
        assert_eq!(pair[0].text[1..], pair[1].text[1..]);
    }
}

#[tokio::test]
async fn test_status_serializes() {
    let mut state = SessionState::default();
    state.install_index(tiny_index(), vec!["policy.pdf".into()]);
    state.record_exchange("How long?", "30 days.");

    let json = serde_json::to_value(state.status()).unwrap();
    assert_eq!(json["ready"], true);
    assert_eq!(json["chunks"], 1);
    assert_eq!(json["history_len"], 2);
    assert_eq!(json["documents"][0], "policy.pdf");
}

//! Persist-then-restore behaviour shared by every backend.

use std::sync::Arc;
use std::time::Duration;

use tl_domain::config::{ThreadBackend, ThreadsConfig};
use tl_domain::tool::{FunctionCall, Message, Role};
use tl_threads::{open_store, FileThreadStore, MemoryThreadStore, ThreadStore};
use uuid::Uuid;

fn mixed_log() -> Vec<Message> {
    vec![
        Message::user("what's the weather like?"),
        Message::model("Let me look that up."),
        Message::function_call(FunctionCall {
            name: "web_fetch".into(),
            args: serde_json::json!({"url": "https://example.com"}),
        }),
        Message::function_response("web_fetch", serde_json::Map::new()),
        Message::model(""),
        Message::model("Sunny, 21°C."),
        Message::user("thanks"),
    ]
}

fn expected_pairs() -> Vec<(Role, &'static str)> {
    vec![
        (Role::User, "what's the weather like?"),
        (Role::Model, "Let me look that up."),
        (Role::Model, "Sunny, 21°C."),
        (Role::User, "thanks"),
    ]
}

async fn assert_round_trip(store: Arc<dyn ThreadStore>) {
    let id = Uuid::new_v4();
    store.store(&id, &mixed_log()).await.unwrap();

    let restored = store.restore(&id.to_string()).await.unwrap();
    let pairs: Vec<(Role, &str)> = restored
        .iter()
        .map(|m| (m.role, m.first_text().unwrap_or_default()))
        .collect();
    assert_eq!(pairs, expected_pairs());
    assert!(restored.iter().all(|m| m.parts.len() == 1));
}

#[tokio::test]
async fn memory_backend_filters_and_preserves_order() {
    assert_round_trip(Arc::new(MemoryThreadStore::new(
        "thread:",
        Duration::from_secs(600),
    )))
    .await;
}

#[tokio::test]
async fn file_backend_filters_and_preserves_order() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileThreadStore::new(tmp.path(), "thread:", Duration::from_secs(600)).unwrap();
    assert_round_trip(Arc::new(store)).await;
}

#[tokio::test]
async fn open_store_honours_backend_choice() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = ThreadsConfig {
        backend: ThreadBackend::File,
        dir: tmp.path().join("threads"),
        ..Default::default()
    };
    let store = open_store(&cfg).unwrap();
    assert_eq!(store.backend(), "file");
    assert!(tmp.path().join("threads").is_dir());

    let store = open_store(&ThreadsConfig::default()).unwrap();
    assert_eq!(store.backend(), "memory");
}

#[tokio::test]
async fn concurrent_sessions_do_not_interfere() {
    let store: Arc<dyn ThreadStore> =
        Arc::new(MemoryThreadStore::new("thread:", Duration::from_secs(600)));

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let id = Uuid::new_v4();
            let text = format!("prompt {i}");
            store.store(&id, &[Message::user(text.clone())]).await.unwrap();
            let restored = store.restore(&id.to_string()).await.unwrap();
            assert_eq!(restored, vec![Message::user(text)]);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
}

use std::sync::Arc;
use std::time::Duration;

use super::{InMemoryRevocationStore, MockRevocationStore, RevocationStore};

#[tokio::test]
async fn test_memory_set_and_exists() {
    let store = InMemoryRevocationStore::new();

    assert!(!store.exists("jti-1").await.unwrap());
    store.set("jti-1", Duration::from_secs(60)).await.unwrap();
    assert!(store.exists("jti-1").await.unwrap());
    assert!(!store.exists("jti-2").await.unwrap());
}

#[tokio::test]
async fn test_memory_entries_expire() {
    let store = InMemoryRevocationStore::new();

    store.set("short", Duration::from_millis(20)).await.unwrap();
    store.set("long", Duration::from_secs(60)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert!(!store.exists("short").await.unwrap());
    assert!(store.exists("long").await.unwrap());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_memory_purge_expired() {
    let store = InMemoryRevocationStore::new();

    store.set("a", Duration::from_millis(10)).await.unwrap();
    store.set("b", Duration::from_millis(10)).await.unwrap();
    store.set("c", Duration::from_secs(60)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(store.purge_expired(), 2);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_memory_record_once_first_writer_wins() {
    let store = InMemoryRevocationStore::new();

    assert!(store.record_once("jti", Duration::from_secs(60)).await.unwrap());
    assert!(!store.record_once("jti", Duration::from_secs(60)).await.unwrap());
    assert!(store.exists("jti").await.unwrap());
}

#[tokio::test]
async fn test_memory_record_once_after_expiry() {
    let store = InMemoryRevocationStore::new();

    assert!(store.record_once("jti", Duration::from_millis(10)).await.unwrap());
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(store.record_once("jti", Duration::from_secs(60)).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_record_once_concurrent() {
    let store = Arc::new(InMemoryRevocationStore::new());

    let mut handles = Vec::new();
    for _ in 0..32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.record_once("shared", Duration::from_secs(60)).await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_default_record_once_uses_exists_and_set() {
    let store = MockRevocationStore::new();

    assert!(store.record_once("jti", Duration::from_secs(5)).await.unwrap());
    assert!(!store.record_once("jti", Duration::from_secs(5)).await.unwrap());
    assert!(store.contains("jti"));
}

#[tokio::test]
async fn test_mock_failure() {
    let store = MockRevocationStore::failing();

    assert!(store.exists("jti").await.is_err());
    assert!(store.set("jti", Duration::from_secs(5)).await.is_err());
    assert!(store.record_once("jti", Duration::from_secs(5)).await.is_err());
}

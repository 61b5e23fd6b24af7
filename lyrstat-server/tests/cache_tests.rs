//! Lookup cache integration tests: on-disk persistence and concurrent access

use lyrstat_server::cache::{CacheStats, LookupCache};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_entries_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("cache").join("lyrics_cache.db");

    {
        let cache = LookupCache::open(&db_path).await.unwrap();
        cache.set("Alice", "Song", Some("la la"), "lrclib", true).await;
        cache.set("Bob", "Quiet", None, "none", false).await;
        cache.close().await;
    }

    let cache = LookupCache::open(&db_path).await.unwrap();

    let hit = cache.get("ALICE", "song").await.unwrap();
    assert_eq!(hit.lyrics.as_deref(), Some("la la"));
    assert_eq!(hit.source, "lrclib");

    let miss = cache.get("bob", "quiet").await.unwrap();
    assert!(!miss.found);
    assert!(miss.lyrics.is_none());

    assert_eq!(cache.stats().await, CacheStats { total: 2, found: 1 });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_and_readers() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(
        LookupCache::open(&temp_dir.path().join("lyrics_cache.db"))
            .await
            .unwrap(),
    );

    let mut tasks = JoinSet::new();
    for worker in 0..8 {
        let cache = cache.clone();
        tasks.spawn(async move {
            for i in 0..25 {
                let title = format!("Track {}", i);
                let found = i % 2 == 0;
                let lyrics = found.then(|| format!("words {} {}", worker, i));
                cache
                    .set("Artist", &title, lyrics.as_deref(), if found { "lrclib" } else { "none" }, found)
                    .await;
                // Readers interleave with writers from other workers
                let _ = cache.get("artist", &title).await;
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    // All workers wrote the same 25 keys: last write wins, no duplicates
    let stats = cache.stats().await;
    assert_eq!(stats.total, 25);
    assert_eq!(stats.found, 13);

    let entry = cache.get("Artist", "Track 0").await.unwrap();
    assert!(entry.found);
    assert!(entry.lyrics.unwrap().starts_with("words "));
}

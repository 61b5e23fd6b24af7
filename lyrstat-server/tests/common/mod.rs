//! Shared fixtures for lyrstat-server integration tests
//!
//! Fake upstream sources implementing the source traits, plus helpers to build a fully wired
//! application state over an in-memory lookup cache.

#![allow(dead_code)]

use async_trait::async_trait;
use lyrstat_common::Track;
use lyrstat_server::analysis::{AnalyzerConfig, StopWords};
use lyrstat_server::cache::LookupCache;
use lyrstat_server::lyrics::{LyricsResolver, LyricsSource};
use lyrstat_server::sources::{CatalogSource, ScrobbleHistory, ScrobbleSource, SourceError};
use lyrstat_server::tasks::{AnalysisRunner, TaskPhase, TaskRegistry, TaskStatus};
use lyrstat_server::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Scrobble source answering every request with the same history or error
pub struct FakeScrobbles {
    answer: Result<ScrobbleHistory, String>,
    pub calls: AtomicUsize,
}

impl FakeScrobbles {
    pub fn with_tracks(tracks: Vec<Track>) -> Arc<Self> {
        let total_scrobbles = tracks.iter().map(|t| t.play_count as usize).sum();
        Arc::new(Self {
            answer: Ok(ScrobbleHistory {
                tracks,
                total_scrobbles,
            }),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ScrobbleSource for FakeScrobbles {
    async fn get_tracks(
        &self,
        _username: &str,
        _from: &str,
        _to: &str,
        max_unique: usize,
    ) -> Result<ScrobbleHistory, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(history) => {
                let mut history = history.clone();
                history.tracks.truncate(max_unique);
                Ok(history)
            }
            Err(message) => Err(SourceError::Upstream(message.clone())),
        }
    }
}

/// Catalog source with a fixed discography
pub struct FakeCatalog {
    titles: Vec<String>,
}

impl FakeCatalog {
    pub fn new(titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            titles: titles.iter().map(|t| t.to_string()).collect(),
        })
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn discography(&self, artist: &str, max_tracks: usize) -> Result<Vec<Track>, SourceError> {
        Ok(self
            .titles
            .iter()
            .take(max_tracks)
            .map(|title| Track::new(artist, title.clone(), 0))
            .collect())
    }
}

/// Lyrics source keyed by (cleaned) title, optionally held closed until released
pub struct FakeLyrics {
    lyrics: HashMap<String, String>,
    gate: Option<Semaphore>,
    pub calls: AtomicUsize,
}

impl FakeLyrics {
    pub fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self::build(entries, None))
    }

    /// Every search blocks until [`FakeLyrics::release`] is called
    pub fn gated(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self::build(entries, Some(Semaphore::new(0))))
    }

    fn build(entries: &[(&str, &str)], gate: Option<Semaphore>) -> Self {
        Self {
            lyrics: entries
                .iter()
                .map(|(title, text)| (title.to_string(), text.to_string()))
                .collect(),
            gate,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1_000);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LyricsSource for FakeLyrics {
    fn tag(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, _artist: &str, title: &str) -> Result<Option<String>, SourceError> {
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| SourceError::Network(e.to_string()))?;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lyrics.get(title).cloned())
    }
}

/// Fully wired application pieces
pub struct Harness {
    pub cache: Arc<LookupCache>,
    pub registry: Arc<TaskRegistry>,
    pub runner: Arc<AnalysisRunner>,
    pub state: AppState,
}

pub async fn harness(
    scrobbles: Arc<dyn ScrobbleSource>,
    catalog: Option<Arc<dyn CatalogSource>>,
    lyrics: Arc<dyn LyricsSource>,
) -> Harness {
    harness_with_stopwords(scrobbles, catalog, lyrics, StopWords::empty()).await
}

pub async fn harness_with_stopwords(
    scrobbles: Arc<dyn ScrobbleSource>,
    catalog: Option<Arc<dyn CatalogSource>>,
    lyrics: Arc<dyn LyricsSource>,
    stopwords: StopWords,
) -> Harness {
    let cache = Arc::new(LookupCache::in_memory().await.unwrap());
    let config = Arc::new(AnalyzerConfig::new(stopwords).unwrap());
    let resolver = Arc::new(LyricsResolver::new(cache.clone(), vec![lyrics], config.clone()));
    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(3600), 100));
    let runner = Arc::new(AnalysisRunner::new(
        registry.clone(),
        resolver,
        scrobbles,
        catalog,
        config,
        4,
    ));
    let state = AppState::new(cache.clone(), runner.clone(), 500);

    Harness {
        cache,
        registry,
        runner,
        state,
    }
}

/// Poll the registry until the task satisfies `done`, panicking after a few seconds
pub async fn wait_for<F>(registry: &TaskRegistry, task_id: &str, done: F) -> TaskStatus
where
    F: Fn(&TaskStatus) -> bool,
{
    for _ in 0..500 {
        if let Some(status) = registry.get(task_id) {
            if done(&status) {
                return status;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} did not reach the expected state: {:?}", task_id, registry.get(task_id));
}

pub async fn wait_for_phase(registry: &TaskRegistry, task_id: &str, phase: TaskPhase) -> TaskStatus {
    wait_for(registry, task_id, |s| s.phase == phase).await
}

pub async fn wait_terminal(registry: &TaskRegistry, task_id: &str) -> TaskStatus {
    wait_for(registry, task_id, |s| s.phase.is_terminal()).await
}

pub fn sample_tracks() -> Vec<Track> {
    vec![
        Track::new("Alice", "Song (Live)", 5),
        Track::new("Alice", "Song", 3),
        Track::new("Bob", "Quiet", 1),
    ]
}

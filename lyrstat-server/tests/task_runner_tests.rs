//! Task runner integration tests
//!
//! Drive complete analysis runs over fake upstream sources and check the resulting task
//! status: phases, counters, error messages and results.

mod common;

use common::*;
use lyrstat_common::Track;
use lyrstat_server::analysis::StopWords;
use lyrstat_server::sources::{CatalogSource, ScrobbleSource};
use lyrstat_server::tasks::{AnalysisJob, JobSubject, TaskPhase};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn job(username: &str) -> AnalysisJob {
    AnalysisJob {
        subject: JobSubject::Scrobbles {
            username: username.to_string(),
            from: "2026-02-02".to_string(),
            to: "2026-02-12".to_string(),
        },
        max_tracks: 500,
        exclude_stop_words: false,
        include_lyrics: false,
    }
}

#[tokio::test]
async fn test_successful_run_reaches_done() {
    // Given: three tracks, two of which share a normalized title with lyrics
    let lyrics = FakeLyrics::new(&[("Song", "la la LA la da")]);
    let h = harness(FakeScrobbles::with_tracks(sample_tracks()), None, lyrics).await;

    // When: the job runs to completion
    let submission = h.runner.submit(job("alice")).unwrap();
    assert!(!submission.already_running);
    let status = wait_terminal(&h.registry, &submission.task_id).await;

    // Then: done with consistent counters and a ranked result
    assert_eq!(status.phase, TaskPhase::Done);
    assert_eq!(status.progress, 100);
    assert_eq!(status.total_tracks, 3);
    assert_eq!(status.processed_tracks, 3);
    assert_eq!(status.lyrics_found, 2);
    assert!(status.error.is_none());

    let result = status.result.unwrap();
    assert_eq!(result.total_scrobbles, 9);
    assert_eq!(result.unique_tracks, 3);
    assert_eq!(result.lyrics_found, 2);
    assert_eq!(result.lyrics_missing, 1);
    assert_eq!(result.words[0].word, "la");
    assert_eq!(result.words[0].count, 8);
    assert_eq!(
        result.words[0].tracks,
        vec!["Alice — Song".to_string(), "Alice — Song (Live)".to_string()]
    );
    assert_eq!(result.total_unique_words, 2);
    assert_eq!(result.total_word_count, 10);
    assert!(result.lyrics.is_none());
}

#[tokio::test]
async fn test_upstream_failure_message_is_verbatim() {
    let h = harness(
        FakeScrobbles::failing("lastfm: User not found"),
        None,
        FakeLyrics::new(&[]),
    )
    .await;

    let submission = h.runner.submit(job("ghost")).unwrap();
    let status = wait_terminal(&h.registry, &submission.task_id).await;

    assert_eq!(status.phase, TaskPhase::Error);
    assert_eq!(status.error.as_deref(), Some("lastfm: User not found"));
    assert!(status.result.is_none());
}

#[tokio::test]
async fn test_no_tracks_is_an_error() {
    let h = harness(FakeScrobbles::with_tracks(Vec::new()), None, FakeLyrics::new(&[])).await;

    let submission = h.runner.submit(job("idle")).unwrap();
    let status = wait_terminal(&h.registry, &submission.task_id).await;

    assert_eq!(status.phase, TaskPhase::Error);
    assert_eq!(status.error.as_deref(), Some("no tracks found"));
}

#[tokio::test]
async fn test_no_lyrics_is_an_error_and_misses_are_cached() {
    let lyrics = FakeLyrics::new(&[]);
    let h = harness(
        FakeScrobbles::with_tracks(vec![Track::new("Bob", "Quiet", 1)]),
        None,
        lyrics.clone(),
    )
    .await;

    let submission = h.runner.submit(job("bob")).unwrap();
    let status = wait_terminal(&h.registry, &submission.task_id).await;

    assert_eq!(status.phase, TaskPhase::Error);
    assert_eq!(status.error.as_deref(), Some("no lyrics found for any track"));
    assert_eq!(status.processed_tracks, 1);
    assert_eq!(status.lyrics_found, 0);

    // Resubmitting a failed task starts a fresh run that is answered from the negative cache
    let again = h.runner.submit(job("bob")).unwrap();
    assert_eq!(again.task_id, submission.task_id);
    assert!(!again.already_running);
    let status = wait_terminal(&h.registry, &again.task_id).await;

    assert_eq!(status.error.as_deref(), Some("no lyrics found for any track"));
    assert_eq!(lyrics.calls(), 1);
}

#[tokio::test]
async fn test_resubmission_while_resolving_lyrics_is_rejected() {
    // Given: a run blocked inside the lyrics phase
    let lyrics = FakeLyrics::gated(&[("Song", "hello world")]);
    let h = harness(FakeScrobbles::with_tracks(sample_tracks()), None, lyrics.clone()).await;

    let first = h.runner.submit(job("alice")).unwrap();
    wait_for_phase(&h.registry, &first.task_id, TaskPhase::Lyrics).await;

    // When: the same fingerprint is submitted again
    let second = h.runner.submit(job("alice")).unwrap();

    // Then: already running, same id, and the first run still completes
    assert!(second.already_running);
    assert_eq!(second.task_id, first.task_id);

    lyrics.release();
    let status = wait_terminal(&h.registry, &first.task_id).await;
    assert_eq!(status.phase, TaskPhase::Done);
}

#[tokio::test]
async fn test_back_to_back_submissions_fetch_history_once() {
    let scrobbles = FakeScrobbles::with_tracks(sample_tracks());
    let h = harness(
        scrobbles.clone() as Arc<dyn ScrobbleSource>,
        None,
        FakeLyrics::new(&[("Song", "la la")]),
    )
    .await;

    // No await in between: the first run has not started, so the second replaces it
    let first = h.runner.submit(job("alice")).unwrap();
    let second = h.runner.submit(job("alice")).unwrap();
    assert!(!first.already_running);
    assert!(!second.already_running);
    assert_eq!(first.task_id, second.task_id);

    let status = wait_terminal(&h.registry, &second.task_id).await;

    // The replaced run stops before touching upstream sources
    assert_eq!(status.phase, TaskPhase::Done);
    assert_eq!(status.total_tracks, 3);
    assert_eq!(scrobbles.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pre_seeded_cache_serves_annotated_titles() {
    // Given: "song" cached under the normalized key
    let lyrics = FakeLyrics::new(&[]);
    let h = harness(
        FakeScrobbles::with_tracks(vec![
            Track::new("Alice", "Song (Live)", 5),
            Track::new("Alice", "Song", 3),
        ]),
        None,
        lyrics.clone(),
    )
    .await;
    h.cache
        .set("Alice", "song", Some("cached cached words"), "lrclib", true)
        .await;

    let submission = h.runner.submit(job("alice")).unwrap();
    let status = wait_terminal(&h.registry, &submission.task_id).await;

    // Then: both raw titles resolved from the cache, no source call
    assert_eq!(status.phase, TaskPhase::Done);
    assert_eq!(status.lyrics_found, 2);
    assert_eq!(lyrics.calls(), 0);
}

#[tokio::test]
async fn test_include_lyrics_and_stopword_exclusion() {
    let lyrics = FakeLyrics::new(&[("Song", "the cat and the hat")]);
    let h = harness_with_stopwords(
        FakeScrobbles::with_tracks(vec![Track::new("Alice", "Song", 2)]),
        None,
        lyrics,
        StopWords::from_words(["the", "and"]),
    )
    .await;

    let mut request = job("alice");
    request.exclude_stop_words = true;
    request.include_lyrics = true;

    let submission = h.runner.submit(request).unwrap();
    let result = wait_terminal(&h.registry, &submission.task_id)
        .await
        .result
        .unwrap();

    let words: Vec<&str> = result.words.iter().map(|w| w.word.as_str()).collect();
    assert_eq!(words, vec!["cat", "hat"]);
    assert_eq!(
        result.lyrics.unwrap()["Alice — Song"],
        "the cat and the hat"
    );
}

#[tokio::test]
async fn test_discography_run() {
    let lyrics = FakeLyrics::new(&[("Creep", "you're so very special"), ("Nude", "don't get any big ideas")]);
    let catalog = FakeCatalog::new(&["Creep", "Nude", "Unreleased"]);
    let h = harness(
        FakeScrobbles::failing("should not be called"),
        Some(catalog as Arc<dyn CatalogSource>),
        lyrics,
    )
    .await;

    let submission = h
        .runner
        .submit(AnalysisJob {
            subject: JobSubject::Discography {
                artist: "Radiohead".to_string(),
            },
            max_tracks: 10,
            exclude_stop_words: false,
            include_lyrics: false,
        })
        .unwrap();
    let status = wait_terminal(&h.registry, &submission.task_id).await;

    assert_eq!(status.phase, TaskPhase::Done);
    let result = status.result.unwrap();
    assert_eq!(result.total_scrobbles, 0);
    assert_eq!(result.unique_tracks, 3);
    assert_eq!(result.lyrics_found, 2);
}

#[tokio::test]
async fn test_discography_without_catalog_fails_task() {
    let h = harness(FakeScrobbles::with_tracks(Vec::new()), None, FakeLyrics::new(&[])).await;

    let submission = h
        .runner
        .submit(AnalysisJob {
            subject: JobSubject::Discography {
                artist: "Anyone".to_string(),
            },
            max_tracks: 10,
            exclude_stop_words: true,
            include_lyrics: false,
        })
        .unwrap();
    let status = wait_terminal(&h.registry, &submission.task_id).await;

    assert_eq!(status.phase, TaskPhase::Error);
    assert!(status.error.unwrap().contains("not configured"));
}

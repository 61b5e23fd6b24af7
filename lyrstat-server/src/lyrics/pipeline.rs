//! Concurrent fetch pipeline
//!
//! Every track is queued up front; at most `workers` resolutions run at once and a single
//! collector consumes results in completion order, reporting progress for each one.

use futures::stream::{self, StreamExt};
use lyrstat_common::Track;
use std::collections::HashMap;
use std::sync::Arc;

use super::LyricsResolver;

/// Resolve lyrics for all tracks
///
/// `on_progress(processed, found, current)` is called synchronously once per track as its
/// result arrives; `current` is the key of the track that just completed. Returns the lyrics
/// of found tracks keyed by track key. Does not return before every track has completed.
pub async fn fetch_all<F>(
    resolver: &Arc<LyricsResolver>,
    tracks: &[Track],
    workers: usize,
    mut on_progress: F,
) -> HashMap<String, String>
where
    F: FnMut(usize, usize, &str),
{
    let workers = workers.max(1);

    // Each job owns its track and a resolver handle so the whole run stays Send
    let jobs: Vec<_> = tracks
        .iter()
        .cloned()
        .map(|track| {
            let resolver = Arc::clone(resolver);
            async move {
                let resolution = resolver.resolve(&track.artist, &track.title).await;
                (track.key(), resolution)
            }
        })
        .collect();

    let mut completions = stream::iter(jobs).buffer_unordered(workers);

    let mut lyrics_by_track = HashMap::new();
    let mut processed = 0;
    let mut found = 0;

    while let Some((key, resolution)) = completions.next().await {
        processed += 1;
        let lyrics = resolution.lyrics.filter(|_| resolution.found);
        if lyrics.is_some() {
            found += 1;
        }

        on_progress(processed, found, &key);

        if let Some(lyrics) = lyrics {
            lyrics_by_track.insert(key, lyrics);
        }
    }

    tracing::debug!(
        tracks = tracks.len(),
        found,
        workers,
        "Fetch pipeline drained"
    );

    lyrics_by_track
}

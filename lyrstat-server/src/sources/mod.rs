//! Upstream data sources: scrobble history and artist catalog
//!
//! Both are consumed through traits so the task runner can be driven by fakes in tests.

pub mod lastfm;
pub mod musicbrainz;

pub use lastfm::LastFmClient;
pub use musicbrainz::MusicBrainzClient;

use async_trait::async_trait;
use lyrstat_common::Track;
use thiserror::Error;

/// Errors raised by upstream HTTP clients
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Error reported by the upstream service itself, message kept verbatim
    #[error("{0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// Deduplicated listening history for a period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrobbleHistory {
    /// Unique tracks ranked by play count
    pub tracks: Vec<Track>,
    /// Number of play events before deduplication
    pub total_scrobbles: usize,
}

/// Paginated play-history provider
#[async_trait]
pub trait ScrobbleSource: Send + Sync {
    /// Fetch plays for `username` between `from` and `to` (`YYYY-MM-DD`), deduplicated,
    /// ranked by descending play count (ties by artist, then title) and capped at `max_unique`
    async fn get_tracks(
        &self,
        username: &str,
        from: &str,
        to: &str,
        max_unique: usize,
    ) -> Result<ScrobbleHistory, SourceError>;
}

/// Artist discography provider
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Unique track titles of an artist, at most `max_tracks`
    async fn discography(&self, artist: &str, max_tracks: usize) -> Result<Vec<Track>, SourceError>;
}

/// Collapse raw (artist, title) plays into ranked unique tracks
///
/// Plays are grouped case-insensitively; the first-seen spelling is kept.
pub fn rank_plays(plays: Vec<(String, String)>, max_unique: usize) -> Vec<Track> {
    use std::collections::HashMap;

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut tracks: Vec<Track> = Vec::new();

    for (artist, title) in plays {
        let key = format!("{}|||{}", artist, title).to_lowercase();
        match index.get(&key) {
            Some(&i) => tracks[i].play_count += 1,
            None => {
                index.insert(key, tracks.len());
                tracks.push(Track::new(artist, title, 1));
            }
        }
    }

    tracks.sort_by(|a, b| {
        b.play_count
            .cmp(&a.play_count)
            .then_with(|| a.artist.cmp(&b.artist))
            .then_with(|| a.title.cmp(&b.title))
    });
    tracks.truncate(max_unique);
    tracks
}

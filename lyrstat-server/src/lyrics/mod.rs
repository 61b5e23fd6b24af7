//! Lyrics resolution: external lyrics sources, the cache-first resolver and the
//! bounded-concurrency fetch pipeline

pub mod genius;
pub mod lrclib;
pub mod pipeline;
pub mod resolver;

pub use genius::GeniusSource;
pub use lrclib::LrclibSource;
pub use pipeline::fetch_all;
pub use resolver::LyricsResolver;

use async_trait::async_trait;
use std::time::Duration;

use crate::sources::SourceError;

/// Timeout applied to every lyrics source request
pub const LYRICS_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source tag recorded for negative outcomes
pub const SOURCE_NONE: &str = "none";

/// Source tag reported for cache hits
pub const SOURCE_CACHE: &str = "cache";

/// External service returning full lyrics text for a track
#[async_trait]
pub trait LyricsSource: Send + Sync {
    /// Tag stored alongside cached results from this source
    fn tag(&self) -> &'static str;

    /// Search lyrics; `Ok(None)` when the source has nothing for the track
    async fn search(&self, artist: &str, title: &str) -> Result<Option<String>, SourceError>;
}

/// Outcome of resolving one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub lyrics: Option<String>,
    pub found: bool,
    pub source: String,
}

impl Resolution {
    pub fn found(lyrics: String, source: impl Into<String>) -> Self {
        Self {
            lyrics: Some(lyrics),
            found: true,
            source: source.into(),
        }
    }

    pub fn not_found(source: impl Into<String>) -> Self {
        Self {
            lyrics: None,
            found: false,
            source: source.into(),
        }
    }
}

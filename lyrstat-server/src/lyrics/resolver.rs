//! Cache-first multi-source lyrics resolver
//!
//! Order for one track, short-circuiting on the first success:
//! 1. normalize the title
//! 2. lookup cache (a cached negative is a hit)
//! 3. each configured source in turn
//! 4. negative cache entry when every source came back empty
//!
//! Source failures never escape: they are logged and treated as "not found".

use std::sync::Arc;

use super::{LyricsSource, Resolution, SOURCE_CACHE, SOURCE_NONE};
use crate::analysis::AnalyzerConfig;
use crate::cache::LookupCache;

/// Resolves lyrics for single tracks; shared by every pipeline worker
pub struct LyricsResolver {
    cache: Arc<LookupCache>,
    sources: Vec<Arc<dyn LyricsSource>>,
    config: Arc<AnalyzerConfig>,
}

impl LyricsResolver {
    /// `sources` are tried in the given order
    pub fn new(
        cache: Arc<LookupCache>,
        sources: Vec<Arc<dyn LyricsSource>>,
        config: Arc<AnalyzerConfig>,
    ) -> Self {
        Self {
            cache,
            sources,
            config,
        }
    }

    pub fn source_tags(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.tag()).collect()
    }

    pub async fn resolve(&self, artist: &str, title: &str) -> Resolution {
        let cleaned = self.config.patterns.clean_title(title);

        if let Some(entry) = self.cache.get(artist, &cleaned).await {
            tracing::debug!(artist = %artist, title = %cleaned, found = entry.found, "Cache hit");
            return match entry.lyrics {
                Some(lyrics) if entry.found => Resolution::found(lyrics, SOURCE_CACHE),
                _ => Resolution::not_found(SOURCE_CACHE),
            };
        }

        for source in &self.sources {
            match source.search(artist, &cleaned).await {
                Ok(Some(lyrics)) => {
                    tracing::info!(artist = %artist, title = %cleaned, source = source.tag(), "Lyrics found");
                    self.cache
                        .set(artist, &cleaned, Some(&lyrics), source.tag(), true)
                        .await;
                    return Resolution::found(lyrics, source.tag());
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        artist = %artist,
                        title = %cleaned,
                        source = source.tag(),
                        error = %e,
                        "Lyrics source failed"
                    );
                }
            }
        }

        tracing::info!(artist = %artist, title = %cleaned, "Lyrics not found");
        self.cache.set(artist, &cleaned, None, SOURCE_NONE, false).await;
        Resolution::not_found(SOURCE_NONE)
    }
}

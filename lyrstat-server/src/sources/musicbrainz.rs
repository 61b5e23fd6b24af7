//! MusicBrainz catalog client
//!
//! Builds an artist discography from the release groups of the best-matching artist: the
//! first release of every group is expanded into its recordings and titles are deduplicated
//! by their normalized form.
//!
//! MusicBrainz allows one request per second per client; requests go through a `governor`
//! limiter and a 503 answer is retried a bounded number of times with exponential backoff.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lyrstat_common::Track;
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::{CatalogSource, SourceError};
use crate::analysis::AnalyzerConfig;

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = concat!(
    "lyrstat/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/lyrstat/lyrstat )"
);
const RELEASE_GROUP_PAGE_SIZE: usize = 100;
const MAX_RETRIES: u32 = 4;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(16);

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

#[derive(Debug, Clone, Deserialize)]
struct MbArtist {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseGroupResponse {
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<ReleaseGroup>,
    #[serde(rename = "release-group-count", default)]
    count: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseGroup {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    media: Vec<Medium>,
}

#[derive(Debug, Deserialize)]
struct Medium {
    #[serde(default)]
    tracks: Vec<MediumTrack>,
}

#[derive(Debug, Deserialize)]
struct MediumTrack {
    #[serde(default)]
    title: String,
}

/// Delay before retry number `attempt` (0-based): 2 s doubling, capped at 16 s
pub fn retry_delay(attempt: u32) -> Duration {
    INITIAL_BACKOFF
        .checked_mul(2u32.saturating_pow(attempt))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    rate_limiter: DefaultDirectRateLimiter,
    config: Arc<AnalyzerConfig>,
}

impl MusicBrainzClient {
    pub fn new(config: Arc<AnalyzerConfig>) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        // Slightly under the documented 1 req/s
        let quota = Quota::with_period(Duration::from_millis(1100))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::direct(quota),
            config,
        })
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let url = format!("{}/{}", MUSICBRAINZ_BASE_URL, path);
        let mut attempt = 0;

        loop {
            self.rate_limiter.until_ready().await;

            let response = self
                .http_client
                .get(&url)
                .header("Accept", "application/json")
                .query(params)
                .query(&[("fmt", "json")])
                .send()
                .await?;

            let status = response.status();

            if status == reqwest::StatusCode::SERVICE_UNAVAILABLE && attempt < MAX_RETRIES {
                let delay = retry_delay(attempt);
                tracing::warn!(
                    path,
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    delay_ms = delay.as_millis() as u64,
                    "MusicBrainz throttled request, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                return Err(SourceError::Upstream(format!(
                    "musicbrainz: HTTP {}",
                    status.as_u16()
                )));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| SourceError::Parse(format!("musicbrainz parse error: {}", e)));
        }
    }

    /// Best-matching artist as (id, canonical name)
    async fn find_artist(&self, name: &str) -> Result<MbArtist, SourceError> {
        let response: ArtistSearchResponse = self
            .request("artist/", &[("query", name), ("limit", "5")])
            .await?;

        let artist = response
            .artists
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Upstream(format!("artist not found: {}", name)))?;

        tracing::info!(artist = %artist.name, mbid = %artist.id, "Found MusicBrainz artist");
        Ok(artist)
    }

    async fn release_groups(&self, artist_id: &str) -> Result<Vec<ReleaseGroup>, SourceError> {
        let mut all = Vec::new();
        let limit = RELEASE_GROUP_PAGE_SIZE.to_string();
        let mut offset = 0;

        loop {
            let offset_str = offset.to_string();
            let page: ReleaseGroupResponse = self
                .request(
                    "release-group",
                    &[
                        ("artist", artist_id),
                        ("limit", limit.as_str()),
                        ("offset", offset_str.as_str()),
                    ],
                )
                .await?;

            let fetched = page.release_groups.len();
            all.extend(page.release_groups);

            if fetched == 0 || all.len() >= page.count {
                break;
            }
            offset += RELEASE_GROUP_PAGE_SIZE;
        }

        Ok(all)
    }

    /// Track titles of the first release in a release group
    async fn release_group_titles(&self, release_group_id: &str) -> Result<Vec<String>, SourceError> {
        let response: ReleaseResponse = self
            .request(
                "release",
                &[
                    ("release-group", release_group_id),
                    ("limit", "1"),
                    ("inc", "recordings"),
                ],
            )
            .await?;

        Ok(first_release_titles(response))
    }
}

fn first_release_titles(response: ReleaseResponse) -> Vec<String> {
    response
        .releases
        .into_iter()
        .next()
        .map(|release| {
            release
                .media
                .into_iter()
                .flat_map(|m| m.tracks)
                .map(|t| t.title)
                .filter(|title| !title.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Append titles not seen yet (by normalized form) until `max_tracks` is reached
fn collect_unique(
    config: &AnalyzerConfig,
    artist: &str,
    titles: Vec<String>,
    seen: &mut HashSet<String>,
    tracks: &mut Vec<Track>,
    max_tracks: usize,
) {
    for title in titles {
        if tracks.len() >= max_tracks {
            break;
        }
        let key = config.patterns.clean_title(&title).to_ascii_lowercase();
        if seen.insert(key) {
            tracks.push(Track::new(artist, title, 0));
        }
    }
}

#[async_trait]
impl CatalogSource for MusicBrainzClient {
    async fn discography(&self, artist: &str, max_tracks: usize) -> Result<Vec<Track>, SourceError> {
        let found = self.find_artist(artist).await?;
        let groups = self.release_groups(&found.id).await?;

        tracing::info!(artist = %found.name, release_groups = groups.len(), "Fetched release groups");

        let mut seen = HashSet::new();
        let mut tracks = Vec::new();

        for group in groups {
            if tracks.len() >= max_tracks {
                break;
            }

            match self.release_group_titles(&group.id).await {
                Ok(titles) => {
                    collect_unique(&self.config, &found.name, titles, &mut seen, &mut tracks, max_tracks);
                    tracing::debug!(
                        artist = %found.name,
                        release_group = %group.title,
                        unique_tracks = tracks.len(),
                        "Expanded release group"
                    );
                }
                Err(e) => {
                    tracing::warn!(release_group = %group.id, error = %e, "Skipping release group");
                }
            }
        }

        tracing::info!(artist = %found.name, unique_tracks = tracks.len(), "Discography collected");
        Ok(tracks)
    }
}

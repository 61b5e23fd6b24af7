//! Last.fm scrobble history client
//!
//! Walks `user.getrecenttracks` page by page (200 plays per page, at most 100 pages),
//! skips the now-playing row and collapses plays into ranked unique tracks.

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

use super::{rank_plays, ScrobbleHistory, ScrobbleSource, SourceError};

const LASTFM_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const USER_AGENT: &str = concat!("lyrstat/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: u32 = 200;
const MAX_PAGES: usize = 100;
const REQUESTS_PER_SECOND: u32 = 5;

#[derive(Debug, Deserialize)]
struct RecentTracksResponse {
    recenttracks: Option<RecentTracks>,
    error: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecentTracks {
    track: Option<OneOrMany>,
    #[serde(rename = "@attr")]
    attr: Option<PageAttr>,
}

/// Last.fm sends a bare object instead of an array when a page holds a single play
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<LfmTrack>),
    One(LfmTrack),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<LfmTrack> {
        match self {
            OneOrMany::Many(tracks) => tracks,
            OneOrMany::One(track) => vec![track],
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageAttr {
    #[serde(rename = "totalPages", default)]
    total_pages: String,
}

#[derive(Debug, Deserialize)]
struct LfmTrack {
    artist: LfmArtist,
    #[serde(default)]
    name: String,
    #[serde(rename = "@attr")]
    attr: Option<TrackAttr>,
}

#[derive(Debug, Deserialize)]
struct LfmArtist {
    #[serde(rename = "#text", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TrackAttr {
    nowplaying: Option<String>,
}

/// One parsed page of history
#[derive(Debug, Default, PartialEq, Eq)]
struct HistoryPage {
    plays: Vec<(String, String)>,
    total_pages: usize,
}

/// Last.fm API client
pub struct LastFmClient {
    http_client: reqwest::Client,
    api_key: String,
    rate_limiter: DefaultDirectRateLimiter,
}

impl LastFmClient {
    pub fn new(api_key: String) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        let per_second = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            api_key,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    async fn fetch_page(
        &self,
        username: &str,
        from_ts: i64,
        to_ts: i64,
        page: usize,
    ) -> Result<HistoryPage, SourceError> {
        self.rate_limiter.until_ready().await;

        let from = from_ts.to_string();
        let to = to_ts.to_string();
        let limit = PAGE_SIZE.to_string();
        let page_str = page.to_string();
        let params = [
            ("method", "user.getrecenttracks"),
            ("user", username),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
            ("from", from.as_str()),
            ("to", to.as_str()),
            ("limit", limit.as_str()),
            ("page", page_str.as_str()),
        ];

        let response = self
            .http_client
            .get(LASTFM_BASE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("lastfm request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("lastfm request failed: {}", e)))?;

        match parse_page(&body) {
            Ok(page) => Ok(page),
            // API errors come with a JSON body; anything else is reported by status
            Err(SourceError::Parse(_)) if !status.is_success() => {
                Err(SourceError::Status(status.as_u16()))
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_page(body: &str) -> Result<HistoryPage, SourceError> {
    let data: RecentTracksResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Parse(format!("lastfm parse error: {}", e)))?;

    if data.error.unwrap_or(0) != 0 {
        return Err(SourceError::Upstream(format!(
            "lastfm: {}",
            data.message.unwrap_or_default()
        )));
    }

    let Some(recent) = data.recenttracks else {
        return Err(SourceError::Parse(
            "lastfm parse error: missing recenttracks".to_string(),
        ));
    };

    let total_pages = recent
        .attr
        .map(|a| a.total_pages.parse().unwrap_or(0))
        .unwrap_or(0);

    let plays = recent
        .track
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter(|t| {
            !t.attr
                .as_ref()
                .and_then(|a| a.nowplaying.as_deref())
                .is_some_and(|v| v == "true")
        })
        .filter(|t| !t.artist.name.is_empty() && !t.name.is_empty())
        .map(|t| (t.artist.name, t.name))
        .collect();

    Ok(HistoryPage { plays, total_pages })
}

/// Convert a `YYYY-MM-DD` date to a UTC-midnight unix timestamp
pub fn date_to_timestamp(date: &str) -> Result<i64, chrono::ParseError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
    Ok(day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp())
}

#[async_trait]
impl ScrobbleSource for LastFmClient {
    async fn get_tracks(
        &self,
        username: &str,
        from: &str,
        to: &str,
        max_unique: usize,
    ) -> Result<ScrobbleHistory, SourceError> {
        let from_ts = date_to_timestamp(from)
            .map_err(|e| SourceError::Parse(format!("bad 'from' date: {}", e)))?;
        let to_ts = date_to_timestamp(to)
            .map_err(|e| SourceError::Parse(format!("bad 'to' date: {}", e)))?;

        let mut plays: Vec<(String, String)> = Vec::new();
        let mut page = 1;
        let mut total_pages = 1;

        while page <= total_pages && page <= MAX_PAGES {
            let fetched = self.fetch_page(username, from_ts, to_ts, page).await?;
            total_pages = fetched.total_pages;
            plays.extend(fetched.plays);

            tracing::info!(
                username = %username,
                page,
                total_pages,
                plays = plays.len(),
                "Fetched scrobble page"
            );
            page += 1;
        }

        let total_scrobbles = plays.len();
        let tracks = rank_plays(plays, max_unique);

        tracing::info!(
            username = %username,
            total_scrobbles,
            unique_tracks = tracks.len(),
            "Scrobble history collected"
        );

        Ok(ScrobbleHistory {
            tracks,
            total_scrobbles,
        })
    }
}

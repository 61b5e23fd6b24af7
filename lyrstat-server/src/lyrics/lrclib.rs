//! LRCLIB plain-text lyrics search

use async_trait::async_trait;
use serde::Deserialize;

use super::{LyricsSource, LYRICS_REQUEST_TIMEOUT};
use crate::sources::SourceError;

const LRCLIB_SEARCH_URL: &str = "https://lrclib.net/api/search";
const USER_AGENT: &str = concat!("lyrstat/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct LrclibRecord {
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
}

/// LRCLIB search client
pub struct LrclibSource {
    http_client: reqwest::Client,
}

impl LrclibSource {
    pub fn new() -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(LYRICS_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self { http_client })
    }
}

/// First non-empty plain-text lyrics among search results
fn first_plain_lyrics(records: Vec<LrclibRecord>) -> Option<String> {
    records
        .into_iter()
        .filter_map(|r| r.plain_lyrics)
        .find(|text| !text.is_empty())
}

#[async_trait]
impl LyricsSource for LrclibSource {
    fn tag(&self) -> &'static str {
        "lrclib"
    }

    async fn search(&self, artist: &str, title: &str) -> Result<Option<String>, SourceError> {
        let response = self
            .http_client
            .get(LRCLIB_SEARCH_URL)
            .query(&[("artist_name", artist), ("track_name", title)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let records: Vec<LrclibRecord> = response.json().await?;
        Ok(first_plain_lyrics(records))
    }
}

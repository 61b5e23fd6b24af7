//! Genius lyrics source
//!
//! Two steps: the search API yields the song page URL, then the page itself is fetched and
//! the text of its lyrics containers is extracted. The API has no lyrics endpoint.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;
use std::time::Duration;

use super::{LyricsSource, LYRICS_REQUEST_TIMEOUT};
use crate::sources::SourceError;

const GENIUS_SEARCH_URL: &str = "https://api.genius.com/search";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
const LYRICS_CONTAINER: &str = r#"div[data-lyrics-container="true"]"#;

/// Pause between the search call and the page fetch
pub const PAGE_FETCH_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    result: HitResult,
}

#[derive(Debug, Deserialize)]
struct HitResult {
    url: String,
}

/// Genius search + page scraping client
pub struct GeniusSource {
    http_client: reqwest::Client,
    token: String,
}

impl GeniusSource {
    pub fn new(token: String) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(LYRICS_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self { http_client, token })
    }

    async fn song_url(&self, artist: &str, title: &str) -> Result<Option<String>, SourceError> {
        let query = format!("{} {}", artist, title);
        let response = self
            .http_client
            .get(GENIUS_SEARCH_URL)
            .bearer_auth(&self.token)
            .query(&[("q", query.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let search: SearchResponse = response.json().await?;
        Ok(search.response.hits.into_iter().next().map(|h| h.result.url))
    }
}

/// Extract the lyrics text from a Genius song page
///
/// Every lyrics container on the page contributes its text nodes, `<br>` becomes a newline
/// and containers are separated by a newline. Returns an empty string when none are found.
pub fn parse_lyrics_page(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(LYRICS_CONTAINER) else {
        return String::new();
    };

    let mut text = String::new();

    for container in document.select(&selector) {
        // Nested containers are already covered by their outermost ancestor
        let nested = container
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| selector.matches(&ancestor));
        if nested {
            continue;
        }

        for node in container.descendants() {
            match node.value() {
                Node::Text(t) => text.push_str(t),
                Node::Element(e) if e.name() == "br" => text.push('\n'),
                _ => {}
            }
        }
        text.push('\n');
    }

    text.trim().to_string()
}

#[async_trait]
impl LyricsSource for GeniusSource {
    fn tag(&self) -> &'static str {
        "genius"
    }

    async fn search(&self, artist: &str, title: &str) -> Result<Option<String>, SourceError> {
        let Some(url) = self.song_url(artist, title).await? else {
            return Ok(None);
        };

        tokio::time::sleep(PAGE_FETCH_DELAY).await;

        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let page = response.text().await?;
        let lyrics = parse_lyrics_page(&page);

        Ok(Some(lyrics).filter(|l| !l.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lyrics_page_joins_containers() {
        let html = r#"
            <html><body>
              <div class="header">Song Title</div>
              <div data-lyrics-container="true">[Verse 1]<br/>First line<br><i>Second</i> line</div>
              <div>Ad break</div>
              <div data-lyrics-container="true">Third line<br>Fourth <a href="/x">line</a></div>
            </body></html>
        "#;

        assert_eq!(
            parse_lyrics_page(html),
            "[Verse 1]\nFirst line\nSecond line\nThird line\nFourth line"
        );
    }

    #[test]
    fn test_parse_lyrics_page_without_containers() {
        let html = "<html><body><div data-lyrics-container=\"false\">nope</div></body></html>";
        assert_eq!(parse_lyrics_page(html), "");
    }

    #[test]
    fn test_parse_lyrics_page_nested_container_counted_once() {
        let html = r#"<div data-lyrics-container="true">outer<div data-lyrics-container="true">inner</div></div>"#;
        assert_eq!(parse_lyrics_page(html), "outerinner");
    }

    #[test]
    fn test_search_response_first_hit() {
        let search: SearchResponse = serde_json::from_str(
            r#"{"meta": {"status": 200}, "response": {"hits": [
                {"type": "song", "result": {"url": "https://genius.com/a"}},
                {"type": "song", "result": {"url": "https://genius.com/b"}}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(search.response.hits[0].result.url, "https://genius.com/a");
    }
}

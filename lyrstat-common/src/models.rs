//! Shared data models
//!
//! Tracks come from the scrobble history (or an artist discography), word counts and
//! results are produced by the analysis step and served through the status endpoint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of ranked words kept in a result
pub const MAX_RANKED_WORDS: usize = 300;

/// One unique track with its play count for the requested period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub artist: String,
    pub title: String,
    pub play_count: u32,
}

impl Track {
    pub fn new(artist: impl Into<String>, title: impl Into<String>, play_count: u32) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            play_count,
        }
    }

    /// Key identifying this track in lyrics maps and word statistics
    pub fn key(&self) -> String {
        track_key(&self.artist, &self.title)
    }
}

/// Build the display key for an (artist, title) pair
pub fn track_key(artist: &str, title: &str) -> String {
    format!("{} — {}", artist, title)
}

/// Occurrence count of a single word across the resolved corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
    /// Keys of the tracks containing the word, sorted
    pub tracks: Vec<String>,
}

/// Summary of a finished analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub total_scrobbles: usize,
    pub unique_tracks: usize,
    pub lyrics_found: usize,
    pub lyrics_missing: usize,
    pub total_unique_words: usize,
    pub total_word_count: usize,
    pub words: Vec<WordCount>,
    /// Resolved lyrics by track key, only present when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<HashMap<String, String>>,
}

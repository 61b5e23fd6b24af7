//! Stop-word set
//!
//! Loaded once at startup from JSON files (each a plain array of strings) and never mutated
//! afterwards. Entries are trimmed and lower-cased.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Immutable set of lower-cased stop words
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from in-memory words
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for word in words {
            set.insert(word.as_ref());
        }
        set
    }

    /// Load every file; unreadable or malformed files are logged and skipped
    pub fn load_files(paths: &[PathBuf]) -> Self {
        let mut set = Self::default();

        for path in paths {
            match read_word_file(path) {
                Ok(words) => {
                    let before = set.len();
                    for word in &words {
                        set.insert(word);
                    }
                    tracing::info!(
                        path = %path.display(),
                        loaded = set.len() - before,
                        "Loaded stop words"
                    );
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not load stop words");
                }
            }
        }

        tracing::info!(total = set.len(), "Stop-word set ready");
        set
    }

    fn insert(&mut self, word: &str) {
        let word = word.trim().to_lowercase();
        if !word.is_empty() {
            self.words.insert(word);
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

fn read_word_file(path: &Path) -> lyrstat_common::Result<Vec<String>> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| {
        lyrstat_common::Error::InvalidInput(format!("Stop-word file is not a JSON string array: {}", e))
    })
}

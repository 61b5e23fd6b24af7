//! Word-frequency aggregation over a resolved lyrics corpus
//!
//! Pure computation: the output depends only on the corpus contents, never on map
//! iteration order, so repeated runs produce identical rankings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use lyrstat_common::models::MAX_RANKED_WORDS;
use lyrstat_common::WordCount;

use super::AnalyzerConfig;

/// Ranked words plus corpus-wide totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordStats {
    /// At most 300 words, count descending then word ascending
    pub words: Vec<WordCount>,
    /// Distinct words before truncation
    pub unique_words: usize,
    /// Word occurrences before truncation
    pub total_words: usize,
}

#[derive(Default)]
struct Tally {
    count: usize,
    tracks: BTreeSet<String>,
}

/// Count words across all tracks' lyrics
pub fn aggregate(
    lyrics_by_track: &HashMap<String, String>,
    exclude_stopwords: bool,
    config: &AnalyzerConfig,
) -> WordStats {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();

    for (track_key, text) in lyrics_by_track {
        let text = config.patterns.strip_sections(text).to_lowercase();

        for word in config.patterns.words(&text) {
            if word.chars().count() <= 1 {
                continue;
            }
            if exclude_stopwords && config.stopwords.contains(word) {
                continue;
            }

            let tally = tallies.entry(word.to_string()).or_default();
            tally.count += 1;
            if !tally.tracks.contains(track_key) {
                tally.tracks.insert(track_key.clone());
            }
        }
    }

    let unique_words = tallies.len();
    let total_words = tallies.values().map(|t| t.count).sum();

    let mut words: Vec<WordCount> = tallies
        .into_iter()
        .map(|(word, tally)| WordCount {
            word,
            count: tally.count,
            tracks: tally.tracks.into_iter().collect(),
        })
        .collect();

    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    words.truncate(MAX_RANKED_WORDS);

    WordStats {
        words,
        unique_words,
        total_words,
    }
}

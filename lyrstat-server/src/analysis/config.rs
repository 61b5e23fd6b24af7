//! Compiled text patterns and analyzer configuration

use regex::Regex;

use super::StopWords;

/// Regular expressions shared by title cleanup and lyrics tokenization
#[derive(Debug, Clone)]
pub struct TextPatterns {
    /// Parenthetical or bracketed annotation: "(Live)", "[2011 Remaster]"
    annotation: Regex,
    /// Trailing release-variant suffix: "- Remastered 2009", "- Live at Wembley"
    variant_suffix: Regex,
    /// Section markers inside lyrics: "[Chorus]", "[Verse 2: Artist]"
    section_marker: Regex,
    /// Word token: Latin or Cyrillic letters plus apostrophe
    word: Regex,
}

impl TextPatterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            annotation: Regex::new(r"\s*[\(\[].*?[\)\]]\s*")?,
            variant_suffix: Regex::new(
                r"(?i)\s*-\s*(remaster|live|demo|remix|deluxe|bonus|edit|version|mix|single|acoustic|instrumental|radio|extended|original).*",
            )?,
            section_marker: Regex::new(r"\[.*?\]")?,
            word: Regex::new(r"[a-zA-Zа-яА-ЯёЁ']+")?,
        })
    }

    /// Strip annotations and variant suffixes from a track title
    pub fn clean_title(&self, title: &str) -> String {
        let without_annotations = self.annotation.replace_all(title, " ");
        let without_suffix = self.variant_suffix.replace_all(&without_annotations, "");
        without_suffix.trim().to_string()
    }

    /// Remove section markers from a lyrics text
    pub fn strip_sections<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        self.section_marker.replace_all(text, "")
    }

    /// Iterate word tokens of an already lower-cased text
    pub fn words<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.word.find_iter(text).map(|m| m.as_str())
    }
}

/// Analyzer configuration passed explicitly to every consumer
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub patterns: TextPatterns,
    pub stopwords: StopWords,
}

impl AnalyzerConfig {
    pub fn new(stopwords: StopWords) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: TextPatterns::new()?,
            stopwords,
        })
    }
}

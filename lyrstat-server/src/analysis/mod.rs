//! Text analysis: title normalization, stop words and word-frequency aggregation
//!
//! All compiled patterns and the stop-word set live in one [`AnalyzerConfig`] value that is
//! built once at startup and handed to the resolver, the catalog client and the aggregator.

pub mod aggregator;
pub mod config;
pub mod stopwords;

pub use aggregator::{aggregate, WordStats};
pub use config::{AnalyzerConfig, TextPatterns};
pub use stopwords::StopWords;

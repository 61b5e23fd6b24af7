//! # lyrstat common library
//!
//! Shared code for the lyrstat workspace:
//! - Error and result types
//! - Configuration loading (CLI → ENV → TOML → defaults)
//! - Shared data models (tracks, word counts, analysis results)
//! - Lookup cache database initialization

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{TaskResult, Track, WordCount};

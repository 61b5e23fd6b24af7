//! Lookup cache database access

pub mod init;

pub use init::{create_lyrics_table, init_database, init_memory_database};

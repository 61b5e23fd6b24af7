//! Persistent lyrics lookup cache
//!
//! Stores the outcome of every lyrics resolution keyed by the lower-cased (artist, title)
//! pair, including negative outcomes so that failed lookups are never repeated.
//!
//! All access goes through one readers/writer lock: reads may overlap each other but never
//! a write, and writes are mutually exclusive. Callers never see a storage error; failed
//! reads are reported as misses and failed writes are logged and dropped.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tokio::sync::RwLock;

/// One cached resolution outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Normalized artist
    pub artist: String,
    /// Normalized title
    pub title: String,
    pub lyrics: Option<String>,
    pub source: String,
    pub found: bool,
    pub created_at: DateTime<Utc>,
}

/// Entry counts reported by the health endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: i64,
    pub found: i64,
}

/// Lowercase a cache key component (ASCII fold only)
pub fn normalize_key(value: &str) -> String {
    value.to_ascii_lowercase()
}

/// SQLite-backed lookup cache shared by every resolver
pub struct LookupCache {
    pool: SqlitePool,
    lock: RwLock<()>,
}

impl LookupCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            lock: RwLock::new(()),
        }
    }

    /// Open the cache file, creating it and its schema when missing
    pub async fn open(db_path: &Path) -> lyrstat_common::Result<Self> {
        let pool = lyrstat_common::db::init_database(db_path).await?;
        tracing::info!(path = %db_path.display(), "Lyrics cache initialized");
        Ok(Self::new(pool))
    }

    /// Private in-memory cache, used by tests and dry runs
    pub async fn in_memory() -> lyrstat_common::Result<Self> {
        let pool = lyrstat_common::db::init_memory_database().await?;
        Ok(Self::new(pool))
    }

    /// Look up a cached outcome
    pub async fn get(&self, artist: &str, title: &str) -> Option<CacheEntry> {
        let _guard = self.lock.read().await;

        let row = sqlx::query(
            "SELECT artist, title, lyrics, source, found, created_at FROM lyrics WHERE artist = ? AND title = ?",
        )
        .bind(normalize_key(artist))
        .bind(normalize_key(title))
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some(row)) => {
                let created_at: String = row.get("created_at");
                Some(CacheEntry {
                    artist: row.get("artist"),
                    title: row.get("title"),
                    lyrics: row.get("lyrics"),
                    source: row.get::<Option<String>, _>("source").unwrap_or_default(),
                    found: row.get::<i64, _>("found") == 1,
                    created_at: parse_timestamp(&created_at),
                })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(artist = %artist, title = %title, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Store an outcome, replacing any previous entry for the same key
    pub async fn set(
        &self,
        artist: &str,
        title: &str,
        lyrics: Option<&str>,
        source: &str,
        found: bool,
    ) {
        let artist = normalize_key(artist);
        let title = normalize_key(title);
        let created_at = Utc::now().to_rfc3339();

        let _guard = self.lock.write().await;

        let result = sqlx::query(
            r#"
            INSERT INTO lyrics (artist, title, lyrics, source, found, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(artist, title) DO UPDATE SET
                lyrics = excluded.lyrics,
                source = excluded.source,
                found = excluded.found,
                created_at = excluded.created_at
            "#,
        )
        .bind(&artist)
        .bind(&title)
        .bind(lyrics)
        .bind(source)
        .bind(found as i64)
        .bind(&created_at)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!(artist = %artist, title = %title, error = %e, "Cache write failed");
        }
    }

    /// Count all entries and positive entries
    pub async fn stats(&self) -> CacheStats {
        let _guard = self.lock.read().await;

        let result = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN found = 1 THEN 1 ELSE 0 END), 0) FROM lyrics",
        )
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((total, found)) => CacheStats { total, found },
            Err(e) => {
                tracing::warn!(error = %e, "Cache stats query failed");
                CacheStats::default()
            }
        }
    }

    /// Release the underlying connections
    pub async fn close(&self) {
        let _guard = self.lock.write().await;
        self.pool.close().await;
        tracing::info!("Lyrics cache closed");
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    // Rows created with the column default use SQLite's datetime('now') format
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => naive.and_utc(),
        Err(_) => {
            tracing::debug!(created_at = %raw, "Unparseable cache timestamp");
            DateTime::<Utc>::default()
        }
    }
}

//! Background analysis runner
//!
//! Admits jobs into the registry and drives each admitted run through the task state machine
//! on its own tokio task. Failures end the run in the `error` phase; nothing is retried.

use lyrstat_common::{TaskResult, Track};
use std::sync::Arc;

use super::fingerprint;
use super::registry::{Admission, RegistryFull, TaskRegistry};
use super::status::TaskPhase;
use crate::analysis::{aggregate, AnalyzerConfig};
use crate::lyrics::{fetch_all, LyricsResolver};
use crate::sources::{CatalogSource, ScrobbleSource, SourceError};

pub const NO_TRACKS_MESSAGE: &str = "no tracks found";
pub const NO_LYRICS_MESSAGE: &str = "no lyrics found for any track";

/// Where the track list of a job comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSubject {
    /// A user's listening history between two `YYYY-MM-DD` dates
    Scrobbles {
        username: String,
        from: String,
        to: String,
    },
    /// An artist's discography
    Discography { artist: String },
}

/// One analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisJob {
    pub subject: JobSubject,
    pub max_tracks: usize,
    pub exclude_stop_words: bool,
    pub include_lyrics: bool,
}

impl AnalysisJob {
    /// Task id shared by every request for the same subject
    pub fn fingerprint(&self) -> String {
        match &self.subject {
            JobSubject::Scrobbles { username, from, to } => {
                fingerprint(&[username.as_str(), from.as_str(), to.as_str()])
            }
            JobSubject::Discography { artist } => {
                let name = artist.trim().to_lowercase();
                fingerprint(&["artist", name.as_str()])
            }
        }
    }
}

/// Answer to a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub task_id: String,
    pub already_running: bool,
}

pub struct AnalysisRunner {
    registry: Arc<TaskRegistry>,
    resolver: Arc<LyricsResolver>,
    scrobbles: Arc<dyn ScrobbleSource>,
    catalog: Option<Arc<dyn CatalogSource>>,
    config: Arc<AnalyzerConfig>,
    workers: usize,
}

impl AnalysisRunner {
    pub fn new(
        registry: Arc<TaskRegistry>,
        resolver: Arc<LyricsResolver>,
        scrobbles: Arc<dyn ScrobbleSource>,
        catalog: Option<Arc<dyn CatalogSource>>,
        config: Arc<AnalyzerConfig>,
        workers: usize,
    ) -> Self {
        Self {
            registry,
            resolver,
            scrobbles,
            catalog,
            config,
            workers: workers.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    /// Admit a job and start it in the background unless the same job is already running
    pub fn submit(self: &Arc<Self>, job: AnalysisJob) -> Result<Submission, RegistryFull> {
        let task_id = job.fingerprint();

        match self.registry.admit(&task_id)? {
            Admission::AlreadyRunning => {
                tracing::info!(task_id = %task_id, "Analysis already running");
                Ok(Submission {
                    task_id,
                    already_running: true,
                })
            }
            Admission::Started { run } => {
                tracing::info!(task_id = %task_id, run, subject = ?job.subject, "Analysis admitted");

                let runner = Arc::clone(self);
                let id = task_id.clone();
                tokio::spawn(async move {
                    runner.run(&id, run, job).await;
                });

                Ok(Submission {
                    task_id,
                    already_running: false,
                })
            }
        }
    }

    /// Drive one admitted run to a terminal phase
    ///
    /// Stops early, without touching the task, once a newer run of the same id has been admitted.
    pub async fn run(&self, task_id: &str, run: u64, job: AnalysisJob) {
        let set_phase = |phase: TaskPhase| {
            self.registry.update(task_id, run, |s| {
                s.advance(phase);
            })
        };
        let fail = |message: String| {
            tracing::warn!(task_id = %task_id, error = %message, "Analysis failed");
            self.registry.update(task_id, run, |s| {
                s.fail(message);
            });
        };

        let superseded = || {
            tracing::info!(task_id = %task_id, run, "Run superseded, stopping");
        };

        if !set_phase(TaskPhase::Tracks) {
            superseded();
            return;
        }

        let (tracks, total_scrobbles) = match self.collect_tracks(&job).await {
            Ok(collected) => collected,
            Err(e) => {
                fail(e.to_string());
                return;
            }
        };

        if tracks.is_empty() {
            fail(NO_TRACKS_MESSAGE.to_string());
            return;
        }

        let total_tracks = tracks.len();
        let current = self.registry.update(task_id, run, |s| {
            s.total_tracks = total_tracks;
            s.advance(TaskPhase::Lyrics);
        });
        if !current {
            superseded();
            return;
        }
        tracing::info!(task_id = %task_id, tracks = total_tracks, "Resolving lyrics");

        let lyrics = fetch_all(&self.resolver, &tracks, self.workers, |processed, found, current| {
            self.registry.update(task_id, run, |s| {
                s.record_progress(processed, found, current);
            });
        })
        .await;

        tracing::info!(task_id = %task_id, found = lyrics.len(), tracks = total_tracks, "Lyrics resolved");

        if lyrics.is_empty() {
            fail(NO_LYRICS_MESSAGE.to_string());
            return;
        }

        if !set_phase(TaskPhase::Analyzing) {
            superseded();
            return;
        }

        let stats = aggregate(&lyrics, job.exclude_stop_words, &self.config);

        if let Some(top) = stats.words.first() {
            tracing::info!(task_id = %task_id, top_word = %top.word, count = top.count, "Analysis done");
        }

        let result = TaskResult {
            total_scrobbles,
            unique_tracks: total_tracks,
            lyrics_found: lyrics.len(),
            lyrics_missing: total_tracks - lyrics.len(),
            total_unique_words: stats.unique_words,
            total_word_count: stats.total_words,
            words: stats.words,
            lyrics: job.include_lyrics.then_some(lyrics),
        };

        self.registry.update(task_id, run, |s| {
            s.complete(result);
        });
    }

    async fn collect_tracks(&self, job: &AnalysisJob) -> Result<(Vec<Track>, usize), SourceError> {
        match &job.subject {
            JobSubject::Scrobbles { username, from, to } => {
                let history = self
                    .scrobbles
                    .get_tracks(username, from, to, job.max_tracks)
                    .await?;
                Ok((history.tracks, history.total_scrobbles))
            }
            JobSubject::Discography { artist } => {
                let catalog = self.catalog.as_ref().ok_or_else(|| {
                    SourceError::Config("artist catalog source not configured".to_string())
                })?;
                let tracks = catalog.discography(artist, job.max_tracks).await?;
                Ok((tracks, 0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrobble_job(username: &str) -> AnalysisJob {
        AnalysisJob {
            subject: JobSubject::Scrobbles {
                username: username.to_string(),
                from: "2026-02-02".to_string(),
                to: "2026-02-12".to_string(),
            },
            max_tracks: 500,
            exclude_stop_words: true,
            include_lyrics: false,
        }
    }

    #[test]
    fn test_job_fingerprint_ignores_options() {
        let mut a = scrobble_job("alice");
        let b = scrobble_job("alice");
        a.max_tracks = 10;
        a.include_lyrics = true;

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), scrobble_job("bob").fingerprint());
    }

    #[test]
    fn test_artist_fingerprint_case_insensitive() {
        let job = |artist: &str| AnalysisJob {
            subject: JobSubject::Discography {
                artist: artist.to_string(),
            },
            max_tracks: 100,
            exclude_stop_words: true,
            include_lyrics: false,
        };

        assert_eq!(job("Radiohead").fingerprint(), job(" radiohead ").fingerprint());
        assert_ne!(job("Radiohead").fingerprint(), job("Portishead").fingerprint());
    }
}

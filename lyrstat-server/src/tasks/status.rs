//! Task lifecycle state machine
//!
//! `pending → tracks → lyrics → analyzing → done`, with `error` reachable from any of the
//! working phases. `done` and `error` are terminal.

use lyrstat_common::TaskResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Phase of an analysis task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    /// Admitted, runner not started yet
    Pending,
    /// Fetching the track list
    Tracks,
    /// Resolving lyrics
    Lyrics,
    /// Counting words
    Analyzing,
    Done,
    Error,
}

impl TaskPhase {
    /// A run is in progress; resubmissions are rejected
    pub fn is_active(self) -> bool {
        matches!(self, TaskPhase::Tracks | TaskPhase::Lyrics | TaskPhase::Analyzing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskPhase::Done | TaskPhase::Error)
    }

    pub fn can_advance_to(self, next: TaskPhase) -> bool {
        use TaskPhase::*;
        matches!(
            (self, next),
            (Pending, Tracks)
                | (Tracks, Lyrics)
                | (Lyrics, Analyzing)
                | (Analyzing, Done)
                | (Tracks | Lyrics | Analyzing, Error)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPhase::Pending => "pending",
            TaskPhase::Tracks => "tracks",
            TaskPhase::Lyrics => "lyrics",
            TaskPhase::Analyzing => "analyzing",
            TaskPhase::Done => "done",
            TaskPhase::Error => "error",
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pollable status of one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub id: String,
    pub phase: TaskPhase,
    /// 0-100
    pub progress: u32,
    pub current_track: String,
    pub total_tracks: usize,
    pub processed_tracks: usize,
    pub lyrics_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    /// When a terminal phase was reached
    #[serde(skip)]
    pub finished_at: Option<Instant>,
}

impl TaskStatus {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phase: TaskPhase::Pending,
            progress: 0,
            current_track: String::new(),
            total_tracks: 0,
            processed_tracks: 0,
            lyrics_found: 0,
            error: None,
            result: None,
            finished_at: None,
        }
    }

    /// Move to `next`; illegal transitions are refused and leave the status unchanged
    pub fn advance(&mut self, next: TaskPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            tracing::warn!(
                task_id = %self.id,
                from = %self.phase,
                to = %next,
                "Refusing illegal task transition"
            );
            return false;
        }

        self.phase = next;
        if next.is_terminal() {
            self.finished_at = Some(Instant::now());
        }
        true
    }

    /// Terminate with an error message
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.advance(TaskPhase::Error) {
            return false;
        }
        self.error = Some(message.into());
        true
    }

    /// Apply one pipeline progress event
    ///
    /// Counters are clamped so that `lyrics_found <= processed_tracks <= total_tracks` holds
    /// and `progress` is always `processed_tracks * 100 / total_tracks`.
    pub fn record_progress(&mut self, processed: usize, found: usize, current: &str) {
        self.processed_tracks = processed.min(self.total_tracks);
        self.lyrics_found = found.min(self.processed_tracks);
        self.progress = if self.total_tracks > 0 {
            (self.processed_tracks * 100 / self.total_tracks) as u32
        } else {
            0
        };
        self.current_track = current.to_string();
    }

    /// Finish with a result
    pub fn complete(&mut self, result: TaskResult) -> bool {
        if !self.advance(TaskPhase::Done) {
            return false;
        }
        self.progress = 100;
        self.result = Some(result);
        true
    }
}

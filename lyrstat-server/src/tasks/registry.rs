//! In-memory task registry
//!
//! Holds one [`TaskStatus`] per fingerprint. Admission (check + replace-or-create) and every
//! later mutation happen under the registry's own lock, through [`TaskRegistry::admit`] and
//! [`TaskRegistry::update`] only.
//!
//! Each admission gets a run number. Updates carry the run number they belong to, so a run
//! whose entry has since been replaced can no longer touch the new one.
//!
//! Terminal entries older than the configured TTL are evicted on admission; when the registry
//! is still at capacity afterwards, admission fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::status::TaskStatus;

/// Outcome of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Fresh entry created; the caller must start run `run`
    Started { run: u64 },
    /// A run with the same fingerprint is in progress
    AlreadyRunning,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Too many tasks in progress ({capacity}), try again later")]
pub struct RegistryFull {
    pub capacity: usize,
}

struct Entry {
    run: u64,
    status: TaskStatus,
}

pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, Entry>>,
    next_run: AtomicU64,
    ttl: Duration,
    capacity: usize,
}

impl TaskRegistry {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_run: AtomicU64::new(1),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Admit a request under `id`
    ///
    /// An existing entry in an active phase is kept and reported as already running; any other
    /// existing entry is replaced by a fresh pending one.
    pub fn admit(&self, id: &str) -> Result<Admission, RegistryFull> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = tasks.get(id) {
            if existing.status.phase.is_active() {
                return Ok(Admission::AlreadyRunning);
            }
        }

        if !tasks.contains_key(id) && tasks.len() >= self.capacity {
            let evicted = evict_expired(&mut tasks, self.ttl, Instant::now());
            if evicted > 0 {
                tracing::info!(evicted, remaining = tasks.len(), "Evicted finished tasks");
            }
            if tasks.len() >= self.capacity {
                tracing::warn!(capacity = self.capacity, "Task registry full");
                return Err(RegistryFull {
                    capacity: self.capacity,
                });
            }
        }

        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        tasks.insert(
            id.to_string(),
            Entry {
                run,
                status: TaskStatus::new(id),
            },
        );

        Ok(Admission::Started { run })
    }

    /// Mutate the status of run `run` of task `id`
    ///
    /// Returns false when the task is gone or has been replaced by a newer run.
    pub fn update<F>(&self, id: &str, run: u64, f: F) -> bool
    where
        F: FnOnce(&mut TaskStatus),
    {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        match tasks.get_mut(id) {
            Some(entry) if entry.run == run => {
                f(&mut entry.status);
                true
            }
            _ => {
                tracing::debug!(task_id = %id, run, "Dropping update for superseded run");
                false
            }
        }
    }

    /// Snapshot of a task's status
    pub fn get(&self, id: &str) -> Option<TaskStatus> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        tasks.get(id).map(|e| e.status.clone())
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop terminal entries older than the TTL
    pub fn evict_expired(&self) -> usize {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        evict_expired(&mut tasks, self.ttl, Instant::now())
    }
}

fn evict_expired(tasks: &mut HashMap<String, Entry>, ttl: Duration, now: Instant) -> usize {
    let before = tasks.len();
    tasks.retain(|_, entry| match entry.status.finished_at {
        Some(finished) if entry.status.phase.is_terminal() => {
            now.saturating_duration_since(finished) < ttl
        }
        _ => true,
    });
    before - tasks.len()
}

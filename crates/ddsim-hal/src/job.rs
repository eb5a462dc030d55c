//! Job lifecycle types.
//!
//! The job state machine:
//!
//! ```text
//!   new() ──→ Created ──submit()──→ Submitted ──→ Completed
//! ```
//!
//! **Invariants:**
//! - Work runs synchronously inside `submit()`; there is no failed state.
//!   An error raised by the work is stored and returned from `result()`.
//! - `result()` runs the work first if the job was never submitted.
//! - Transitions are monotonic and submitting a completed job is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::error::HalError;

/// Unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a fresh random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job holds its work but has not run it.
    Created,
    /// Job is running its work.
    Submitted,
    /// Work finished; the outcome is available.
    Completed,
}

impl JobStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "Created"),
            JobStatus::Submitted => write!(f, "Submitted"),
            JobStatus::Completed => write!(f, "Completed"),
        }
    }
}

type Work<T, E> = Box<dyn FnOnce(JobId) -> Result<T, E> + Send>;

enum JobState<T, E> {
    Pending(Work<T, E>),
    Finished(Result<T, E>),
}

/// A deferred-result handle over synchronous work.
///
/// The work closure receives the job's ID so results can refer back to it.
pub struct Job<T, E = HalError> {
    id: JobId,
    status: JobStatus,
    state: JobState<T, E>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl<T, E> Job<T, E> {
    /// Create a job holding `work`.
    pub fn new(work: impl FnOnce(JobId) -> Result<T, E> + Send + 'static) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Created,
            state: JobState::Pending(Box::new(work)),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// The job identifier.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Whether the outcome is available.
    pub fn done(&self) -> bool {
        self.status.is_terminal()
    }

    /// Time the job was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time the work finished.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Run the work. A job that already ran is returned unchanged.
    #[must_use]
    pub fn submit(mut self) -> Self {
        if let JobState::Pending(work) = self.state {
            self.status = JobStatus::Submitted;
            debug!("Running job {}", self.id);
            self.state = JobState::Finished(work(self.id));
            self.status = JobStatus::Completed;
            self.completed_at = Some(Utc::now());
            debug!("Job {} completed", self.id);
        }
        self
    }

    /// Complete the job if needed and return its outcome.
    pub fn result(self) -> Result<T, E> {
        match self.state {
            JobState::Pending(work) => {
                debug!("Running job {} on result()", self.id);
                work(self.id)
            }
            JobState::Finished(outcome) => outcome,
        }
    }
}

impl<T, E> fmt::Debug for Job<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_job_lifecycle() {
        let job: Job<u32> = Job::new(|_| Ok(42));
        assert_eq!(job.status(), JobStatus::Created);
        assert!(!job.done());
        assert!(job.completed_at().is_none());

        let job = job.submit();
        assert_eq!(job.status(), JobStatus::Completed);
        assert!(job.completed_at().is_some());
        assert_eq!(job.result().unwrap(), 42);
    }

    #[test]
    fn test_result_submits_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let job: Job<(), HalError> = Job::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let job = job.submit().submit();
        job.result().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_surfaces_from_result() {
        let job: Job<(), HalError> =
            Job::new(|_| Err(HalError::SimulationFailure("engine crashed".into())));
        let err = job.result().unwrap_err();
        assert!(matches!(err, HalError::SimulationFailure(_)));
    }

    #[test]
    fn test_work_sees_job_id() {
        let job: Job<JobId> = Job::new(Ok);
        let id = job.id();
        assert_eq!(job.result().unwrap(), id);
    }
}

//! Job — one asynchronous execution of an [`ExecutionPlan`].

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use queue::{EventBus, Subscription};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

use crate::events::JobEvent;
use crate::scheduler::ExecutionPlan;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Globally unique job identifier, generated at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a job.
///
/// `pending → running → completed | errored`, with `cancelling → cancelled`
/// reachable from either non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Cancelling,
    Cancelled,
    Completed,
    Errored,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Errored)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobInfo
// ---------------------------------------------------------------------------

/// Point-in-time snapshot of a job, for polling callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub id: JobId,
    pub flow_id: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Events emitted so far.
    pub events: usize,
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Finished {
    at: DateTime<Utc>,
    instant: Instant,
}

/// A single execution instance of a flow.
///
/// Owned by the [`JobRegistry`](crate::JobRegistry); written only by its
/// [`JobExecutor`](crate::JobExecutor), apart from the cancellation request.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    plan: Arc<ExecutionPlan>,
    status: watch::Sender<JobStatus>,
    bus: EventBus<JobEvent>,
    submitted_at: DateTime<Utc>,
    finished: Mutex<Option<Finished>>,
}

impl Job {
    /// A new `pending` job with a fresh identifier.
    pub fn new(plan: Arc<ExecutionPlan>, event_buffer: usize) -> Self {
        let (status, _) = watch::channel(JobStatus::Pending);
        Self {
            id: JobId::new(),
            plan,
            status,
            bus: EventBus::new(event_buffer),
            submitted_at: Utc::now(),
            finished: Mutex::new(None),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn plan(&self) -> &Arc<ExecutionPlan> {
        &self.plan
    }

    pub fn flow_id(&self) -> &str {
        &self.plan.flow().id
    }

    pub fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.status() == JobStatus::Cancelling
    }

    /// Replay the job's events from the first one.
    pub fn subscribe(&self) -> Subscription<JobEvent> {
        self.bus.subscribe()
    }

    /// Resume the job's events from `offset`. An offset past the current end
    /// waits for that event to be emitted.
    pub fn subscribe_from(&self, offset: usize) -> Subscription<JobEvent> {
        self.bus.subscribe_from(offset)
    }

    /// Number of readers currently attached to the event stream.
    pub fn reader_count(&self) -> usize {
        self.bus.reader_count()
    }

    /// Attached readers that have not yet received every emitted event.
    pub fn undrained_reader_count(&self) -> usize {
        self.bus.undrained_reader_count()
    }

    /// Resolve once the job reaches a terminal status. The `end` event may
    /// still be on its way to the event stream.
    pub async fn wait_finished(&self) -> JobStatus {
        let mut rx = self.status.subscribe();
        // Copy out of the `watch::Ref` before `rx` goes out of scope.
        let terminal = rx.wait_for(|s| s.is_terminal()).await.map(|status| *status);
        // The sender lives as long as `self`, so the error arm is only a fallback.
        terminal.unwrap_or_else(|_| self.status())
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            id: self.id,
            flow_id: self.flow_id().to_owned(),
            status: self.status(),
            submitted_at: self.submitted_at,
            finished_at: self.finished().map(|f| f.at),
            events: self.bus.len(),
        }
    }

    /// Whether the job finished, closed its event stream, and did so at least
    /// `retention` ago.
    pub(crate) fn expired(&self, now: Instant, retention: std::time::Duration) -> bool {
        self.bus.is_closed()
            && self
                .finished()
                .is_some_and(|f| now.saturating_duration_since(f.instant) >= retention)
    }

    /// `pending`/`running` → `cancelling`. Returns whether this call changed
    /// the status; any other state is left alone.
    pub(crate) fn request_cancel(&self) -> bool {
        self.status.send_if_modified(|status| match status {
            JobStatus::Pending | JobStatus::Running => {
                *status = JobStatus::Cancelling;
                true
            }
            _ => false,
        })
    }

    /// `pending` → `running`; a cancellation requested before the executor
    /// started is preserved.
    pub(crate) fn mark_running(&self) {
        self.status.send_if_modified(|status| {
            if *status == JobStatus::Pending {
                *status = JobStatus::Running;
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn bus(&self) -> &EventBus<JobEvent> {
        &self.bus
    }

    /// Record the terminal status and finish time. Called before `end` is
    /// emitted, so a reader that has seen `end` never observes a live status.
    pub(crate) fn set_terminal(&self, terminal: JobStatus) {
        debug_assert!(terminal.is_terminal());
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner) = Some(Finished {
            at: Utc::now(),
            instant: Instant::now(),
        });
        self.status.send_replace(terminal);
    }

    /// Close the event stream once `end` has been emitted.
    pub(crate) fn close_events(&self) {
        self.bus.close();
    }

    fn finished(&self) -> Option<Finished> {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Flow, Vertex};

    fn job() -> Job {
        let plan = ExecutionPlan::new(Flow::new("f", vec![Vertex::new("a", "mock")], vec![]))
            .unwrap();
        Job::new(Arc::new(plan), 8)
    }

    #[test]
    fn new_job_is_pending_with_unique_id() {
        let (a, b) = (job(), job());
        assert_eq!(a.status(), JobStatus::Pending);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.info().finished_at, None);
        assert_eq!(a.flow_id(), "f");
    }

    #[test]
    fn cancel_request_only_moves_live_jobs() {
        let job = job();
        assert!(job.request_cancel());
        assert_eq!(job.status(), JobStatus::Cancelling);
        assert!(!job.request_cancel(), "second request is a no-op");

        job.mark_running();
        assert_eq!(job.status(), JobStatus::Cancelling, "running must not clear a cancel");

        job.set_terminal(JobStatus::Cancelled);
        job.close_events();
        assert!(!job.request_cancel());
        assert_eq!(job.status(), JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn wait_finished_resolves_with_terminal_status() {
        let job = Arc::new(job());
        let waiter = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.wait_finished().await })
        };

        job.mark_running();
        job.set_terminal(JobStatus::Completed);

        assert_eq!(waiter.await.unwrap(), JobStatus::Completed);
        assert!(job.info().finished_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn job_expires_only_after_its_stream_closes() {
        let job = job();
        job.set_terminal(JobStatus::Completed);

        tokio::time::advance(std::time::Duration::from_secs(5)).await;
        let retention = std::time::Duration::from_secs(1);
        assert!(!job.expired(Instant::now(), retention), "`end` not emitted yet");

        job.close_events();
        assert!(job.expired(Instant::now(), retention));
    }

    #[test]
    fn status_serialises_snake_case() {
        assert_eq!(
            serde_json::to_value(JobStatus::Cancelling).unwrap(),
            serde_json::json!("cancelling")
        );
        assert_eq!(JobStatus::Errored.to_string(), "errored");
    }

    #[test]
    fn job_id_round_trips_through_display() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }
}

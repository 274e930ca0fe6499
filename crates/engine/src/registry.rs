//! Job registry — the process-wide table of live and recently finished jobs.
//!
//! All mutation (creation, eviction) goes through one mutex. Cancellation
//! requests only read the table and then act on the job itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::job::{Job, JobId};
use crate::scheduler::ExecutionPlan;

/// Maps job IDs to jobs and owns their retention.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Arc<Job>>>,
    retention: Duration,
    event_buffer: usize,
}

impl JobRegistry {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            retention: config.retention,
            event_buffer: config.event_buffer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Arc<Job>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new `pending` job for `plan`. Expired jobs are swept first.
    pub fn create(&self, plan: Arc<ExecutionPlan>) -> Arc<Job> {
        let job = Arc::new(Job::new(plan, self.event_buffer));

        let mut jobs = self.lock();
        Self::sweep(&mut jobs, Instant::now(), self.retention);
        jobs.insert(job.id(), Arc::clone(&job));

        debug!(job_id = %job.id(), live = jobs.len(), "job registered");
        job
    }

    /// Look a job up.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted ID.
    pub fn get(&self, id: JobId) -> Result<Arc<Job>, EngineError> {
        self.lock().get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Ask a job to stop at its next vertex boundary.
    ///
    /// Returns `true` if this call moved the job to `cancelling`; `false` if
    /// it was already cancelling or finished (a no-op, not an error).
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown or evicted ID.
    pub fn request_cancel(&self, id: JobId) -> Result<bool, EngineError> {
        let job = self.get(id)?;
        let changed = job.request_cancel();
        if changed {
            info!(job_id = %id, "cancellation requested");
        } else {
            debug!(job_id = %id, status = %job.status(), "cancellation request ignored");
        }
        Ok(changed)
    }

    /// Drop finished jobs past the retention window whose readers, if any,
    /// have all received `end`. Returns the number evicted.
    ///
    /// A reader still holding its subscription keeps working after eviction;
    /// only new lookups fail.
    pub fn evict_expired(&self) -> usize {
        Self::sweep(&mut self.lock(), Instant::now(), self.retention)
    }

    fn sweep(jobs: &mut HashMap<JobId, Arc<Job>>, now: Instant, retention: Duration) -> usize {
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.expired(now, retention) && job.undrained_reader_count() == 0)
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            debug!(evicted, remaining = jobs.len(), "evicted expired jobs");
        }
        evicted
    }

    /// Sweep every `interval`, forever. Spawn it and abort the handle to stop.
    pub async fn run_reaper(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.evict_expired();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.lock().keys().copied().collect()
    }
}

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::stream::{FuturesOrdered, StreamExt};
use uuid::Uuid;

use crate::core::context::{Context, NodeValue};
use crate::core::dsl::Namespace;
use crate::core::executor::Executor;

use super::{Job, JobError, JobSource};

#[derive(Debug)]
pub enum JobOutcome {
    Performed(Context),
    Cancelled,
}

/// Performs queued jobs against the steps of a namespace.
#[derive(Clone)]
pub struct JobWorker {
    namespace: Namespace,
    executor: Executor,
    cancelled: Arc<Mutex<HashSet<Uuid>>>,
}

impl JobWorker {
    pub fn new(namespace: &Namespace, executor: Executor) -> Self {
        Self {
            namespace: namespace.clone(),
            executor,
            cancelled: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Marks a job so it is skipped when its turn comes.
    pub fn cancel(&self, id: Uuid) {
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.insert(id);
        }
    }

    pub fn is_cancelled(&self, id: Uuid) -> bool {
        self.cancelled
            .lock()
            .map(|cancelled| cancelled.contains(&id))
            .unwrap_or(false)
    }

    fn take_cancelled(&self, id: Uuid) -> bool {
        self.cancelled
            .lock()
            .map(|mut cancelled| cancelled.remove(&id))
            .unwrap_or(false)
    }

    /// Runs the job's step strictly, on a blocking task. A cancelled job is
    /// skipped once and forgotten.
    pub async fn perform(&self, job: Job) -> Result<JobOutcome, JobError> {
        if self.take_cancelled(job.id) {
            log::warn!("job {} for {} was cancelled", job.id, job.step);
            return Ok(JobOutcome::Cancelled);
        }

        let step = self
            .namespace
            .get(&job.step)
            .ok_or_else(|| JobError::UnknownStep(job.step.clone()))?;
        let executor = self.executor.clone();
        let ctx = Context::from_json(NodeValue::Object(job.args));

        match tokio::task::spawn_blocking(move || executor.call_strict(&step, ctx)).await {
            Ok(result) => Ok(JobOutcome::Performed(result?)),
            Err(join_error) => {
                log::error!("job {} panicked: {:?}", job.id, join_error);
                Err(JobError::Panicked {
                    id: job.id,
                    message: join_error.to_string(),
                })
            }
        }
    }

    /// Takes every job currently queued in `source` and performs them
    /// concurrently. Results come back in queue order.
    pub async fn drain<S: JobSource>(&self, source: &mut S) -> Vec<Result<JobOutcome, JobError>> {
        let mut jobs = Vec::new();
        while let Some(job) = source.next_job().await {
            jobs.push(job);
        }
        log::info!("draining {} job(s)", jobs.len());

        let mut pending: FuturesOrdered<_> = jobs.into_iter().map(|job| self.perform(job)).collect();
        let mut outcomes = Vec::new();
        while let Some(outcome) = pending.next().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Job, JobError, JobSink, JobSource};

/// Unbounded in-process queue. Cheap to clone; every clone feeds the same
/// [`QueueReceiver`].
#[derive(Clone)]
pub struct InMemoryQueue {
    sender: mpsc::UnboundedSender<Job>,
}

pub struct QueueReceiver {
    receiver: mpsc::UnboundedReceiver<Job>,
}

impl InMemoryQueue {
    pub fn channel() -> (InMemoryQueue, QueueReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (InMemoryQueue { sender }, QueueReceiver { receiver })
    }
}

impl JobSink for InMemoryQueue {
    fn enqueue(&self, job: Job) -> Result<(), JobError> {
        log::debug!("enqueueing job {} for {}", job.id, job.step);
        self.sender.send(job).map_err(|_| JobError::QueueClosed)
    }
}

impl QueueReceiver {
    /// Waits for the next job. `None` once every queue handle is dropped.
    pub async fn recv(&mut self) -> Option<Job> {
        self.receiver.recv().await
    }

    /// The next job if one is queued, without waiting.
    pub fn try_next(&mut self) -> Option<Job> {
        self.receiver.try_recv().ok()
    }
}

#[async_trait]
impl JobSource for QueueReceiver {
    async fn next_job(&mut self) -> Option<Job> {
        self.try_next()
    }
}

//! Background execution of steps.
//!
//! A [`JobMaker`] registers an `Async` sibling of a step. Running the sibling
//! inside a chain enqueues a [`Job`] into a [`JobSink`] instead of doing the
//! work; a [`JobWorker`] later pulls jobs from a [`JobSource`] and performs
//! them. Steps after the `Async` sibling cannot rely on its results.

pub mod options;
pub mod queue;
pub mod worker;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::context::{Context, NodeValue};
use crate::core::dsl::Namespace;
use crate::core::error::{DefinitionError, StepError, StepResult};
use crate::core::executor::Invoker;
use crate::core::step::leaf::StepLogic;
use crate::core::Step;

pub use options::JobOptions;
pub use queue::{InMemoryQueue, QueueReceiver};
pub use worker::{JobOutcome, JobWorker};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("the job queue is closed")]
    QueueClosed,

    #[error("no step named `{0}` is registered")]
    UnknownStep(String),

    #[error("job {id} panicked: {message}")]
    Panicked { id: Uuid, message: String },

    #[error(transparent)]
    Step(#[from] StepError),
}

/// One queued invocation of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    /// Fully qualified name of the step to perform.
    pub step: String,
    pub args: serde_json::Map<String, NodeValue>,
    pub options: JobOptions,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn new(step: impl Into<String>, args: serde_json::Map<String, NodeValue>, options: JobOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            step: step.into(),
            args,
            options,
            enqueued_at: Utc::now(),
        }
    }
}

/// Where enqueued jobs go.
pub trait JobSink: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<(), JobError>;
}

/// Where workers take jobs from.
#[async_trait]
pub trait JobSource: Send {
    /// The next queued job, or `None` when nothing is queued right now.
    async fn next_job(&mut self) -> Option<Job>;
}

/// Builds the job-enqueueing sibling of a step.
pub struct JobMaker {
    target: Step,
    options: JobOptions,
    sink: Arc<dyn JobSink>,
}

impl JobMaker {
    pub fn new(target: &Step, sink: Arc<dyn JobSink>) -> Self {
        Self {
            target: target.clone(),
            options: JobOptions::new(),
            sink,
        }
    }

    pub fn options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    /// `<Target>::Job<suffix>`, the name jobs are tagged with.
    pub fn job_name(&self) -> String {
        format!("{}::Job{}", self.target.name(), self.options.suffix())
    }

    /// `<Target>::Async<suffix>`.
    pub fn async_name(&self) -> String {
        format!("{}::Async{}", self.target.name(), self.options.suffix())
    }

    /// Registers the `Async` sibling in `namespace`.
    #[track_caller]
    pub fn async_step(&self, namespace: &Namespace) -> Result<Step, DefinitionError> {
        namespace
            .leaf(&self.async_name())
            .logic(Dispatch {
                target: self.target.name().to_string(),
                keys: payload_keys(&self.target),
                options: self.options.clone(),
                sink: Arc::clone(&self.sink),
            })
            .build()
    }

    /// The context fields a job for the target carries.
    pub fn args(&self, ctx: &Context) -> serde_json::Map<String, NodeValue> {
        let keys = payload_keys(&self.target);
        ctx.slice(keys.iter().map(String::as_str))
    }

    /// Enqueues a job for the target directly, outside of any chain.
    pub fn enqueue(&self, ctx: &Context) -> Result<Job, JobError> {
        let job = Job::new(self.target.name(), self.args(ctx), self.options.clone());
        self.sink.enqueue(job.clone())?;
        Ok(job)
    }
}

fn payload_keys(step: &Step) -> Vec<String> {
    let contract = step.contract();
    contract
        .expected_keys()
        .into_iter()
        .chain(contract.optional_keys())
        .map(str::to_string)
        .collect()
}

/// Logic of an `Async` sibling. The step's value is the job id.
pub struct Dispatch {
    target: String,
    keys: Vec<String>,
    options: JobOptions,
    sink: Arc<dyn JobSink>,
}

impl StepLogic for Dispatch {
    fn call(&self, ctx: &mut Context, _invoker: &Invoker<'_>) -> StepResult {
        let args = ctx.slice(self.keys.iter().map(String::as_str));
        let job = Job::new(self.target.as_str(), args, self.options.clone());
        let id = job.id;

        self.sink
            .enqueue(job)
            .map_err(|e| StepError::custom(self.target.as_str(), e.to_string()))?;
        Ok(NodeValue::String(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::Executor;
    use serde_json::json;

    #[test]
    fn test_async_sibling_enqueues_filtered_args() {
        let ns = Namespace::new();
        let target = ns
            .leaf("SendEmail")
            .expect(["to"])
            .optional(["cc"])
            .build()
            .unwrap();
        let (queue, mut receiver) = InMemoryQueue::channel();

        let maker = JobMaker::new(&target, Arc::new(queue))
            .options(JobOptions::from_json(json!({"queue": "mailers"})).unwrap());
        let sibling = maker.async_step(&ns).unwrap();
        assert_eq!(sibling.name(), "SendEmail::Async__Queue_Mailers");
        assert_eq!(maker.job_name(), "SendEmail::Job__Queue_Mailers");
        assert!(ns.get("SendEmail::Async__Queue_Mailers").is_some());

        let ctx = Context::from_json(json!({"to": "a@b.c", "cc": "d@e.f", "session": {"big": true}}));
        Executor::default().call_strict(&sibling, ctx).unwrap();

        let job = receiver.try_next().unwrap();
        assert!(receiver.try_next().is_none());
        assert_eq!(job.step, "SendEmail");
        assert_eq!(NodeValue::Object(job.args), json!({"to": "a@b.c", "cc": "d@e.f"}));
        assert_eq!(job.options.get("queue"), Some(&json!("mailers")));
    }

    #[test]
    fn test_job_serializes() {
        let job = Job::new("Step", serde_json::Map::new(), JobOptions::new());
        let value = serde_json::to_value(&job).unwrap();
        let back: Job = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }
}

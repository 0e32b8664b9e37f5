//! Integration tests for background jobs.
#![cfg(feature = "jobs")]

use std::sync::Arc;

use serde_json::json;
use stepwire::jobs::{InMemoryQueue, Job, JobError, JobMaker, JobOptions, JobOutcome, JobWorker, VALID_KEYS};
use stepwire::prelude::*;

fn send_email(ns: &Namespace) -> Step {
    ns.leaf("SendEmail")
        .expect(["to"])
        .optional(["subject"])
        .promise(["sent_to"])
        .call(|ctx| {
            let to = ctx.value("to");
            ctx.set("sent_to", to);
            Ok(NodeValue::Null)
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_worker_performs_queued_jobs() {
    let ns = Namespace::new();
    let target = send_email(&ns);
    let (queue, mut receiver) = InMemoryQueue::channel();
    let maker = JobMaker::new(&target, Arc::new(queue));

    maker.enqueue(&Context::from_json(json!({"to": "a@example.com"}))).unwrap();
    maker.enqueue(&Context::from_json(json!({"to": "b@example.com"}))).unwrap();

    let worker = JobWorker::new(&ns, Executor::default());
    let outcomes = worker.drain(&mut receiver).await;
    assert_eq!(outcomes.len(), 2);

    let sent: Vec<NodeValue> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(JobOutcome::Performed(ctx)) => ctx.value("sent_to"),
            other => panic!("unexpected outcome: {other:?}"),
        })
        .collect();
    assert_eq!(sent, vec![json!("a@example.com"), json!("b@example.com")]);
}

#[tokio::test]
async fn test_cancelled_jobs_are_skipped() {
    let ns = Namespace::new();
    let target = send_email(&ns);
    let (queue, mut receiver) = InMemoryQueue::channel();
    let maker = JobMaker::new(&target, Arc::new(queue));

    let job = maker.enqueue(&Context::from_json(json!({"to": "a@example.com"}))).unwrap();
    let worker = JobWorker::new(&ns, Executor::default());
    worker.cancel(job.id);
    assert!(worker.is_cancelled(job.id));

    let outcomes = worker.drain(&mut receiver).await;
    assert!(matches!(outcomes.as_slice(), [Ok(JobOutcome::Cancelled)]));
    assert!(!worker.is_cancelled(job.id));
}

#[tokio::test]
async fn test_unknown_steps_and_breaches_are_errors() {
    let ns = Namespace::new();
    send_email(&ns);
    let worker = JobWorker::new(&ns, Executor::default());

    let missing = Job::new("Nowhere", serde_json::Map::new(), JobOptions::new());
    let err = worker.perform(missing).await.unwrap_err();
    assert!(matches!(err, JobError::UnknownStep(ref name) if name == "Nowhere"));

    let no_recipient = Job::new("SendEmail", serde_json::Map::new(), JobOptions::new());
    let err = worker.perform(no_recipient).await.unwrap_err();
    assert!(matches!(err, JobError::Step(StepError::ContractBreach { .. })));
    assert_eq!(err.to_string(), r#"{"to":["to is missing"]}"#);
}

#[tokio::test]
async fn test_async_sibling_inside_a_chain() {
    let ns = Namespace::new();
    let target = send_email(&ns);
    let (queue, mut receiver) = InMemoryQueue::channel();
    let maker = JobMaker::new(&target, Arc::new(queue))
        .options(JobOptions::from_json(json!({"queue": "low_priority", "retry": 3})).unwrap());

    let sibling = maker.async_step(&ns).unwrap();
    assert_eq!(sibling.name(), "SendEmail::Async__Queue_LowPriority__Retry_3");

    let signup = ns
        .organizer("Signup")
        .expect(["to"])
        .organize([
            Link::lambda(|ctx| {
                ctx.set("subject", "Welcome");
                Ok(NodeValue::Null)
            }),
            sibling.into(),
        ])
        .build()
        .unwrap();

    let ctx = Executor::default()
        .call(
            &signup,
            Context::from_json(json!({"to": "a@example.com", "password": "hunter2"})),
        )
        .unwrap();
    assert!(ctx.is_success());
    assert!(!ctx.contains("sent_to"));

    let worker = JobWorker::new(&ns, Executor::default());
    let outcomes = worker.drain(&mut receiver).await;
    match outcomes.as_slice() {
        [Ok(JobOutcome::Performed(performed))] => {
            assert_eq!(performed.value("sent_to"), json!("a@example.com"));
            assert_eq!(performed.value("subject"), json!("Welcome"));
            assert!(!performed.contains("password"));
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }
}

#[test]
fn test_invalid_job_options_are_rejected() {
    let err = JobOptions::from_json(json!({"queue": "default", "priority": 1, "lock": true}))
        .unwrap_err();
    assert!(matches!(err, DefinitionError::InvalidJobOptions(ref keys) if keys.len() == 2));

    for key in VALID_KEYS {
        assert!(JobOptions::new().with(key, true).is_ok());
    }
}

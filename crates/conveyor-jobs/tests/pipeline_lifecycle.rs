//! Integration tests for pipeline fan-out, fail-fast cancellation, error
//! aggregation, and artifact forcing.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use conveyor_jobs::{sync_all, ArtifactOutput, Job, JobContext, JobError, LazyArtifact, Pipeline};
use tokio::time::timeout;

#[tokio::test]
async fn wait_returns_only_after_all_jobs_complete() {
    let completed = Arc::new(AtomicUsize::new(0));
    let mut pipeline = Pipeline::new("fanout");

    pipeline.add_jobs((0..8).map(|i| {
        let completed = Arc::clone(&completed);
        Job::new(format!("job-{i}"), move |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }));

    pipeline.wait().await.unwrap();
    assert_eq!(completed.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn first_failure_unblocks_cooperative_siblings() {
    let mut pipeline = Pipeline::new("fail-fast");

    pipeline.add_job(Job::new("failing", |_ctx| async {
        Err(JobError::execution("compile error"))
    }));

    let unblocked = Arc::new(AtomicUsize::new(0));
    {
        let unblocked = Arc::clone(&unblocked);
        pipeline.add_job(Job::new("blocked", move |ctx| async move {
            // Parks until the pool's cancellation signal arrives; without
            // fail-fast this would hang forever.
            ctx.cancelled().await;
            unblocked.fetch_add(1, Ordering::SeqCst);
            Err(JobError::Cancelled {
                job: ctx.job_name().to_string(),
            })
        }));
    }

    let err = timeout(Duration::from_secs(5), pipeline.wait())
        .await
        .expect("wait did not return within bound")
        .unwrap_err();

    // The first failure is the reported one, not the cancellation fallout.
    assert!(matches!(err, JobError::ExecutionFailed { .. }), "unexpected error: {err}");
    assert!(err.to_string().contains("compile error"));
    assert_eq!(unblocked.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wait_errors_iff_some_job_errored() {
    let mut ok_pipeline = Pipeline::new("all-green");
    ok_pipeline.add_jobs((0..4).map(|i| Job::new(format!("ok-{i}"), |_ctx| async { Ok(()) })));
    assert!(ok_pipeline.wait().await.is_ok());

    let mut bad_pipeline = Pipeline::new("one-red");
    bad_pipeline.add_job(Job::new("ok", |_ctx| async { Ok(()) }));
    bad_pipeline.add_job(Job::new("bad", |_ctx| async {
        Err(JobError::execution("disk full"))
    }));

    let err = bad_pipeline.wait().await.unwrap_err();
    assert!(err.to_string().contains("disk full"));
}

#[tokio::test]
async fn panicking_job_does_not_take_down_siblings() {
    let survived = Arc::new(AtomicUsize::new(0));
    let mut pipeline = Pipeline::new("panicking");

    pipeline.add_job(Job::new("exploding", |_ctx| async {
        panic!("unwrap on None in packager");
    }));
    {
        let survived = Arc::clone(&survived);
        pipeline.add_job(Job::new("survivor", move |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            survived.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    }

    let err = pipeline.wait().await.unwrap_err();
    match err {
        JobError::Panicked { job, message } => {
            assert_eq!(job, "exploding");
            assert!(message.contains("unwrap on None in packager"));
        }
        other => panic!("expected Panicked, got: {other}"),
    }
    assert_eq!(survived.load(Ordering::SeqCst), 1);
}

/// Artifact double that records whether it was forced.
struct RecordingArtifact {
    name: &'static str,
    fail: bool,
    forced: Arc<AtomicUsize>,
}

#[async_trait]
impl LazyArtifact for RecordingArtifact {
    fn describe(&self) -> String {
        self.name.to_string()
    }

    async fn sync(&self, _ctx: &JobContext) -> conveyor_jobs::Result<ArtifactOutput> {
        self.forced.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(JobError::ArtifactSync {
                artifact: self.name.to_string(),
                reason: "build backend unavailable".to_string(),
            });
        }
        Ok(ArtifactOutput::new(self.name, serde_json::json!({ "ok": true })))
    }
}

#[tokio::test]
async fn sync_all_short_circuits_on_first_failure() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let third = Arc::new(AtomicUsize::new(0));

    let mut pipeline = Pipeline::new("artifacts");
    {
        let (first, second, third) = (Arc::clone(&first), Arc::clone(&second), Arc::clone(&third));
        pipeline.add_job(Job::new("force-chain", move |ctx| async move {
            let a = RecordingArtifact {
                name: "binary",
                fail: false,
                forced: first,
            };
            let b = RecordingArtifact {
                name: "test-report",
                fail: true,
                forced: second,
            };
            let c = RecordingArtifact {
                name: "package",
                fail: false,
                forced: third,
            };

            sync_all(&ctx, &[&a, &b, &c]).await?;
            Ok(())
        }));
    }

    let err = pipeline.wait().await.unwrap_err();
    assert!(matches!(err, JobError::ArtifactSync { .. }), "unexpected error: {err}");
    assert!(err.to_string().contains("test-report"));

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    // Short-circuited: the third artifact is never forced.
    assert_eq!(third.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sync_all_yields_outputs_in_order() {
    let forced = Arc::new(AtomicUsize::new(0));
    let mut pipeline = Pipeline::new("artifact-order");
    {
        let forced = Arc::clone(&forced);
        pipeline.add_job(Job::new("force-all", move |ctx| async move {
            let a = RecordingArtifact {
                name: "first",
                fail: false,
                forced: Arc::clone(&forced),
            };
            let b = RecordingArtifact {
                name: "second",
                fail: false,
                forced: Arc::clone(&forced),
            };

            let outputs = sync_all(&ctx, &[&a, &b]).await?;
            assert_eq!(outputs.len(), 2);
            assert_eq!(outputs[0].artifact, "first");
            assert_eq!(outputs[1].artifact, "second");
            Ok(())
        }));
    }

    pipeline.wait().await.unwrap();
    assert_eq!(forced.load(Ordering::SeqCst), 2);
}

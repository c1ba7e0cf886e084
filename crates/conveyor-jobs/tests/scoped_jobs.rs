//! Integration test: pipeline jobs performing scoped transactional work.
//!
//! Each job opens its own scope against a shared store; sibling failure
//! leaves committed work in place (no compensation at this layer) while the
//! failing job's own scope rolls back.

use std::sync::Arc;

use conveyor_db::{Db, MemoryDriver, OpContext, ScopeError};
use conveyor_jobs::{Job, JobError, Pipeline};

#[tokio::test]
async fn parallel_jobs_commit_independent_scopes() {
    let driver = Arc::new(MemoryDriver::new());
    let db = Db::new(Arc::clone(&driver));

    let mut pipeline = Pipeline::new("deploy");
    for step in ["test", "lint", "build"] {
        let db = db.clone();
        pipeline.add_job(Job::new(step, move |_ctx| async move {
            let ctx = OpContext::new();
            let inner = db.clone();
            db.run_scoped(&ctx, |ctx| async move {
                inner.client(&ctx).put(format!("result/{step}"), "passed").await?;
                Ok(())
            })
            .await?;
            Ok(())
        }));
    }

    pipeline.wait().await.unwrap();

    let counters = driver.counters();
    assert_eq!(counters.begins, 3);
    assert_eq!(counters.commits, 3);
    assert_eq!(counters.rollbacks, 0);

    let base = db.client(&OpContext::new());
    for step in ["test", "lint", "build"] {
        assert_eq!(base.get(&format!("result/{step}")).await.as_deref(), Some("passed"));
    }
}

#[tokio::test]
async fn failing_job_rolls_back_only_its_own_scope() {
    let driver = Arc::new(MemoryDriver::new());
    let db = Db::new(Arc::clone(&driver));

    let mut pipeline = Pipeline::new("publish");

    {
        let db = db.clone();
        pipeline.add_job(Job::new("record", move |_ctx| async move {
            let ctx = OpContext::new();
            let inner = db.clone();
            db.run_scoped(&ctx, |ctx| async move {
                inner.client(&ctx).put("release/tag", "v1.2.3").await?;
                Ok(())
            })
            .await?;
            Ok(())
        }));
    }
    {
        let db = db.clone();
        pipeline.add_job(Job::new("upload", move |_ctx| async move {
            let ctx = OpContext::new();
            let inner = db.clone();
            db.run_scoped::<(), _, _>(&ctx, |ctx| async move {
                inner.client(&ctx).put("release/assets", "staged").await?;
                Err(ScopeError::operation("registry rejected credentials"))
            })
            .await?;
            Ok(())
        }));
    }

    let err = pipeline.wait().await.unwrap_err();
    assert!(matches!(err, JobError::Scope { .. }), "unexpected error: {err}");
    assert!(err.to_string().contains("registry rejected credentials"));

    let base = db.client(&OpContext::new());
    // The failing job's write rolled back; the sibling's commit stands.
    assert_eq!(base.get("release/assets").await, None);
    assert_eq!(base.get("release/tag").await.as_deref(), Some("v1.2.3"));

    let counters = driver.counters();
    assert_eq!(counters.begins, 2);
    assert_eq!(counters.commits, 1);
    assert_eq!(counters.rollbacks, 1);
}

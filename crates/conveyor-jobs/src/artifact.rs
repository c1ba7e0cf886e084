//! Lazy artifacts: deferred computations forced on demand.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::JobError;
use crate::error::Result;
use crate::job::JobContext;

/// Materialized result of forcing a lazy artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactOutput {
    /// Artifact description, as reported by [`LazyArtifact::describe`].
    pub artifact: String,
    /// Opaque payload produced by the backend.
    pub payload: serde_json::Value,
    /// When the artifact became real.
    pub produced_at: DateTime<Utc>,
}

impl ArtifactOutput {
    /// Output for `artifact`, materialized now.
    pub fn new(artifact: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            artifact: artifact.into(),
            payload,
            produced_at: Utc::now(),
        }
    }
}

/// A deferred, possibly expensive computation identified by a handle.
///
/// Forcing ("syncing") suspends the caller until the backend materializes
/// the artifact. Forcing is idempotent per handle instance within one
/// process run, but concurrent forces of logically identical artifacts may
/// run independently — callers needing at-most-once semantics memoize
/// externally. Backends must honor cancellation on the supplied context.
#[async_trait]
pub trait LazyArtifact: Send + Sync {
    /// Human-readable handle description, used in logs and error reports.
    fn describe(&self) -> String;

    /// Force the artifact, suspending until it is real.
    async fn sync(&self, ctx: &JobContext) -> Result<ArtifactOutput>;
}

/// Force a sequence of artifacts in order within one job, stopping at the
/// first failure.
///
/// This is intra-job, ordered, and fail-fast — distinct from the concurrent
/// fan-out a [`Pipeline`](crate::Pipeline) performs across jobs. The
/// context's cancellation is checked before each force, so a job holding a
/// long artifact list responds to a sibling failure between forces.
pub async fn sync_all(ctx: &JobContext, artifacts: &[&dyn LazyArtifact]) -> Result<Vec<ArtifactOutput>> {
    let mut outputs = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled {
                job: ctx.job_name().to_string(),
            });
        }

        debug!(job = %ctx.job_name(), artifact = %artifact.describe(), "syncing artifact");
        outputs.push(artifact.sync(ctx).await?);
    }
    Ok(outputs)
}

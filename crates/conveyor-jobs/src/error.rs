//! Error types for the job orchestration system.

use snafu::Snafu;

/// Result type for job operations.
pub type Result<T, E = JobError> = std::result::Result<T, E>;

/// Errors produced by jobs and surfaced through
/// [`Pipeline::wait`](crate::Pipeline::wait).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum JobError {
    /// A job body reported a failure.
    #[snafu(display("job execution failed: {reason}"))]
    ExecutionFailed {
        /// Failure reason.
        reason: String,
    },

    /// A job observed cancellation and stopped early.
    #[snafu(display("job '{job}' cancelled"))]
    Cancelled {
        /// The job that stopped.
        job: String,
    },

    /// A job panicked. Contained by the pool and reported as this job's
    /// failure only; siblings keep running until cancellation reaches them.
    #[snafu(display("job '{job}' panicked: {message}"))]
    Panicked {
        /// The job that panicked.
        job: String,
        /// The panic payload, rendered as text.
        message: String,
    },

    /// Forcing a lazy artifact failed.
    #[snafu(display("failed to sync artifact '{artifact}': {reason}"))]
    ArtifactSync {
        /// Description of the artifact that failed to materialize.
        artifact: String,
        /// Backend-reported failure.
        reason: String,
    },

    /// A scoped transaction inside a job failed.
    #[snafu(context(false))]
    #[snafu(display("transaction scope failed: {source}"))]
    Scope {
        /// The scope failure.
        source: conveyor_db::ScopeError,
    },
}

impl JobError {
    /// Wrap an arbitrary failure reported by a job body.
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }
}

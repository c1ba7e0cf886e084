//! Named grouping of concurrently running jobs.

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::job::Job;
use crate::pool::JobPool;

/// A named grouping of jobs run concurrently with one aggregated outcome.
///
/// Jobs start executing as soon as they are added; [`Pipeline::wait`] blocks
/// until every job has returned. `wait` consumes the pipeline, so adding a
/// job after waiting is rejected at compile time rather than documented as
/// undefined behavior.
pub struct Pipeline {
    name: String,
    run_id: Uuid,
    pool: JobPool,
}

impl Pipeline {
    /// Pipeline with its own root cancellation signal.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_cancellation(name, &CancellationToken::new())
    }

    /// Pipeline cancelled alongside `parent`.
    pub fn with_cancellation(name: impl Into<String>, parent: &CancellationToken) -> Self {
        let name = name.into();
        let run_id = Uuid::new_v4();
        info!(pipeline = %name, run_id = %run_id, "pipeline created");
        Self {
            name,
            run_id,
            pool: JobPool::with_cancellation(parent),
        }
    }

    /// The pipeline's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique ID of this run, for log correlation.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The pipeline's cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.pool.cancellation_token()
    }

    /// Add a job; it starts immediately.
    pub fn add_job(&mut self, job: Job) {
        debug!(pipeline = %self.name, run_id = %self.run_id, job = %job.name(), "job added");
        self.pool.spawn(job);
    }

    /// Add several jobs.
    pub fn add_jobs(&mut self, jobs: impl IntoIterator<Item = Job>) {
        for job in jobs {
            self.add_job(job);
        }
    }

    /// Wait until every job has returned, yielding the first failure if any.
    pub async fn wait(self) -> Result<()> {
        let Self { name, run_id, pool } = self;
        let jobs = pool.len();

        let outcome = pool.join().await;
        match &outcome {
            Ok(()) => info!(pipeline = %name, run_id = %run_id, jobs, "pipeline completed"),
            Err(error) => {
                info!(pipeline = %name, run_id = %run_id, jobs, error = %error, "pipeline failed")
            }
        }
        outcome
    }
}

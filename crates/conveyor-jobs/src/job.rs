//! Jobs and their cancellation-aware execution context.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Execution context handed to each running job.
///
/// Cancellation is advisory: the pool signals it when a sibling fails or
/// when the parent signal fires, and the job decides how to respond.
/// Nothing is ever force-killed.
#[derive(Clone)]
pub struct JobContext {
    name: Arc<str>,
    cancel: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(name: &str, cancel: CancellationToken) -> Self {
        Self {
            name: Arc::from(name),
            cancel,
        }
    }

    /// Name of the job this context belongs to.
    pub fn job_name(&self) -> &str {
        &self.name
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation has been signalled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// The raw token, for handing to blocking sub-operations.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("job", &self.name)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// A named, schedulable unit of work.
///
/// Submitted once, executed at most once, discarded after completion. The
/// name feeds logs and error reports.
pub struct Job {
    pub(crate) name: String,
    pub(crate) run: Box<dyn FnOnce(JobContext) -> BoxFuture<'static, Result<()>> + Send + 'static>,
}

impl Job {
    /// Create a job from an async closure.
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(move |ctx| Box::pin(body(ctx))),
        }
    }

    /// The job's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("name", &self.name).finish_non_exhaustive()
    }
}

//! Concurrent fan-out pool with fail-fast cancellation.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::error::JobError;
use crate::error::Result;
use crate::job::Job;
use crate::job::JobContext;

/// Runs a set of jobs concurrently under one cancellation signal.
///
/// Error policy, applied uniformly: **the first failure wins**. It cancels
/// the pool's token so cooperative siblings can stop early, the pool still
/// waits for every job to finish, and [`JobPool::join`] returns that first
/// error unchanged — never a synthesized one. Later failures are logged at
/// `warn` and dropped.
pub struct JobPool {
    cancel: CancellationToken,
    tasks: JoinSet<(String, Result<()>)>,
}

impl JobPool {
    /// Pool with its own root cancellation signal.
    pub fn new() -> Self {
        Self::with_cancellation(&CancellationToken::new())
    }

    /// Pool whose signal is a child of `parent`: cancelling the parent
    /// signals every job in the pool, while cancelling the pool leaves the
    /// parent untouched.
    pub fn with_cancellation(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            tasks: JoinSet::new(),
        }
    }

    /// The pool's cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of jobs spawned so far.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no jobs have been spawned.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawn a job onto the runtime. Execution starts immediately, but
    /// fail-fast cancellation is signalled from [`JobPool::join`]: a job
    /// that fails before `join` is called does not cancel its siblings
    /// until draining begins.
    ///
    /// A panic inside the body is contained and converted into
    /// [`JobError::Panicked`] for that job only; sibling jobs are
    /// unaffected beyond the cancellation signal.
    pub fn spawn(&mut self, job: Job) {
        let ctx = JobContext::new(&job.name, self.cancel.clone());
        let Job { name, run } = job;

        self.tasks.spawn(async move {
            // `run` builds the job future; invoking it inside the caught
            // future contains panics raised during construction as well as
            // panics raised while polling.
            let result = match AssertUnwindSafe(async move { run(ctx).await }).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(JobError::Panicked {
                    job: name.clone(),
                    message: panic_message(payload),
                }),
            };
            (name, result)
        });
    }

    /// Wait for every spawned job to finish and report the first failure,
    /// if any. The first failure observed while draining cancels the
    /// pool's token so cooperative siblings stop early.
    pub async fn join(mut self) -> Result<()> {
        let mut first: Option<JobError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let (name, result) = match joined {
                Ok(output) => output,
                Err(error) if error.is_panic() => {
                    // Bodies are wrapped in catch_unwind; a panic here
                    // escaped that wrapper. Still counts as a failed job.
                    let message = panic_message(error.into_panic());
                    let job = "<unnamed>".to_string();
                    (job.clone(), Err(JobError::Panicked { job, message }))
                }
                Err(error) => {
                    warn!(error = %error, "job task aborted by runtime");
                    continue;
                }
            };

            match result {
                Ok(()) => debug!(job = %name, "job finished"),
                Err(error) => {
                    if first.is_none() {
                        warn!(job = %name, error = %error, "job failed, signalling cancellation to siblings");
                        self.cancel.cancel();
                        first = Some(error);
                    } else {
                        warn!(job = %name, error = %error, "job failed after first failure");
                    }
                }
            }
        }

        match first {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for JobPool {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Scoped transactions carried through an ambient operation context.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use snafu::ResultExt;
use tracing::debug;
use tracing::warn;

use crate::driver::Driver;
use crate::error::BeginSnafu;
use crate::error::CommitSnafu;
use crate::error::Result;
use crate::error::ScopeError;

/// Ambient operation context for one logical call chain.
///
/// Carries at most one active transaction scope. Cloning is cheap and yields
/// a context referring to the same scope; independent call chains use
/// independent contexts, so concurrent unrelated scopes are safe. A *scoped*
/// context is owned by the chain that opened it — using one scoped context
/// from several tasks at once is a caller error this crate does not detect.
pub struct OpContext<D: Driver> {
    scope: Option<Arc<ScopeState<D>>>,
}

struct ScopeState<D: Driver> {
    session: D::Session,
}

impl<D: Driver> Clone for OpContext<D> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
        }
    }
}

impl<D: Driver> Default for OpContext<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Driver> OpContext<D> {
    /// A context with no active scope.
    pub fn new() -> Self {
        Self { scope: None }
    }

    /// Whether this context carries an active transaction scope.
    pub fn in_scope(&self) -> bool {
        self.scope.is_some()
    }

    /// Derive a context scoped to `session`.
    fn with_scope(&self, session: D::Session) -> Self {
        Self {
            scope: Some(Arc::new(ScopeState { session })),
        }
    }

    fn scoped_session(&self) -> Option<&D::Session> {
        self.scope.as_deref().map(|state| &state.session)
    }
}

/// Handle over a shared data store with scoped-transaction semantics.
///
/// The handle is stateless with respect to active scopes: scopes live on the
/// [`OpContext`] values that opened them, so many call chains can share one
/// `Db` while carrying independent transactions.
pub struct Db<D: Driver> {
    driver: Arc<D>,
}

impl<D: Driver> Clone for Db<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
        }
    }
}

impl<D: Driver> Db<D> {
    /// Wrap a driver.
    pub fn new(driver: Arc<D>) -> Self {
        Self { driver }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// The session for `ctx`: the transactional session when the context is
    /// scoped, the shared base session otherwise.
    pub fn client(&self, ctx: &OpContext<D>) -> D::Session {
        match ctx.scoped_session() {
            Some(session) => session.clone(),
            None => self.driver.base_session(),
        }
    }

    /// Run `body` inside a transaction scope.
    ///
    /// If `ctx` already carries a scope, the body joins it and the result is
    /// returned unchanged — the outer caller keeps sole responsibility for
    /// the terminal commit or rollback, so nesting collapses to the
    /// outermost scope. Otherwise a new transaction is opened and exactly
    /// one terminal action is applied on exit:
    ///
    /// - body returns `Ok`: commit; a commit failure fails the whole
    ///   operation and no rollback is attempted after it.
    /// - body returns `Err`: roll back; a rollback failure is combined with
    ///   the body error in [`ScopeError::RollbackFailed`] rather than
    ///   replacing it.
    /// - body panics: the panic is contained, converted to
    ///   [`ScopeError::Panicked`], and the rollback path above runs.
    pub async fn run_scoped<T, F, Fut>(&self, ctx: &OpContext<D>, body: F) -> Result<T>
    where
        F: FnOnce(OpContext<D>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if ctx.in_scope() {
            debug!("joining existing transaction scope");
            return body(ctx.clone()).await;
        }

        let session = self.driver.begin().await.context(BeginSnafu)?;
        let scoped = ctx.with_scope(session.clone());
        debug!("transaction scope opened");

        // The body is invoked inside the caught future so that a panic
        // raised while constructing the future is contained too, not just
        // one raised while polling it.
        match AssertUnwindSafe(async move { body(scoped).await }).catch_unwind().await {
            Ok(Ok(value)) => {
                self.driver.commit(&session).await.context(CommitSnafu)?;
                debug!("transaction scope committed");
                Ok(value)
            }
            Ok(Err(error)) => {
                debug!(error = %error, "transaction scope rolling back");
                Err(self.roll_back(&session, error).await)
            }
            Err(payload) => {
                let message = panic_message(payload);
                warn!(message = %message, "panic contained at transaction scope boundary");
                Err(self.roll_back(&session, ScopeError::Panicked { message }).await)
            }
        }
    }

    /// Roll back after a failure, preserving the original error when the
    /// rollback itself fails.
    async fn roll_back(&self, session: &D::Session, original: ScopeError) -> ScopeError {
        match self.driver.rollback(session).await {
            Ok(()) => original,
            Err(rollback) => {
                warn!(error = %rollback, "rollback failed after scope failure");
                ScopeError::RollbackFailed {
                    source: Box::new(original),
                    rollback,
                }
            }
        }
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

//! Error types for scoped transactions.

use snafu::Snafu;

use crate::driver::DriverError;

/// Result type for scope operations.
pub type Result<T, E = ScopeError> = std::result::Result<T, E>;

/// Errors produced while running a scoped operation.
///
/// Each terminal-action failure is independently reportable; a rollback
/// failure that follows a body failure keeps both errors instead of
/// discarding the original.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ScopeError {
    /// Opening the transaction failed; no scope was created.
    #[snafu(display("failed to begin transaction: {source}"))]
    Begin {
        /// Driver-level begin failure.
        source: DriverError,
    },

    /// The scope body succeeded but the commit did not. Fatal to the
    /// operation; no rollback is attempted after a failed commit.
    #[snafu(display("failed to commit transaction: {source}"))]
    Commit {
        /// Driver-level commit failure.
        source: DriverError,
    },

    /// Rolling back the transaction failed.
    #[snafu(display("failed to roll back transaction: {source}"))]
    Rollback {
        /// Driver-level rollback failure.
        source: DriverError,
    },

    /// The scope body failed and the subsequent rollback failed too.
    #[snafu(display("scoped operation failed ({source}); rollback also failed: {rollback}"))]
    RollbackFailed {
        /// The original body failure.
        #[snafu(source(from(ScopeError, Box::new)))]
        source: Box<ScopeError>,
        /// The rollback failure that followed it.
        rollback: DriverError,
    },

    /// The scope body panicked. Contained at the scope boundary and
    /// reported as this error so operators can tell a bug from an expected
    /// failure; the rollback path still runs.
    #[snafu(display("panic in scoped operation: {message}"))]
    Panicked {
        /// The panic payload, rendered as text.
        message: String,
    },

    /// A driver-level failure reported while using a session inside the
    /// scope body. Converts from [`DriverError`] so session calls can use
    /// `?` directly.
    #[snafu(context(false))]
    #[snafu(display("session error: {source}"))]
    Session {
        /// The underlying driver failure.
        source: DriverError,
    },

    /// A failure reported by the scope body itself.
    #[snafu(display("{reason}"))]
    Operation {
        /// Description of the body failure.
        reason: String,
    },
}

impl ScopeError {
    /// Wrap a domain failure so it can flow through
    /// [`Db::run_scoped`](crate::Db::run_scoped).
    pub fn operation(reason: impl Into<String>) -> Self {
        Self::Operation { reason: reason.into() }
    }
}

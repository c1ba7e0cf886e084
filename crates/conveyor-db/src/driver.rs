//! Driver contract for the underlying data store.

use async_trait::async_trait;
use snafu::Snafu;

/// Errors surfaced by a [`Driver`] implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DriverError {
    /// The backing connection could not be reached.
    #[snafu(display("connection unavailable: {reason}"))]
    Unavailable {
        /// Why the connection is unavailable.
        reason: String,
    },

    /// A terminal action was attempted on a transaction that already
    /// committed or rolled back.
    #[snafu(display("transaction is no longer active"))]
    TransactionClosed,

    /// The backend rejected the operation.
    #[snafu(display("backend error: {reason}"))]
    Backend {
        /// Backend-reported failure description.
        reason: String,
    },
}

/// Session factory with transactional semantics.
///
/// A driver owns one shared base session and can open transactions against
/// it. One session type plays both roles: [`Driver::base_session`] returns
/// the non-transactional session, [`Driver::begin`] returns a session bound
/// to a fresh transaction. Query code written against `Self::Session` runs
/// unchanged inside or outside a scope.
///
/// The base session must be safe for concurrent use by independent callers.
/// A transactional session is owned by the single call chain that opened it;
/// the driver is not required to detect concurrent misuse.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Session handle. Cheap to clone; clones refer to the same underlying
    /// connection or transaction.
    type Session: Clone + Send + Sync + 'static;

    /// The shared non-transactional session.
    fn base_session(&self) -> Self::Session;

    /// Open a new transaction and return its session.
    async fn begin(&self) -> Result<Self::Session, DriverError>;

    /// Commit the transaction behind `session`.
    ///
    /// Must fail with [`DriverError::TransactionClosed`] if a terminal
    /// action was already applied.
    async fn commit(&self, session: &Self::Session) -> Result<(), DriverError>;

    /// Roll back the transaction behind `session`.
    ///
    /// Must fail with [`DriverError::TransactionClosed`] if a terminal
    /// action was already applied.
    async fn rollback(&self, session: &Self::Session) -> Result<(), DriverError>;
}

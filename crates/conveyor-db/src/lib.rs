//! Scoped transactional access to a shared data store.
//!
//! This crate lets deeply nested call chains share one unit-of-work boundary
//! (a transaction) without threading a handle through every signature, and
//! without callers needing to know whether they are the outermost scope.
//!
//! The active scope rides on an [`OpContext`] value: each logical call chain
//! carries its own context, and a [`Db`] handle resolves that context to
//! either the shared base session or the transactional session bound to the
//! open scope. [`Db::run_scoped`] either joins an existing scope or opens a
//! new one, and guarantees exactly one terminal commit or rollback on every
//! exit path, including panics.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use conveyor_db::{Db, MemoryDriver, OpContext};
//!
//! let db = Db::new(Arc::new(MemoryDriver::new()));
//! let ctx = OpContext::new();
//!
//! let count = db
//!     .run_scoped(&ctx, |ctx| async move {
//!         // Any run_scoped call deeper in this chain joins this scope.
//!         let session = db.client(&ctx);
//!         session.put("users/alice", "active").await?;
//!         Ok(1u32)
//!     })
//!     .await?;
//! ```

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod memory;
pub mod scope;

pub use driver::Driver;
pub use driver::DriverError;
pub use error::Result;
pub use error::ScopeError;
pub use memory::MemoryDriver;
pub use memory::MemorySession;
pub use memory::TxnCounters;
pub use scope::Db;
pub use scope::OpContext;

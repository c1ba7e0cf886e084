//! Concurrent job orchestration for multi-stage workflows.
//!
//! This crate runs independent units of work in parallel under one
//! cancellation signal, aggregates failures fail-fast, and gives each job a
//! way to force lazy artifacts — deferred computations realized only on
//! demand.
//!
//! # Features
//!
//! - **Pipelines**: a named grouping of jobs run concurrently with a single
//!   aggregated outcome
//! - **Fail-fast cancellation**: the first failure signals cooperative
//!   cancellation to every sibling; nothing is force-killed
//! - **Panic containment**: a panicking job becomes an error for that job
//!   only, never a crash of the pool
//! - **Lazy artifacts**: sequential, short-circuiting forcing of deferred
//!   results inside a job
//!
//! # Example
//!
//! ```ignore
//! use conveyor_jobs::{Job, Pipeline};
//!
//! let mut pipeline = Pipeline::new("release");
//! pipeline.add_jobs([
//!     Job::new("test", |ctx| async move { run_tests(&ctx).await }),
//!     Job::new("lint", |ctx| async move { run_lints(&ctx).await }),
//!     Job::new("build", |ctx| async move { build_binaries(&ctx).await }),
//! ]);
//! pipeline.wait().await?;
//! ```

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod pool;

pub use artifact::sync_all;
pub use artifact::ArtifactOutput;
pub use artifact::LazyArtifact;
pub use error::JobError;
pub use error::Result;
pub use job::Job;
pub use job::JobContext;
pub use pipeline::Pipeline;
pub use pool::JobPool;

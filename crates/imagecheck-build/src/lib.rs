//! imagecheck build orchestration
//!
//! This crate builds and pushes changed images with `docker buildx`,
//! parents before children, with bounded retry per version, and reduces the
//! per-tag outcomes to a reportable result.

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod retry;

pub use builder::{BuildInvocation, BuildRunner, BuildxRunner};
pub use error::{BuildError, Result};
pub use orchestrator::{BuildOrchestrator, BuildSettings};
pub use report::{ArtifactStore, DisplayRow, LocalArtifactStore, OverallStatus, aggregate};
pub use retry::{Backoff, RetryPolicy};

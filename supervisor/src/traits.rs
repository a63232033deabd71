//! Trait definitions with mockall annotations for testing
//!
//! The supervisor talks to the outside world through two seams: the HTTP
//! health probe used while waiting for readiness, and the fetcher used to
//! download a distribution archive. Both are injected so the timing and
//! idempotence rules can be tested without a real node or network.

use std::path::Path;
use url::Url;

use crate::error::SupervisorResult;

/// Single readiness probe against a node's HTTP endpoint
#[mockall::automock]
#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    /// Issue one probe and return the HTTP status code
    ///
    /// Connection and I/O failures are returned as errors; the poller treats
    /// them exactly like a non-200 status and retries.
    async fn probe(&self, http_port: u16) -> SupervisorResult<u16>;
}

/// Downloads a distribution archive to a local file
#[mockall::automock]
#[async_trait::async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Write the artifact at `url` to `dest`, returning the number of bytes written
    async fn fetch(&self, url: &Url, dest: &Path) -> SupervisorResult<u64>;
}

//! Supervisor library for embedded CrateDB test clusters
//!
//! This library provisions a CrateDB distribution, launches a single node as
//! a child process, waits until its HTTP endpoint answers, and shuts it down
//! again within a bounded deadline. Tests get the node's ports back as a
//! `ClusterHandle` to hand to their database adapter.

pub mod config;
pub mod error;
pub mod process;
pub mod services;
pub mod session;
pub mod traits;

// Re-export commonly used types
pub use config::{ClusterConfig, ClusterConfigBuilder, SupervisorSettings};
pub use error::{SupervisorError, SupervisorResult};
pub use process::ProcessHandle;
pub use services::{
    ArtifactProvisioner, ProcessLauncher, ReadinessPoller, ReadinessState, ShutdownCoordinator,
    ShutdownMode, ShutdownOutcome,
};
pub use session::{ClusterSession, StaleNodeRecord};
pub use traits::{ArtifactFetcher, HealthProbe};

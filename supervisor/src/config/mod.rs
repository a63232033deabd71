//! Configuration Management
//!
//! Node-level settings (`ClusterConfig`) and supervisor-level settings
//! (`SupervisorSettings`) are kept apart: the first becomes the node's
//! argument vector, the second drives provisioning, polling and shutdown.

pub mod builder;
pub mod cluster;
pub mod settings;

pub use builder::ClusterConfigBuilder;
pub use cluster::ClusterConfig;
pub use settings::SupervisorSettings;

//! Cluster Configuration
//!
//! Immutable node settings rendered as `-Des.*` overrides on the node's
//! command line.

use serde::{Deserialize, Serialize};
use shared::ClusterHandle;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CLUSTER_NAME: &str = "testcluster";
pub const DEFAULT_GATEWAY_TYPE: &str = "none";
pub const DEFAULT_STORE_TYPE: &str = "memory";
pub const DEFAULT_ROUTING_SCHEDULE: Duration = Duration::from_millis(30);

/// Settings for one supervised single-node cluster
///
/// Ports are fixed when the value is built and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub(crate) http_port: u16,
    pub(crate) transport_port: u16,
    pub(crate) cluster_name: String,
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) multicast_discovery: bool,
    pub(crate) gateway_type: String,
    pub(crate) store_type: String,
    pub(crate) routing_schedule: Duration,
}

impl ClusterConfig {
    /// Create a new builder
    pub fn builder() -> super::ClusterConfigBuilder {
        super::ClusterConfigBuilder::new()
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn transport_port(&self) -> u16 {
        self.transport_port
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn multicast_discovery(&self) -> bool {
        self.multicast_discovery
    }

    pub fn gateway_type(&self) -> &str {
        &self.gateway_type
    }

    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    pub fn routing_schedule(&self) -> Duration {
        self.routing_schedule
    }

    /// Connection details for adapters
    pub fn cluster(&self) -> ClusterHandle {
        ClusterHandle::new(self.http_port, self.transport_port)
    }

    /// Convert to node command-line arguments
    ///
    /// The order is fixed so the same config always yields the same vector.
    pub fn to_args(&self, pid_file: &Path) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            pid_file.to_string_lossy().into_owned(),
            es_setting("cluster.name", &self.cluster_name),
            es_setting("http.port", self.http_port),
            es_setting("transport.tcp.port", self.transport_port),
            es_setting("discovery.zen.ping.multicast.enabled", self.multicast_discovery),
            es_setting("gateway.type", &self.gateway_type),
            es_setting("index.store.type", &self.store_type),
            es_setting(
                "cluster.routing.schedule",
                format!("{}ms", self.routing_schedule.as_millis()),
            ),
        ];

        if let Some(ref data_dir) = self.data_dir {
            args.push(es_setting("path.data", data_dir.display()));
        }

        args
    }
}

fn es_setting(key: &str, value: impl std::fmt::Display) -> String {
    format!("-Des.{key}={value}")
}

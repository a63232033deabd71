//! Core shared types and identifiers

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::{SharedError, SharedResult};

/// Adapter property naming the transport hosts to connect to
pub const HOSTS_PROPERTY: &str = "crate.hosts";

/// Connection details handed to database adapters once a node is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterHandle {
    pub http_port: u16,
    pub transport_port: u16,
}

impl ClusterHandle {
    pub fn new(http_port: u16, transport_port: u16) -> Self {
        Self {
            http_port,
            transport_port,
        }
    }

    /// Base URL of the node's HTTP endpoint (also the health probe target)
    pub fn http_url(&self) -> String {
        format!("http://localhost:{}", self.http_port)
    }

    /// Transport address in the `host:port` form the client expects
    pub fn hosts(&self) -> String {
        format!("localhost:{}", self.transport_port)
    }

    /// Properties an adapter needs to reach this cluster
    pub fn adapter_properties(&self) -> HashMap<String, String> {
        let mut props = HashMap::new();
        props.insert(HOSTS_PROPERTY.to_string(), self.hosts());
        props
    }
}

impl fmt::Display for ClusterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http:{} transport:{}", self.http_port, self.transport_port)
    }
}

/// Supervisor component emitting a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Supervisor,
    Provisioner,
    Launcher,
    Poller,
    Shutdown,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Supervisor => "supervisor",
            Component::Provisioner => "provisioner",
            Component::Launcher => "launcher",
            Component::Poller => "poller",
            Component::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contiguous range of ports reserved for supervised nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: u16,
    len: u16,
}

impl PortRange {
    /// Reserved range for node HTTP ports
    pub const HTTP: PortRange = PortRange { start: 44200, len: 100 };

    /// Reserved range for node transport ports
    pub const TRANSPORT: PortRange = PortRange { start: 44300, len: 100 };

    pub fn new(start: u16, len: u16) -> SharedResult<Self> {
        if len == 0 || start.checked_add(len - 1).is_none() {
            return Err(SharedError::InvalidPortRange { start, len });
        }
        Ok(Self { start, len })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port - self.start < self.len
    }

    /// Pick a port uniformly from the range
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> u16 {
        self.start + rng.gen_range(0..self.len)
    }
}

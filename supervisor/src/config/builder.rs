//! Cluster Configuration Builder
//!
//! Provides a builder pattern for constructing node configurations. Ports
//! left unset are picked at random from the reserved ranges so concurrent
//! test runs on one host do not collide.

use rand::Rng;
use shared::PortRange;
use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use super::cluster::{
    ClusterConfig, DEFAULT_CLUSTER_NAME, DEFAULT_GATEWAY_TYPE, DEFAULT_ROUTING_SCHEDULE,
    DEFAULT_STORE_TYPE,
};
use crate::error::{SupervisorError, SupervisorResult};

/// Random picks tried before giving up on a range
const PORT_PICK_ATTEMPTS: usize = 32;

pub struct ClusterConfigBuilder {
    http_port: Option<u16>,
    transport_port: Option<u16>,
    http_range: PortRange,
    transport_range: PortRange,
    cluster_name: String,
    data_dir: Option<PathBuf>,
    multicast_discovery: bool,
    gateway_type: String,
    store_type: String,
    routing_schedule: Duration,
}

impl ClusterConfigBuilder {
    pub fn new() -> Self {
        Self {
            http_port: None,
            transport_port: None,
            http_range: PortRange::HTTP,
            transport_range: PortRange::TRANSPORT,
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            data_dir: None,
            multicast_discovery: false,
            gateway_type: DEFAULT_GATEWAY_TYPE.to_string(),
            store_type: DEFAULT_STORE_TYPE.to_string(),
            routing_schedule: DEFAULT_ROUTING_SCHEDULE,
        }
    }

    /// Use a fixed HTTP port instead of a random one
    pub fn http_port(mut self, port: u16) -> Self {
        self.http_port = Some(port);
        self
    }

    /// Use a fixed transport port instead of a random one
    pub fn transport_port(mut self, port: u16) -> Self {
        self.transport_port = Some(port);
        self
    }

    /// Range random HTTP ports are drawn from
    pub fn http_range(mut self, range: PortRange) -> Self {
        self.http_range = range;
        self
    }

    /// Range random transport ports are drawn from
    pub fn transport_range(mut self, range: PortRange) -> Self {
        self.transport_range = range;
        self
    }

    pub fn cluster_name<S: Into<String>>(mut self, name: S) -> Self {
        self.cluster_name = name.into();
        self
    }

    pub fn data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn multicast_discovery(mut self, enabled: bool) -> Self {
        self.multicast_discovery = enabled;
        self
    }

    pub fn gateway_type<S: Into<String>>(mut self, gateway: S) -> Self {
        self.gateway_type = gateway.into();
        self
    }

    pub fn store_type<S: Into<String>>(mut self, store: S) -> Self {
        self.store_type = store.into();
        self
    }

    pub fn routing_schedule(mut self, interval: Duration) -> Self {
        self.routing_schedule = interval;
        self
    }

    /// Build the configuration, fixing both ports
    pub fn build(self) -> SupervisorResult<ClusterConfig> {
        if self.cluster_name.trim().is_empty() {
            return Err(SupervisorError::config("cluster name must not be empty"));
        }

        let mut rng = rand::thread_rng();

        let http_port = match self.http_port {
            Some(0) => return Err(SupervisorError::config("http port must not be 0")),
            Some(port) => port,
            None => pick_free_port(&mut rng, self.http_range, None)?,
        };

        let transport_port = match self.transport_port {
            Some(0) => return Err(SupervisorError::config("transport port must not be 0")),
            Some(port) => port,
            None => pick_free_port(&mut rng, self.transport_range, Some(http_port))?,
        };

        if http_port == transport_port {
            return Err(SupervisorError::config(format!(
                "http and transport ports must differ (both {http_port})"
            )));
        }

        Ok(ClusterConfig {
            http_port,
            transport_port,
            cluster_name: self.cluster_name,
            data_dir: self.data_dir,
            multicast_discovery: self.multicast_discovery,
            gateway_type: self.gateway_type,
            store_type: self.store_type,
            routing_schedule: self.routing_schedule,
        })
    }
}

impl Default for ClusterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a random port from `range` that can currently be bound on localhost
///
/// `exclude` only matters when custom http and transport ranges overlap;
/// the reserved default ranges are disjoint.
fn pick_free_port<R: Rng + ?Sized>(
    rng: &mut R,
    range: PortRange,
    exclude: Option<u16>,
) -> SupervisorResult<u16> {
    for _ in 0..PORT_PICK_ATTEMPTS {
        let port = range.pick(rng);
        if Some(port) == exclude {
            continue;
        }
        if TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return Ok(port);
        }
    }

    Err(SupervisorError::config(format!(
        "no free port in {}..{} after {} attempts",
        range.start(),
        u32::from(range.start()) + u32::from(range.len()),
        PORT_PICK_ATTEMPTS
    )))
}

//! Readiness polling
//!
//! A spawned task probes the node's HTTP endpoint until it answers 200. The
//! caller bounds its own wait with a timeout on the task's join handle, so a
//! hung probe can never hold the caller past its deadline. On timeout the
//! task is detached, not aborted: an in-flight probe finishes on its own and
//! the loop stops once its own deadline has passed.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

use crate::config::ClusterConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::config::settings::DEFAULT_PROBE_INTERVAL;
use crate::traits::HealthProbe;
use shared::{component_debug, component_info, component_warn, Component};

/// Status code that marks a node as servable
pub const READY_STATUS: u16 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    NotReady,
    Ready,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessEvent {
    ProbeSucceeded,
    ProbeFailed,
    DeadlineElapsed,
}

impl ReadinessState {
    /// Apply an event; terminal states absorb everything
    pub fn advance(self, event: ReadinessEvent) -> Self {
        match (self, event) {
            (ReadinessState::NotReady, ReadinessEvent::ProbeSucceeded) => ReadinessState::Ready,
            (ReadinessState::NotReady, ReadinessEvent::DeadlineElapsed) => ReadinessState::TimedOut,
            (state, _) => state,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != ReadinessState::NotReady
    }

    pub fn is_ready(self) -> bool {
        self == ReadinessState::Ready
    }
}

/// Plain HTTP GET against `http://localhost:<port>/`
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    /// `request_timeout` bounds each individual probe
    pub fn new(request_timeout: Duration) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, http_port: u16) -> SupervisorResult<u16> {
        let url = format!("http://localhost:{http_port}/");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SupervisorError::ProbeFailure {
                http_port,
                message: e.to_string(),
            })?;

        Ok(response.status().as_u16())
    }
}

pub struct ReadinessPoller<P: HealthProbe + 'static> {
    probe: Arc<P>,
    interval: Duration,
}

impl<P: HealthProbe + 'static> ReadinessPoller<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
            interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    /// Pause between failed probes
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the node answers 200 or `deadline` elapses
    ///
    /// Never blocks longer than `deadline`. Returns `Ready` or `TimedOut`.
    pub async fn await_ready(&self, config: &ClusterConfig, deadline: Duration) -> ReadinessState {
        let started = Instant::now();
        let http_port = config.http_port();

        component_debug!(
            Component::Poller,
            "Waiting up to {:?} for node on http port {} (probe every {:?})",
            deadline,
            http_port,
            self.interval
        );

        let worker = tokio::spawn(poll_until_ready(
            Arc::clone(&self.probe),
            http_port,
            self.interval,
            // `None` for deadlines past the end of the clock; the caller's timeout still applies
            started.checked_add(deadline),
        ));

        let state = match timeout(deadline, worker).await {
            Ok(Ok(state)) => state,
            Ok(Err(join_error)) => {
                component_warn!(
                    Component::Poller,
                    "Readiness worker for http port {} aborted: {}",
                    http_port,
                    join_error
                );
                ReadinessState::NotReady.advance(ReadinessEvent::DeadlineElapsed)
            }
            // Dropping the join handle detaches the worker
            Err(_) => ReadinessState::NotReady.advance(ReadinessEvent::DeadlineElapsed),
        };

        if state.is_ready() {
            component_info!(
                Component::Poller,
                "✅ Node on http port {} ready after {:?}",
                http_port,
                started.elapsed()
            );
        } else {
            component_warn!(
                Component::Poller,
                "⏰ Node on http port {} not ready after {:?}",
                http_port,
                started.elapsed()
            );
        }

        state
    }
}

async fn poll_until_ready<P: HealthProbe + ?Sized>(
    probe: Arc<P>,
    http_port: u16,
    interval: Duration,
    stop_at: Option<Instant>,
) -> ReadinessState {
    let mut state = ReadinessState::NotReady;
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        let event = match probe.probe(http_port).await {
            Ok(READY_STATUS) => ReadinessEvent::ProbeSucceeded,
            Ok(status) => {
                component_debug!(
                    Component::Poller,
                    "Probe {} on http port {} returned {}",
                    attempts,
                    http_port,
                    status
                );
                ReadinessEvent::ProbeFailed
            }
            Err(e) => {
                component_debug!(Component::Poller, "Probe {} failed: {}", attempts, e);
                ReadinessEvent::ProbeFailed
            }
        };

        state = state.advance(event);
        if state.is_terminal() {
            break;
        }

        if stop_at.is_some_and(|stop_at| Instant::now() >= stop_at) {
            state = state.advance(ReadinessEvent::DeadlineElapsed);
            break;
        }

        sleep(interval).await;
    }

    component_debug!(
        Component::Poller,
        "Readiness worker for http port {} finished as {:?} after {} probes",
        http_port,
        state,
        attempts
    );
    state
}

//! Supervised node session
//!
//! Ties the four services together: provision the distribution, launch the
//! node, wait for readiness, and later shut it down. Each session is an
//! independently owned value; two sessions with disjoint ports never share
//! any state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::logging::{log_shutdown, log_startup, log_success};
use shared::{component_info, component_warn, ClusterHandle, Component};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{ClusterConfig, SupervisorSettings};
use crate::error::{SupervisorError, SupervisorResult};
use crate::process::ProcessHandle;
use crate::services::{
    absolute_path, ArtifactProvisioner, HttpHealthProbe, ProcessLauncher, ReadinessPoller,
    ShutdownCoordinator, ShutdownMode, ShutdownOutcome,
};
use crate::traits::HealthProbe;

/// Marker left behind for a node whose exit could not be confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleNodeRecord {
    pub pid: Option<i32>,
    pub http_port: u16,
    pub transport_port: u16,
    pub cluster_name: String,
    pub outcome: String,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

impl StaleNodeRecord {
    pub fn file_name(pid: Option<i32>) -> String {
        match pid {
            Some(pid) => format!("stale-node-{pid}.json"),
            None => "stale-node-unknown.json".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ClusterSession {
    settings: SupervisorSettings,
    config: ClusterConfig,
    distribution: PathBuf,
    handle: ProcessHandle,
    exit_confirmed: bool,
}

impl ClusterSession {
    /// Provision, launch and wait for the node using the HTTP health probe
    pub async fn start(settings: SupervisorSettings, config: ClusterConfig) -> SupervisorResult<Self> {
        let probe = HttpHealthProbe::new(settings.probe_timeout)?;
        Self::start_with_probe(settings, config, probe).await
    }

    /// Same as [`ClusterSession::start`] with a caller-supplied probe
    pub async fn start_with_probe<P: HealthProbe + 'static>(
        settings: SupervisorSettings,
        config: ClusterConfig,
        probe: P,
    ) -> SupervisorResult<Self> {
        log_startup(
            Component::Supervisor,
            &format!("cluster '{}' on {}", config.cluster_name(), config.cluster()),
        );

        let provisioner = ArtifactProvisioner::new(&settings.working_dir);
        let distribution = provisioner.ensure(&settings.artifact_uri).await?;

        let launcher = ProcessLauncher::for_distribution(&distribution, &settings.working_dir)
            .with_interpreter(settings.interpreter.clone());
        let mut handle = launcher.launch(&config)?;

        let started = Instant::now();
        let poller = ReadinessPoller::new(probe).with_interval(settings.probe_interval);
        let state = poller.await_ready(&config, settings.ready_timeout).await;

        if !state.is_ready() {
            let elapsed = started.elapsed();
            let exit_status = handle
                .try_exit_status()
                .ok()
                .flatten()
                .map(|status| status.to_string());

            let outcome = ShutdownCoordinator::new()
                .shutdown(&mut handle, ShutdownMode::Hard, settings.shutdown_timeout)
                .await;

            let working_dir = absolute_path(&settings.working_dir)?;
            if outcome.is_exited() {
                remove_pid_file(handle.pid_file());
            } else {
                flag_stale_node(&working_dir, &config, &outcome);
            }

            return Err(SupervisorError::ReadinessTimeout {
                http_port: config.http_port(),
                elapsed,
                exit_status,
            });
        }

        log_success(
            Component::Supervisor,
            &format!("Cluster '{}' ready on {}", config.cluster_name(), config.cluster()),
        );

        Ok(Self {
            settings,
            config,
            distribution,
            handle,
            exit_confirmed: false,
        })
    }

    pub fn cluster(&self) -> ClusterHandle {
        self.handle.cluster()
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn distribution(&self) -> &Path {
        &self.distribution
    }

    pub fn process(&mut self) -> &mut ProcessHandle {
        &mut self.handle
    }

    /// Stop the node with the configured mode and deadline
    pub async fn stop(&mut self) -> ShutdownOutcome {
        self.stop_with(self.settings.shutdown_mode, self.settings.shutdown_timeout)
            .await
    }

    /// Stop the node, cleaning up on confirmed exit and flagging it otherwise
    pub async fn stop_with(&mut self, mode: ShutdownMode, deadline: Duration) -> ShutdownOutcome {
        log_shutdown(
            Component::Supervisor,
            &format!("cluster '{}' ({:?})", self.config.cluster_name(), mode),
        );

        let outcome = ShutdownCoordinator::new()
            .shutdown(&mut self.handle, mode, deadline)
            .await;

        if outcome.is_exited() {
            self.exit_confirmed = true;
            remove_pid_file(self.handle.pid_file());

            if self.settings.cleanup_artifacts {
                let provisioner = ArtifactProvisioner::new(&self.settings.working_dir);
                if let Err(e) = provisioner.cleanup(&self.settings.artifact_uri).await {
                    component_warn!(Component::Supervisor, "Artifact cleanup failed: {}", e);
                }
            }
        } else {
            match absolute_path(&self.settings.working_dir) {
                Ok(working_dir) => flag_stale_node(&working_dir, &self.config, &outcome),
                Err(e) => {
                    component_warn!(Component::Supervisor, "Cannot resolve working dir: {}", e);
                }
            }
        }

        outcome
    }

    /// Force the node down after a shutdown that did not complete
    pub async fn kill(&mut self) -> SupervisorResult<ExitStatus> {
        let status = self.handle.kill().await?;
        self.exit_confirmed = true;
        remove_pid_file(self.handle.pid_file());
        component_info!(Component::Supervisor, "Node {} killed ({})", self.cluster(), status);
        Ok(status)
    }
}

impl Drop for ClusterSession {
    fn drop(&mut self) {
        if !self.exit_confirmed && self.handle.is_running() {
            component_warn!(
                Component::Supervisor,
                "⚠️ Session for {} dropped while the node may still be running; manual cleanup may be needed",
                self.handle.cluster()
            );
        }
    }
}

fn remove_pid_file(pid_file: &Path) {
    if let Err(e) = std::fs::remove_file(pid_file) {
        if e.kind() != std::io::ErrorKind::NotFound {
            component_warn!(
                Component::Supervisor,
                "Cannot remove pid file {}: {}",
                pid_file.display(),
                e
            );
        }
    }
}

/// Write a stale-node marker and warn; failures to write are only logged
fn flag_stale_node(working_dir: &Path, config: &ClusterConfig, outcome: &ShutdownOutcome) {
    let pid = outcome.pid();
    let detail = match outcome {
        ShutdownOutcome::TimedOut { deadline, .. } => format!("still running after {deadline:?}"),
        ShutdownOutcome::SignalFailed(e) => e.to_string(),
        ShutdownOutcome::Exited { .. } => String::new(),
    };

    let record = StaleNodeRecord {
        pid,
        http_port: config.http_port(),
        transport_port: config.transport_port(),
        cluster_name: config.cluster_name().to_string(),
        outcome: outcome.label().to_string(),
        detail,
        recorded_at: Utc::now(),
    };
    let path = working_dir.join(StaleNodeRecord::file_name(pid));

    let written = serde_json::to_string_pretty(&record)
        .map_err(SupervisorError::from)
        .and_then(|json| std::fs::write(&path, json).map_err(SupervisorError::from));

    match written {
        Ok(()) => {
            component_warn!(
                Component::Supervisor,
                "⚠️ Node {} (pid {:?}) {}; manual cleanup may be needed, see {}",
                config.cluster(),
                pid,
                outcome.label(),
                path.display()
            );
        }
        Err(e) => {
            component_warn!(
                Component::Supervisor,
                "⚠️ Node {} (pid {:?}) {}; manual cleanup may be needed (marker not written: {})",
                config.cluster(),
                pid,
                outcome.label(),
                e
            );
        }
    }
}

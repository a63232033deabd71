//! Handle for the supervised node process
//!
//! The handle owns the tokio `Child` for exactly one node. The pid used for
//! signalling is read back from the pid file the node writes at startup and
//! is never assumed from the spawn call. Once exit has been observed the
//! status is recorded and the handle is never signalled again.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use shared::{component_debug, component_warn, ClusterHandle, Component};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::Instant;

use crate::error::{SupervisorError, SupervisorResult};

/// Pid file the node writes into its working directory
///
/// Keyed by http port, so sessions sharing a working directory never read
/// each other's pid.
pub fn pid_file_name(http_port: u16) -> String {
    format!("crate-{http_port}.pid")
}

pub struct ProcessHandle {
    child: Child,
    pid_file: PathBuf,
    cluster: ClusterHandle,
    spawned_at: Instant,
    exit_status: Option<ExitStatus>,
}

impl ProcessHandle {
    pub(crate) fn new(child: Child, pid_file: PathBuf, cluster: ClusterHandle) -> Self {
        Self {
            child,
            pid_file,
            cluster,
            spawned_at: Instant::now(),
            exit_status: None,
        }
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    pub fn cluster(&self) -> ClusterHandle {
        self.cluster
    }

    /// OS id of the spawned child, `None` once it has been reaped
    pub fn child_id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn uptime(&self) -> Duration {
        self.spawned_at.elapsed()
    }

    /// Exit status, if exit has already been observed
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Read the node's pid from its pid file
    pub fn resolve_pid(&self) -> SupervisorResult<Pid> {
        let content = std::fs::read_to_string(&self.pid_file)
            .map_err(|e| SupervisorError::pid_resolution(&self.pid_file, e))?;

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SupervisorError::pid_resolution(&self.pid_file, "pid file is empty"));
        }

        let raw: i32 = trimmed.parse().map_err(|e| {
            SupervisorError::pid_resolution(&self.pid_file, format!("invalid pid '{trimmed}': {e}"))
        })?;

        // 0 and negative values address process groups, never a single node
        if raw <= 0 {
            return Err(SupervisorError::pid_resolution(
                &self.pid_file,
                format!("invalid pid {raw}"),
            ));
        }

        Ok(Pid::from_raw(raw))
    }

    /// Check for exit without blocking, recording the status when seen
    pub fn try_exit_status(&mut self) -> SupervisorResult<Option<ExitStatus>> {
        if self.exit_status.is_some() {
            return Ok(self.exit_status);
        }

        let status = self.child.try_wait()?;
        if status.is_some() {
            self.exit_status = status;
        }
        Ok(status)
    }

    /// Check if the node process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.try_exit_status(), Ok(None))
    }

    /// Block until the child exits; cancel-safe, so it can sit under a timeout
    pub(crate) async fn wait_exit(&mut self) -> std::io::Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }

        let status = self.child.wait().await?;
        self.exit_status = Some(status);
        Ok(status)
    }

    /// Forcefully kill the node and wait for the spawned child to exit
    ///
    /// This is the explicit escalation step after a timed-out shutdown; the
    /// shutdown path never calls it on its own. SIGKILL goes to the pid from
    /// the pid file, which need not be the spawned child when the node runs
    /// under an interpreter or forks. The child is killed and reaped after.
    pub async fn kill(&mut self) -> SupervisorResult<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }

        match self.resolve_pid() {
            Ok(pid) => match kill(pid, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {
                    component_debug!(Component::Shutdown, "Sent SIGKILL to node pid {}", pid);
                }
                Err(errno) => {
                    return Err(SupervisorError::SignalDeliveryFailure {
                        pid: pid.as_raw(),
                        signal: Signal::SIGKILL.as_str().to_string(),
                        errno: errno.to_string(),
                    });
                }
            },
            Err(e) => {
                component_warn!(
                    Component::Shutdown,
                    "Killing spawned child only, node pid unknown: {}",
                    e
                );
            }
        }

        // The child may already be gone with the node it wrapped
        if let Err(e) = self.child.kill().await {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                return Err(e.into());
            }
        }
        self.wait_exit().await.map_err(SupervisorError::from)
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("child_id", &self.child.id())
            .field("pid_file", &self.pid_file)
            .field("cluster", &self.cluster)
            .field("exit_status", &self.exit_status)
            .finish()
    }
}

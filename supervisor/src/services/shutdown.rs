//! Node shutdown
//!
//! Sends the stop signal to the pid the node recorded in its pid file, then
//! waits for exit with a bounded deadline. A node that outlives the deadline
//! is reported, not killed; escalation is left to the caller.

use nix::sys::signal::{kill, Signal};
use serde::{Deserialize, Serialize};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::time::{timeout, Instant};

use crate::error::{SupervisorError, SupervisorResult};
use crate::process::ProcessHandle;
use shared::{component_debug, component_error, component_info, component_warn, Component};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    /// Plain terminate request
    Hard,
    /// Let the node drain its shards before exiting
    Graceful,
}

impl ShutdownMode {
    pub fn signal(self) -> Signal {
        match self {
            ShutdownMode::Hard => Signal::SIGTERM,
            ShutdownMode::Graceful => Signal::SIGUSR2,
        }
    }
}

#[derive(Debug)]
pub enum ShutdownOutcome {
    Exited {
        pid: Option<i32>,
        status: ExitStatus,
        elapsed: Duration,
    },
    /// The node is still running; it may need manual cleanup
    TimedOut { pid: i32, deadline: Duration },
    SignalFailed(SupervisorError),
}

impl ShutdownOutcome {
    pub fn is_exited(&self) -> bool {
        matches!(self, ShutdownOutcome::Exited { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShutdownOutcome::Exited { .. } => "exited",
            ShutdownOutcome::TimedOut { .. } => "timed_out",
            ShutdownOutcome::SignalFailed(_) => "signal_failed",
        }
    }

    /// Pid the outcome refers to, when one was resolved
    pub fn pid(&self) -> Option<i32> {
        match self {
            ShutdownOutcome::Exited { pid, .. } => *pid,
            ShutdownOutcome::TimedOut { pid, .. } => Some(*pid),
            ShutdownOutcome::SignalFailed(SupervisorError::SignalDeliveryFailure { pid, .. }) => {
                Some(*pid)
            }
            ShutdownOutcome::SignalFailed(_) => None,
        }
    }

    /// Exit status on success, the classifying error otherwise
    pub fn into_result(self) -> SupervisorResult<ExitStatus> {
        match self {
            ShutdownOutcome::Exited { status, .. } => Ok(status),
            ShutdownOutcome::TimedOut { pid, deadline } => {
                Err(SupervisorError::ShutdownTimeout { pid, deadline })
            }
            ShutdownOutcome::SignalFailed(e) => Err(e),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShutdownCoordinator;

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Signal the node and wait up to `deadline` for it to exit
    pub async fn shutdown(
        &self,
        handle: &mut ProcessHandle,
        mode: ShutdownMode,
        deadline: Duration,
    ) -> ShutdownOutcome {
        let started = Instant::now();

        match handle.try_exit_status() {
            Ok(Some(status)) => {
                component_info!(
                    Component::Shutdown,
                    "Node {} already exited with {}; nothing to signal",
                    handle.cluster(),
                    status
                );
                return ShutdownOutcome::Exited {
                    pid: handle.resolve_pid().ok().map(|pid| pid.as_raw()),
                    status,
                    elapsed: started.elapsed(),
                };
            }
            Ok(None) => {}
            Err(e) => {
                component_debug!(Component::Shutdown, "Cannot poll child status: {}", e);
            }
        }

        let pid = match handle.resolve_pid() {
            Ok(pid) => pid,
            Err(e) => {
                component_error!(Component::Shutdown, "❌ {}", e);
                return ShutdownOutcome::SignalFailed(e);
            }
        };

        let signal = mode.signal();
        component_info!(
            Component::Shutdown,
            "🛑 Sending {} to node pid {} ({:?} shutdown, deadline {:?})",
            signal,
            pid,
            mode,
            deadline
        );

        if let Err(errno) = kill(pid, signal) {
            let err = SupervisorError::SignalDeliveryFailure {
                pid: pid.as_raw(),
                signal: signal.as_str().to_string(),
                errno: errno.to_string(),
            };
            component_error!(Component::Shutdown, "❌ {}", err);
            return ShutdownOutcome::SignalFailed(err);
        }

        // The exit status is retained by the OS, so waiting after the signal loses nothing
        match timeout(deadline, handle.wait_exit()).await {
            Ok(Ok(status)) => {
                let elapsed = started.elapsed();
                component_info!(
                    Component::Shutdown,
                    "✅ Node pid {} exited with {} after {:?}",
                    pid,
                    status,
                    elapsed
                );
                ShutdownOutcome::Exited {
                    pid: Some(pid.as_raw()),
                    status,
                    elapsed,
                }
            }
            Ok(Err(e)) => {
                component_warn!(
                    Component::Shutdown,
                    "⚠️ Lost track of node pid {} while waiting: {}",
                    pid,
                    e
                );
                ShutdownOutcome::TimedOut {
                    pid: pid.as_raw(),
                    deadline,
                }
            }
            Err(_) => {
                component_warn!(
                    Component::Shutdown,
                    "⏰ Node pid {} still running after {:?}; it may need manual cleanup",
                    pid,
                    deadline
                );
                ShutdownOutcome::TimedOut {
                    pid: pid.as_raw(),
                    deadline,
                }
            }
        }
    }
}

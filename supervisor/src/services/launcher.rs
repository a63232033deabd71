//! Node process launcher
//!
//! Spawns the distribution's node script as a child process in the working
//! directory and returns as soon as the spawn succeeds. Readiness and pid
//! lookup are left to the poller and the shutdown path.

use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::absolute_path;
use super::process_output_handler::{configure_child_stdio, spawn_output_consumers};
use crate::config::ClusterConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::process::{pid_file_name, ProcessHandle};
use shared::{component_debug, component_info, Component};

/// Node start script, relative to the distribution root
pub const NODE_SCRIPT: &str = "bin/crate";

pub struct ProcessLauncher {
    executable: PathBuf,
    working_dir: PathBuf,
    interpreter: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new<E: Into<PathBuf>, W: Into<PathBuf>>(executable: E, working_dir: W) -> Self {
        Self {
            executable: executable.into(),
            working_dir: working_dir.into(),
            interpreter: None,
        }
    }

    /// Launcher for the node script of an extracted distribution
    pub fn for_distribution(distribution: &Path, working_dir: &Path) -> Self {
        Self::new(distribution.join(NODE_SCRIPT), working_dir)
    }

    /// Run the executable through an interpreter such as `/bin/sh`
    pub fn with_interpreter(mut self, interpreter: Option<PathBuf>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Program and full argument vector for `config`
    pub fn command_line(&self, config: &ClusterConfig) -> SupervisorResult<(PathBuf, Vec<String>)> {
        let executable = absolute_path(&self.executable)?;
        let pid_file = absolute_path(&self.working_dir)?
            .join(pid_file_name(config.http_port()));
        let node_args = config.to_args(&pid_file);

        Ok(match &self.interpreter {
            Some(interpreter) => {
                let mut args = Vec::with_capacity(node_args.len() + 1);
                args.push(executable.to_string_lossy().into_owned());
                args.extend(node_args);
                (interpreter.clone(), args)
            }
            None => (executable, node_args),
        })
    }

    /// Spawn the node; returns immediately without waiting for readiness
    pub fn launch(&self, config: &ClusterConfig) -> SupervisorResult<ProcessHandle> {
        let working_dir = absolute_path(&self.working_dir)?;
        let pid_file = working_dir.join(pid_file_name(config.http_port()));
        let (program, args) = self.command_line(config)?;
        let program_name = program.display().to_string();

        if !working_dir.is_dir() {
            return Err(SupervisorError::LaunchFailure {
                program: program_name,
                reason: format!("working directory {} does not exist", working_dir.display()),
            });
        }

        // A pid left over from an earlier run would point shutdown at the wrong process
        match std::fs::remove_file(&pid_file) {
            Ok(()) => {
                component_debug!(Component::Launcher, "Removed stale pid file {}", pid_file.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SupervisorError::LaunchFailure {
                    program: program_name,
                    reason: format!("cannot remove stale pid file {}: {e}", pid_file.display()),
                })
            }
        }

        let mut cmd = Command::new(&program);
        cmd.args(&args).current_dir(&working_dir);
        configure_child_stdio(&mut cmd);

        let mut child = cmd.spawn().map_err(|e| SupervisorError::LaunchFailure {
            program: program_name.clone(),
            reason: e.to_string(),
        })?;

        let cluster = config.cluster();
        spawn_output_consumers(&mut child, cluster.to_string());

        component_info!(
            Component::Launcher,
            "🚀 Spawned node (child {}) cluster '{}' on {}",
            child.id().unwrap_or(0),
            config.cluster_name(),
            cluster
        );
        component_debug!(Component::Launcher, "Command: {} {}", program_name, args.join(" "));

        Ok(ProcessHandle::new(child, pid_file, cluster))
    }
}

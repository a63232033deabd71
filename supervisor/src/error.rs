//! Supervisor-specific error types

use shared::SharedError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Provisioning failed for {uri}: {reason}")]
    ProvisioningFailure { uri: String, reason: String },

    #[error("Failed to launch {program}: {reason}")]
    LaunchFailure { program: String, reason: String },

    #[error("Node on http port {http_port} not ready after {elapsed:?} (exit status: {exit_status:?})")]
    ReadinessTimeout {
        http_port: u16,
        elapsed: Duration,
        exit_status: Option<String>,
    },

    #[error("Cannot resolve pid from {path}: {reason}")]
    PidResolutionFailure { path: PathBuf, reason: String },

    #[error("Failed to deliver {signal} to pid {pid}: {errno}")]
    SignalDeliveryFailure {
        pid: i32,
        signal: String,
        errno: String,
    },

    #[error("Node pid {pid} did not exit within {deadline:?}")]
    ShutdownTimeout { pid: i32, deadline: Duration },

    #[error("Health probe on http port {http_port} failed: {message}")]
    ProbeFailure { http_port: u16, message: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl SupervisorError {
    pub fn provisioning(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::ProvisioningFailure {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub fn pid_resolution(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::PidResolutionFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }

    /// Whether the failure ends the supervised session outright
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ProvisioningFailure { .. } | Self::LaunchFailure { .. }
        )
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;

//! Supervisor Settings
//!
//! Everything that drives a session apart from the node's own settings:
//! where the distribution comes from, where it runs, and how long each
//! blocking step may take.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::shutdown::ShutdownMode;

pub const DEFAULT_CRATE_VERSION: &str = "0.50.2";
pub const CDN_URL: &str = "https://cdn.crate.io/downloads/releases";

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Release archive URI for a given version
pub fn release_uri(version: &str) -> String {
    format!("{CDN_URL}/crate-{version}.tar.gz")
}

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub artifact_uri: String,
    pub working_dir: PathBuf,
    /// Program used to run the node script (e.g. `/bin/sh`); `None` executes it directly
    pub interpreter: Option<PathBuf>,
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
    pub ready_timeout: Duration,
    pub shutdown_mode: ShutdownMode,
    pub shutdown_timeout: Duration,
    pub cleanup_artifacts: bool,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            artifact_uri: release_uri(DEFAULT_CRATE_VERSION),
            working_dir: PathBuf::from("."),
            interpreter: None,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            shutdown_mode: ShutdownMode::Hard,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            cleanup_artifacts: true,
        }
    }
}

impl SupervisorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden from the environment (and `.env`, if present)
    ///
    /// Reads `CRATE_ARTIFACT_URI`, falling back to `CRATE_VERSION`, and
    /// `SUPERVISOR_WORK_DIR`.
    pub fn from_env() -> Self {
        // Safe to call repeatedly; already-set variables win
        let _ = dotenv::dotenv();

        let mut settings = Self::default();

        if let Ok(uri) = env::var("CRATE_ARTIFACT_URI") {
            settings.artifact_uri = uri;
        } else if let Ok(version) = env::var("CRATE_VERSION") {
            settings.artifact_uri = release_uri(&version);
        }

        if let Ok(dir) = env::var("SUPERVISOR_WORK_DIR") {
            settings.working_dir = PathBuf::from(dir);
        }

        settings
    }

    pub fn with_artifact_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.artifact_uri = uri.into();
        self
    }

    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_interpreter<P: Into<PathBuf>>(mut self, interpreter: P) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_shutdown(mut self, mode: ShutdownMode, timeout: Duration) -> Self {
        self.shutdown_mode = mode;
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_cleanup_artifacts(mut self, cleanup: bool) -> Self {
        self.cleanup_artifacts = cleanup;
        self
    }
}

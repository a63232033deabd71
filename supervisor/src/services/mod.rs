//! Service implementations
//!
//! The four stages of a supervised node's life: provisioning the
//! distribution, launching the node, waiting for readiness, and shutting it
//! down.

pub mod launcher;
pub mod process_output_handler;
pub mod provisioner;
pub mod readiness;
pub mod shutdown;

#[cfg(test)]
mod tests;

pub use launcher::ProcessLauncher;
pub use provisioner::{ArtifactProvisioner, HttpArtifactFetcher};
pub use readiness::{HttpHealthProbe, ReadinessEvent, ReadinessPoller, ReadinessState};
pub use shutdown::{ShutdownCoordinator, ShutdownMode, ShutdownOutcome};

use std::path::{Path, PathBuf};

/// Resolve `path` against the current directory if it is relative
pub(crate) fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

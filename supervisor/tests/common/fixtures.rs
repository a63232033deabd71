//! Test fixtures for supervised sessions
//!
//! A fake distribution is a tarball with the same layout as a real release:
//! `<name>/bin/crate`. The script honours `-p <pid_file>` and never listens
//! on any port; readiness is answered by a wiremock server standing in for
//! the node's HTTP endpoint.

use std::path::{Path, PathBuf};
use std::process::Command;
use url::Url;

pub struct TestFixtures;

impl TestFixtures {
    pub const DIST_NAME: &'static str = "crate-9.9.9";
    pub const SHELL: &'static str = "/bin/sh";

    /// Writes its pid and sleeps until terminated
    pub const COOPERATIVE_NODE: &'static str = "echo $$ > \"$2\"\nexec sleep 60\n";

    /// Writes its pid and ignores both stop signals
    pub const STUBBORN_NODE: &'static str = "trap '' TERM USR2\necho $$ > \"$2\"\nexec sleep 60\n";

    /// Build `<dir>/<DIST_NAME>.tar.gz` with `script` as `bin/crate` and return its file URI
    pub fn distribution(dir: &Path, script: &str) -> String {
        let staging = dir.join("staging");
        let bin = staging.join(Self::DIST_NAME).join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("crate"), format!("#!/bin/sh\n{script}")).unwrap();

        let archive = dir.join(format!("{}.tar.gz", Self::DIST_NAME));
        let status = Command::new("tar")
            .arg("-C")
            .arg(&staging)
            .arg("-czf")
            .arg(&archive)
            .arg(Self::DIST_NAME)
            .status()
            .unwrap();
        assert!(status.success(), "tar failed building fixture archive");

        Url::from_file_path(&archive).unwrap().to_string()
    }

    pub fn archive_in(work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}.tar.gz", Self::DIST_NAME))
    }

    pub fn distribution_in(work_dir: &Path) -> PathBuf {
        work_dir.join(Self::DIST_NAME)
    }
}

//! Service-specific tests
//!
//! Each service has its own test file. Node processes are stood in for by
//! small `/bin/sh` scripts that honour `-p <pid_file>` the way the real
//! node does.


// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use crate::config::ClusterConfig;
    use crate::process::ProcessHandle;
    use crate::services::ProcessLauncher;

    pub const SHELL: &str = "/bin/sh";

    /// Writes its pid and sleeps; dies on SIGTERM
    pub const COOPERATIVE_NODE: &str = "echo $$ > \"$2\"\nexec sleep 30\n";

    /// Writes its pid and ignores both stop signals
    pub const STUBBORN_NODE: &str = "trap '' TERM USR2\necho $$ > \"$2\"\nexec sleep 30\n";

    /// Exits cleanly on the graceful stop signal
    pub const GRACEFUL_NODE: &str =
        "trap 'exit 0' USR2\necho $$ > \"$2\"\nwhile true; do sleep 1; done\n";

    /// Never writes a pid file
    pub const SILENT_NODE: &str = "exec sleep 30\n";

    /// Records a pid that cannot belong to any process
    pub const BOGUS_PID_NODE: &str = "echo 2000000000 > \"$2\"\nexec sleep 30\n";

    /// Writes its pid and exits straight away
    pub const SHORT_LIVED_NODE: &str = "echo $$ > \"$2\"\nexit 3\n";

    /// Wrapper that forks the real node; the pid file names the forked process
    pub const FORKING_NODE: &str =
        "sh -c 'trap \"\" TERM USR2; echo $$ > \"$1\"; exec sleep 30' node \"$2\" &\nwait\n";

    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        path
    }

    pub fn test_config(http_port: u16, transport_port: u16) -> ClusterConfig {
        ClusterConfig::builder()
            .http_port(http_port)
            .transport_port(transport_port)
            .build()
            .unwrap()
    }

    /// Launch `body` as a fake node in `dir`
    pub fn launch_script(dir: &Path, body: &str) -> ProcessHandle {
        launch_script_on(dir, body, 44250)
    }

    /// Launch `body` as a fake node serving `http_port`
    pub fn launch_script_on(dir: &Path, body: &str, http_port: u16) -> ProcessHandle {
        let script = write_script(dir, &format!("node-{http_port}.sh"), body);
        ProcessLauncher::new(script, dir)
            .with_interpreter(Some(PathBuf::from(SHELL)))
            .launch(&test_config(http_port, http_port + 100))
            .unwrap()
    }

    /// Whether `pid` names a live process; zombies count as gone
    pub fn pid_alive(pid: i32) -> bool {
        match nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None) {
            Ok(()) => std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .map(|stat| {
                    stat.rsplit_once(") ")
                        .map(|(_, rest)| !rest.starts_with('Z'))
                        .unwrap_or(true)
                })
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Wait up to a few seconds for `pid` to disappear
    pub async fn wait_for_pid_gone(pid: i32) -> bool {
        for _ in 0..100 {
            if !pid_alive(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    /// Wait until the fake node has written its pid file
    pub async fn wait_for_pid_file(handle: &ProcessHandle) {
        for _ in 0..100 {
            if std::fs::read_to_string(handle.pid_file())
                .map(|content| content.ends_with('\n'))
                .unwrap_or(false)
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("pid file {} never appeared", handle.pid_file().display());
    }
}

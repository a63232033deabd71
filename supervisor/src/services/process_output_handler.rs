//! Helper to handle node stdout/stderr output
//!
//! Node output is always piped and consumed so the child can never block on
//! a full pipe. Each line is re-emitted as a debug event tagged with the
//! node's ports, which keeps node logs next to the supervisor's own.

use shared::{component_debug, Component};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// Configure stdio for a node process
pub fn configure_child_stdio(cmd: &mut Command) {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null());
}

/// Spawn tasks that drain the child's pipes into the tracing log
pub fn spawn_output_consumers(child: &mut Child, node: String) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, node.clone(), "stdout"));
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, node, "stderr"));
    }
}

async fn forward_lines<R>(reader: R, node: String, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        component_debug!(Component::Launcher, node = %node, stream, "{}", line);
    }
}

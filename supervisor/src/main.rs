//! Main entry point for the supervisor binary
//!
//! Starts one supervised node, prints the properties an adapter needs to
//! reach it, and stops it again.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;

use shared::{component_info, logging, Component, HOSTS_PROPERTY};
use supervisor::{
    ClusterConfig, ClusterSession, ShutdownMode, SupervisorResult, SupervisorSettings,
};

/// Supervisor for a single-node CrateDB test cluster
#[derive(Parser)]
#[command(name = "supervisor")]
#[command(about = "Provisions, starts and stops a single-node CrateDB cluster for tests")]
pub struct Args {
    /// Distribution archive URI (http, https or file); overrides CRATE_ARTIFACT_URI
    #[arg(long)]
    pub artifact_uri: Option<String>,

    /// Working directory for the distribution and pid file; overrides SUPERVISOR_WORK_DIR
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    #[arg(long, default_value = "testcluster")]
    pub cluster_name: String,

    /// HTTP port (random pick from the reserved range if not set)
    #[arg(long)]
    pub http_port: Option<u16>,

    /// Transport port (random pick from the reserved range if not set)
    #[arg(long)]
    pub transport_port: Option<u16>,

    #[arg(long, default_value = "60")]
    pub ready_timeout_secs: u64,

    #[arg(long, default_value = "1000")]
    pub probe_interval_ms: u64,

    #[arg(long, default_value = "60")]
    pub shutdown_timeout_secs: u64,

    /// Stop the node with the graceful signal instead of a plain terminate
    #[arg(long)]
    pub graceful: bool,

    /// Keep the node running until Ctrl+C
    #[arg(long)]
    pub keep_running: bool,

    /// Leave the archive and extracted distribution in place after stopping
    #[arg(long)]
    pub keep_artifacts: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    fn settings(&self) -> SupervisorSettings {
        let mut settings = SupervisorSettings::from_env();

        if let Some(ref uri) = self.artifact_uri {
            settings = settings.with_artifact_uri(uri.clone());
        }
        if let Some(ref dir) = self.work_dir {
            settings = settings.with_working_dir(dir.clone());
        }

        let mode = if self.graceful {
            ShutdownMode::Graceful
        } else {
            ShutdownMode::Hard
        };

        settings
            .with_ready_timeout(Duration::from_secs(self.ready_timeout_secs))
            .with_probe_interval(Duration::from_millis(self.probe_interval_ms))
            .with_shutdown(mode, Duration::from_secs(self.shutdown_timeout_secs))
            .with_cleanup_artifacts(!self.keep_artifacts)
    }

    fn cluster_config(&self) -> SupervisorResult<ClusterConfig> {
        let mut builder = ClusterConfig::builder().cluster_name(self.cluster_name.clone());

        if let Some(port) = self.http_port {
            builder = builder.http_port(port);
        }
        if let Some(port) = self.transport_port {
            builder = builder.transport_port(port);
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> SupervisorResult<()> {
    let args = Args::parse();

    logging::validate_log_level(&args.log_level)?;
    logging::init_tracing(Some(&args.log_level));

    let settings = args.settings();
    let config = args.cluster_config()?;

    let mut session = ClusterSession::start(settings, config).await?;
    let cluster = session.cluster();

    println!("{}={}", HOSTS_PROPERTY, cluster.hosts());
    println!("http={}", cluster.http_url());

    if args.keep_running {
        component_info!(Component::Supervisor, "Node running on {}; press Ctrl+C to stop", cluster);
        if let Err(err) = signal::ctrl_c().await {
            logging::log_error(Component::Supervisor, "Signal handling", &err);
        }
    }

    let outcome = session.stop().await;
    match outcome.into_result() {
        Ok(status) => {
            logging::log_success(Component::Supervisor, &format!("Node stopped ({status})"));
            Ok(())
        }
        Err(e) => {
            logging::log_error(Component::Supervisor, "Shutdown", &e);
            Err(e)
        }
    }
}


//! Helper functions for session tests

use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use supervisor::{ClusterConfig, ClusterSession, SupervisorSettings};

use super::TestFixtures;

pub struct TestHelpers;

impl TestHelpers {
    /// HTTP endpoint that answers every probe with `status`
    pub async fn node_endpoint(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    /// Fast-polling settings for a fake distribution run through the shell
    pub fn settings(artifact_uri: &str, work_dir: &Path) -> SupervisorSettings {
        SupervisorSettings::new()
            .with_artifact_uri(artifact_uri)
            .with_working_dir(work_dir)
            .with_interpreter(TestFixtures::SHELL)
            .with_probe_interval(Duration::from_millis(50))
            .with_probe_timeout(Duration::from_secs(1))
            .with_ready_timeout(Duration::from_secs(5))
    }

    /// Config whose http port is the mock endpoint's port
    pub fn config_for(endpoint: &MockServer) -> ClusterConfig {
        ClusterConfig::builder()
            .http_port(endpoint.address().port())
            .build()
            .unwrap()
    }

    /// Wait until the fake node has recorded its pid
    pub async fn wait_for_pid(session: &mut ClusterSession) {
        let pid_file = session.process().pid_file().to_path_buf();
        for _ in 0..100 {
            if std::fs::read_to_string(&pid_file)
                .map(|content| content.ends_with('\n'))
                .unwrap_or(false)
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("pid file {} never appeared", pid_file.display());
    }
}

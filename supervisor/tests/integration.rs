//! End-to-end tests for supervised sessions
//!
//! Each test provisions a fake distribution from a local tarball, launches
//! it, waits for a mock HTTP endpoint to report ready and stops it again.

use assert_matches::assert_matches;
use std::time::Duration;

use shared::HOSTS_PROPERTY;
use supervisor::process::pid_file_name;
use supervisor::{ClusterSession, ShutdownMode, ShutdownOutcome, StaleNodeRecord, SupervisorError};

mod common;
use common::{TestFixtures, TestHelpers};

/// Full lifecycle: provision, launch, ready, stop, clean up
#[tokio::test]
async fn test_session_lifecycle() {
    // Arrange
    let fixtures = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let uri = TestFixtures::distribution(fixtures.path(), TestFixtures::COOPERATIVE_NODE);
    let endpoint = TestHelpers::node_endpoint(200).await;
    let config = TestHelpers::config_for(&endpoint);
    let transport_port = config.transport_port();

    // Act
    let mut session = ClusterSession::start(TestHelpers::settings(&uri, work.path()), config)
        .await
        .unwrap();
    TestHelpers::wait_for_pid(&mut session).await;

    // Assert
    let cluster = session.cluster();
    assert_eq!(cluster.http_port, endpoint.address().port());
    assert_eq!(
        cluster.adapter_properties().get(HOSTS_PROPERTY),
        Some(&format!("localhost:{transport_port}"))
    );
    assert_eq!(session.distribution(), TestFixtures::distribution_in(work.path()));
    assert!(session.process().is_running());

    let pid_file = session.process().pid_file().to_path_buf();
    let outcome = session.stop().await;

    assert_matches!(outcome, ShutdownOutcome::Exited { .. });
    assert!(!pid_file.exists());
    assert!(!TestFixtures::distribution_in(work.path()).exists());
    assert!(!TestFixtures::archive_in(work.path()).exists());
}

/// Artifacts survive a stop when cleanup is disabled
#[tokio::test]
async fn test_keep_artifacts() {
    let fixtures = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let uri = TestFixtures::distribution(fixtures.path(), TestFixtures::COOPERATIVE_NODE);
    let endpoint = TestHelpers::node_endpoint(200).await;

    let settings = TestHelpers::settings(&uri, work.path()).with_cleanup_artifacts(false);
    let mut session = ClusterSession::start(settings, TestHelpers::config_for(&endpoint))
        .await
        .unwrap();
    TestHelpers::wait_for_pid(&mut session).await;

    let outcome = session.stop_with(ShutdownMode::Hard, Duration::from_secs(5)).await;

    assert!(outcome.is_exited());
    assert!(TestFixtures::distribution_in(work.path()).join("bin/crate").is_file());
}

/// A node that never becomes ready is stopped and reported
#[tokio::test]
async fn test_readiness_timeout_stops_node() {
    let fixtures = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let uri = TestFixtures::distribution(fixtures.path(), TestFixtures::COOPERATIVE_NODE);
    let endpoint = TestHelpers::node_endpoint(503).await;
    let http_port = endpoint.address().port();

    let settings = TestHelpers::settings(&uri, work.path())
        .with_ready_timeout(Duration::from_secs(1))
        .with_shutdown(ShutdownMode::Hard, Duration::from_secs(5));
    let result = ClusterSession::start(settings, TestHelpers::config_for(&endpoint)).await;

    assert_matches!(
        result,
        Err(SupervisorError::ReadinessTimeout { http_port: port, elapsed, exit_status: None }) => {
            assert_eq!(port, http_port);
            assert!(elapsed >= Duration::from_secs(1));
        }
    );

    // The node was stopped, so nothing is flagged for manual cleanup
    assert!(!work.path().join(pid_file_name(http_port)).exists());
    let stale = std::fs::read_dir(work.path())
        .unwrap()
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().starts_with("stale-node-"));
    assert!(!stale);
}

/// Unreachable source is a fatal provisioning error and nothing is launched
#[tokio::test]
async fn test_missing_artifact_fails_provisioning() {
    let work = tempfile::tempdir().unwrap();
    let endpoint = TestHelpers::node_endpoint(200).await;
    let uri = format!(
        "file://{}/missing/{}.tar.gz",
        work.path().display(),
        TestFixtures::DIST_NAME
    );

    let config = TestHelpers::config_for(&endpoint);
    let pid_file = work.path().join(pid_file_name(config.http_port()));

    let result = ClusterSession::start(TestHelpers::settings(&uri, work.path()), config).await;

    assert_matches!(result, Err(SupervisorError::ProvisioningFailure { .. }));
    assert!(!pid_file.exists());
}

/// A node that ignores the stop signal is flagged, then killed explicitly
#[tokio::test]
async fn test_timed_out_stop_writes_stale_marker() {
    let fixtures = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let uri = TestFixtures::distribution(fixtures.path(), TestFixtures::STUBBORN_NODE);
    let endpoint = TestHelpers::node_endpoint(200).await;
    let config = TestHelpers::config_for(&endpoint);
    let http_port = config.http_port();

    let mut session = ClusterSession::start(TestHelpers::settings(&uri, work.path()), config)
        .await
        .unwrap();
    TestHelpers::wait_for_pid(&mut session).await;

    let outcome = session
        .stop_with(ShutdownMode::Hard, Duration::from_millis(300))
        .await;

    let pid = assert_matches!(outcome, ShutdownOutcome::TimedOut { pid, .. } => pid);
    assert!(session.process().is_running());

    let marker = work.path().join(StaleNodeRecord::file_name(Some(pid)));
    let record: StaleNodeRecord =
        serde_json::from_str(&std::fs::read_to_string(&marker).unwrap()).unwrap();
    assert_eq!(record.pid, Some(pid));
    assert_eq!(record.http_port, http_port);
    assert_eq!(record.outcome, "timed_out");

    let status = session.kill().await.unwrap();
    assert!(!status.success());
    assert!(!session.process().is_running());
}

/// Two sessions on disjoint ports run side by side
#[tokio::test]
async fn test_concurrent_sessions_do_not_interfere() {
    let fixtures = tempfile::tempdir().unwrap();
    let work_a = tempfile::tempdir().unwrap();
    let work_b = tempfile::tempdir().unwrap();
    let uri = TestFixtures::distribution(fixtures.path(), TestFixtures::COOPERATIVE_NODE);
    let endpoint_a = TestHelpers::node_endpoint(200).await;
    let endpoint_b = TestHelpers::node_endpoint(200).await;

    let (a, b) = tokio::join!(
        ClusterSession::start(
            TestHelpers::settings(&uri, work_a.path()),
            TestHelpers::config_for(&endpoint_a)
        ),
        ClusterSession::start(
            TestHelpers::settings(&uri, work_b.path()),
            TestHelpers::config_for(&endpoint_b)
        ),
    );
    let (mut a, mut b) = (a.unwrap(), b.unwrap());
    TestHelpers::wait_for_pid(&mut a).await;
    TestHelpers::wait_for_pid(&mut b).await;

    assert_ne!(a.cluster().http_port, b.cluster().http_port);
    assert_ne!(
        a.process().resolve_pid().unwrap(),
        b.process().resolve_pid().unwrap()
    );

    // Stopping one leaves the other running
    assert!(a.stop().await.is_exited());
    assert!(b.process().is_running());
    assert!(b.stop().await.is_exited());
}

/// Sessions sharing one working directory each stop only their own node
#[tokio::test]
async fn test_sessions_sharing_working_dir() {
    let fixtures = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let uri = TestFixtures::distribution(fixtures.path(), TestFixtures::COOPERATIVE_NODE);
    let endpoint_a = TestHelpers::node_endpoint(200).await;
    let endpoint_b = TestHelpers::node_endpoint(200).await;

    // The shared distribution must outlive the first stop
    let settings = TestHelpers::settings(&uri, work.path()).with_cleanup_artifacts(false);

    let mut a = ClusterSession::start(settings.clone(), TestHelpers::config_for(&endpoint_a))
        .await
        .unwrap();
    TestHelpers::wait_for_pid(&mut a).await;
    let mut b = ClusterSession::start(settings, TestHelpers::config_for(&endpoint_b))
        .await
        .unwrap();
    TestHelpers::wait_for_pid(&mut b).await;

    let pid_a = a.process().resolve_pid().unwrap();
    let pid_b = b.process().resolve_pid().unwrap();
    assert_ne!(pid_a, pid_b);

    let outcome = a.stop().await;

    assert_matches!(outcome, ShutdownOutcome::Exited { pid: Some(pid), .. } => {
        assert_eq!(pid, pid_a.as_raw());
    });
    assert!(b.process().is_running());
    assert_eq!(b.process().resolve_pid().unwrap(), pid_b);
    assert!(b.stop().await.is_exited());
}

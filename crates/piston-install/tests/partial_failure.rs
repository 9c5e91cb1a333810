mod common;

use common::*;
use piston_install::game::installer::core::engine::DownloadEngine;
use piston_install::game::installer::plan::TaskState;
use piston_install::game::installer::types::InstallContext;
use piston_install::{install_instance, InstallError, InstallSession, SessionState, SilentProgressReporter};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn failing_library_does_not_stop_the_rest() {
    init_logging();
    let server = MockServer::start().await;
    serve_vanilla(&server).await;
    let guava_route = format!("/libraries/{}", GUAVA_PATH);
    let outage = Mock::given(method("GET"))
        .and(path(guava_route.clone()))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .expect(3)
        .mount_as_scoped(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let spec = spec(&server, dir.path());
    let data = spec.data_dir.clone();
    let session = InstallSession::new(Arc::new(SilentProgressReporter));
    let err = install_instance(spec.clone(), session.clone()).await.unwrap_err();

    let failed_id = format!("libraries/{}", GUAVA_PATH);
    match &err {
        InstallError::InstallationIncomplete { failed } => {
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].id, failed_id);
            assert_eq!(failed[0].attempts, 3);
            assert!(failed[0].url.ends_with(&guava_route));
        }
        other => panic!("expected an incomplete install, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Incomplete);

    // every sibling finished
    let progress = session.progress();
    assert_eq!(progress.tasks_total, 7);
    assert_eq!(progress.tasks_verified, 6);
    assert_eq!(progress.tasks_failed, 1);
    assert!(data.join("libraries").join(ASM_PATH).exists());
    assert!(!data.join("libraries").join(GUAVA_PATH).exists());

    let mut plan = session.plan().unwrap();
    assert_eq!(plan.task(&failed_id).unwrap().state, TaskState::Failed);
    drop(outage);

    // retry only what failed
    plan.retain_ids(&err.failed_task_ids());
    assert_eq!(plan.tasks.len(), 1);
    let ctx = InstallContext::new(spec).unwrap();
    let retry = InstallSession::new(Arc::new(SilentProgressReporter));
    DownloadEngine::new(&ctx, &retry).run(&mut plan).await.unwrap();

    assert_eq!(plan.tasks[0].state, TaskState::Verified);
    assert_eq!(retry.progress().bytes_transferred, GUAVA.len() as u64);
    assert_eq!(std::fs::read(data.join("libraries").join(GUAVA_PATH)).unwrap(), GUAVA);
}

#[tokio::test]
async fn rerun_after_failure_completes_the_install() {
    let server = MockServer::start().await;
    serve_vanilla(&server).await;
    let dir = tempfile::tempdir().unwrap();

    {
        let _outage = Mock::given(method("GET"))
            .and(path(format!("/libraries/{}", ASM_PATH)))
            .respond_with(ResponseTemplate::new(404))
            .with_priority(1)
            .expect(1)
            .mount_as_scoped(&server)
            .await;
        let err = install_instance(
            spec(&server, dir.path()),
            InstallSession::new(Arc::new(SilentProgressReporter)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.failed_task_ids(), vec![format!("libraries/{}", ASM_PATH)]);
    }

    let session = InstallSession::new(Arc::new(SilentProgressReporter));
    install_instance(spec(&server, dir.path()), session.clone()).await.unwrap();
    assert_eq!(session.progress().bytes_transferred, ASM.len() as u64);
    assert_eq!(session.state(), SessionState::Completed);
}

use crate::catalog::Catalog;
use crate::db::NewProject;
use crate::keeper::ProjectKeeper;
use crate::keeper::test_helpers::{test_config, wait_for_status};
use crate::layout::ProjectLayout;
use crate::storage::fixtures::{expected_git_entries, project_zip, read_zip_files};
use crate::types::{Event, ProjectId, ProjectStatus};

#[tokio::test]
async fn shutdown_marks_clean_and_emits_event() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = ProjectKeeper::new(test_config(dir.path())).await.unwrap();
    let mut events = keeper.subscribe();

    assert!(keeper.is_accepting());
    keeper.shutdown().await.unwrap();

    assert!(!keeper.is_accepting());
    assert!(!keeper.db.was_unclean_shutdown().await.unwrap());
    assert!(matches!(events.recv().await.unwrap(), Event::Shutdown));
}

#[tokio::test]
async fn shutdown_waits_for_running_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = ProjectKeeper::new(test_config(dir.path())).await.unwrap();

    let info = keeper
        .create_project("demo", project_zip("demo").as_slice())
        .await
        .unwrap();
    keeper.shutdown().await.unwrap();

    // Once shutdown returns no job is mid-step: the project either finished
    // or kept a status the next start resumes
    let status = keeper.db.find_by_id(info.id).await.unwrap().unwrap().status;
    assert!(
        matches!(
            status,
            ProjectStatus::Done
                | ProjectStatus::Pending
                | ProjectStatus::Unpacking
                | ProjectStatus::Repackaging
        ),
        "unexpected status {status}"
    );
}

#[tokio::test]
async fn unfinished_jobs_are_resumed_on_next_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    // First session stops before it can process anything
    let keeper = ProjectKeeper::new(config.clone()).await.unwrap();
    keeper.shutdown().await.unwrap();

    let mut ids = Vec::new();
    for (name, status) in [
        ("pending", ProjectStatus::Pending),
        ("unpacking", ProjectStatus::Unpacking),
        ("repackaging", ProjectStatus::Repackaging),
    ] {
        let layout = ProjectLayout::new(ProjectId::new(), name);
        let saved = keeper
            .storage()
            .save(layout.raw_archive(), project_zip(name).as_slice())
            .await
            .unwrap();
        keeper
            .db
            .insert(&NewProject {
                id: layout.id(),
                name: name.to_string(),
                unzipped_path: keeper.storage().full_path(layout.unzip_dir()),
                zipped_path: saved.path,
                git_zipped_path: keeper.storage().full_path(layout.git_archive()),
                size_bytes: saved.size_bytes,
                sha256: saved.sha256,
            })
            .await
            .unwrap();
        keeper.db.update_status(layout.id(), status, None).await.unwrap();
        ids.push((name, layout.id()));
    }
    drop(keeper);

    let keeper = ProjectKeeper::new(config).await.unwrap();
    for (name, id) in ids {
        let done = wait_for_status(&keeper, id, ProjectStatus::Done).await;
        assert_eq!(read_zip_files(&done.git_zipped_path), expected_git_entries(name));
    }
}

/// Store a raw archive and record it `pending` without queueing it
async fn stage_pending(keeper: &ProjectKeeper, name: &str) -> ProjectId {
    let layout = ProjectLayout::new(ProjectId::new(), name);
    let saved = keeper
        .storage()
        .save(layout.raw_archive(), project_zip(name).as_slice())
        .await
        .unwrap();
    keeper
        .db
        .insert(&NewProject {
            id: layout.id(),
            name: name.to_string(),
            unzipped_path: keeper.storage().full_path(layout.unzip_dir()),
            zipped_path: saved.path,
            git_zipped_path: keeper.storage().full_path(layout.git_archive()),
            size_bytes: saved.size_bytes,
            sha256: saved.sha256,
        })
        .await
        .unwrap();
    layout.id()
}

#[tokio::test]
async fn restored_backlog_larger_than_queue_is_processed() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.pipeline.queue_capacity = 1;
    config.pipeline.max_concurrent_jobs = 1;

    let keeper = ProjectKeeper::new(config.clone()).await.unwrap();
    keeper.shutdown().await.unwrap();
    let mut ids = Vec::new();
    for i in 0..6 {
        let name = format!("backlog-{i}");
        ids.push((stage_pending(&keeper, &name).await, name));
    }
    drop(keeper);

    let keeper = ProjectKeeper::new(config).await.unwrap();
    for (id, name) in ids {
        let done = wait_for_status(&keeper, id, ProjectStatus::Done).await;
        assert_eq!(read_zip_files(&done.git_zipped_path), expected_git_entries(&name));
    }
    keeper.shutdown().await.unwrap();
}

#[tokio::test]
async fn finished_projects_are_not_restored() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let keeper = ProjectKeeper::new(config.clone()).await.unwrap();
    let info = keeper
        .create_project("demo", project_zip("demo").as_slice())
        .await
        .unwrap();
    let before = wait_for_status(&keeper, info.id, ProjectStatus::Done).await;
    keeper.shutdown().await.unwrap();
    drop(keeper);

    let keeper = ProjectKeeper::new(config).await.unwrap();
    assert_eq!(keeper.restore_unfinished().await.unwrap(), 0);
    let after = keeper.db.find_by_id(info.id).await.unwrap().unwrap();
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.pipeline.max_concurrent_jobs = 0;

    assert!(ProjectKeeper::new(config).await.is_err());
}

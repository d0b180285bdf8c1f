use super::new_project;
use crate::catalog::Catalog;
use crate::db::*;
use crate::error::{DatabaseError, Error};
use crate::types::{ProjectId, ProjectStatus};
use tempfile::NamedTempFile;

async fn open() -> (NamedTempFile, Database) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (temp_file, db)
}

#[tokio::test]
async fn insert_then_find_by_id_round_trips_every_field() {
    let (_f, db) = open().await;
    let project = new_project("demo");

    db.insert(&project).await.unwrap();
    let info = db.find_by_id(project.id).await.unwrap().unwrap();

    assert_eq!(info.id, project.id);
    assert_eq!(info.name, "demo");
    assert_eq!(info.unzipped_path, project.unzipped_path);
    assert_eq!(info.zipped_path, project.zipped_path);
    assert_eq!(info.git_zipped_path, project.git_zipped_path);
    assert_eq!(info.status, ProjectStatus::Pending);
    assert_eq!(info.error, None);
    assert_eq!(info.size_bytes, 2048);
    assert_eq!(info.sha256, project.sha256);
    assert_eq!(info.created_at, info.updated_at);

    db.close().await;
}

#[tokio::test]
async fn duplicate_id_is_a_constraint_violation() {
    let (_f, db) = open().await;
    let project = new_project("demo");

    db.insert(&project).await.unwrap();
    let err = db.insert(&project).await.unwrap_err();

    assert!(
        matches!(
            err,
            Error::Database(DatabaseError::ConstraintViolation(_))
        ),
        "got {err:?}"
    );
    db.close().await;
}

#[tokio::test]
async fn unknown_id_is_none() {
    let (_f, db) = open().await;
    assert!(db.find_by_id(ProjectId::new()).await.unwrap().is_none());
    db.close().await;
}

#[tokio::test]
async fn find_all_on_empty_catalog_is_empty() {
    let (_f, db) = open().await;
    assert!(db.find_all().await.unwrap().is_empty());
    db.close().await;
}

#[tokio::test]
async fn find_all_lists_oldest_first() {
    let (_f, db) = open().await;

    let first = new_project("first");
    let second = new_project("second");
    db.insert(&first).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    db.insert(&second).await.unwrap();

    let names: Vec<String> = db
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["first", "second"]);

    db.close().await;
}

#[tokio::test]
async fn update_status_changes_only_mutable_fields() {
    let (_f, db) = open().await;
    let project = new_project("demo");
    db.insert(&project).await.unwrap();
    let before = db.find_by_id(project.id).await.unwrap().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    db.update_status(project.id, ProjectStatus::Failed, Some("corrupt archive"))
        .await
        .unwrap();
    let after = db.find_by_id(project.id).await.unwrap().unwrap();

    assert_eq!(after.status, ProjectStatus::Failed);
    assert_eq!(after.error.as_deref(), Some("corrupt archive"));
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.name, before.name);
    assert_eq!(after.zipped_path, before.zipped_path);
    assert_eq!(after.git_zipped_path, before.git_zipped_path);

    db.close().await;
}

#[tokio::test]
async fn update_status_clears_previous_error() {
    let (_f, db) = open().await;
    let project = new_project("demo");
    db.insert(&project).await.unwrap();

    db.update_status(project.id, ProjectStatus::Failed, Some("boom"))
        .await
        .unwrap();
    db.update_status(project.id, ProjectStatus::Unpacking, None)
        .await
        .unwrap();

    let info = db.find_by_id(project.id).await.unwrap().unwrap();
    assert_eq!(info.status, ProjectStatus::Unpacking);
    assert!(info.error.is_none());

    db.close().await;
}

#[tokio::test]
async fn update_status_of_unknown_id_is_not_found() {
    let (_f, db) = open().await;
    let err = db
        .update_status(ProjectId::new(), ProjectStatus::Done, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    db.close().await;
}

#[tokio::test]
async fn find_by_status_filters() {
    let (_f, db) = open().await;
    let pending = new_project("pending");
    let running = new_project("running");
    let done = new_project("done");
    for p in [&pending, &running, &done] {
        db.insert(p).await.unwrap();
    }
    db.update_status(running.id, ProjectStatus::Repackaging, None)
        .await
        .unwrap();
    db.update_status(done.id, ProjectStatus::Done, None)
        .await
        .unwrap();

    let mut unfinished: Vec<String> = db
        .find_by_status(&ProjectStatus::unfinished())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    unfinished.sort();
    assert_eq!(unfinished, vec!["pending", "running"]);

    let finished = db.find_by_status(&[ProjectStatus::Done]).await.unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].id, done.id);

    assert!(db.find_by_status(&[]).await.unwrap().is_empty());

    db.close().await;
}

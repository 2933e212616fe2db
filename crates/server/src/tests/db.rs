//! Scenarios against a local PostgreSQL, run with `cargo test -- --ignored`.

use std::collections::BTreeSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use crate::database::connection::{DbConfig, DbConnection};
use crate::error::{ConflictError, Entity, RequestError};
use crate::models::rating::{RatingAggregate, Stars, UserRating};
use crate::models::resource::{CreateResource, GithubPointer, ResourceFilter, ResourceKind};
use crate::models::user::UpsertUser;
use crate::storage::Storage;

/// Some tests can't run in parallel, prevent them from breaking each other's state
static SERIAL_LOCK: Lazy<Mutex<()>> = Lazy::new(Mutex::default);

async fn init_and_get_db() -> DbConnection {
    let _ = tracing_subscriber::fmt::try_init();

    let config = DbConfig::development("taskhub_db", "taskhub_guest", "taskhubpass");
    let db = DbConnection::connect(&config).await.unwrap();
    db.drop_schema().await.unwrap();
    db.init_schema().await.unwrap();
    db
}

fn stars(value: i64) -> Stars {
    Stars::new(value).unwrap()
}

async fn create_user(db: &DbConnection, id: i64, username: &str) {
    db.upsert_user(&UpsertUser {
        id,
        username: username.to_string(),
        access_token: format!("gho_{username}"),
    })
    .await
    .unwrap();
}

fn resource(name: &str, tags: &[&str], uploader_id: i64) -> CreateResource {
    CreateResource {
        name: name.to_string(),
        description: format!("{name} task"),
        kind: ResourceKind::Task,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        github: GithubPointer {
            owner: "tektoncd".to_string(),
            repository: "catalog".to_string(),
            path: format!("task/{name}/{name}.yaml"),
        },
        uploader_id,
    }
}

#[tokio::test]
#[ignore = "requires a local postgres"]
async fn rating_scenario() {
    let _lock = SERIAL_LOCK.lock().await;
    let db = init_and_get_db().await;

    create_user(&db, 1, "uploader").await;
    create_user(&db, 11, "first_voter").await;
    create_user(&db, 12, "second_voter").await;
    let r = db
        .create_resource(&resource("git-clone", &["git"], 1))
        .await
        .unwrap();

    assert_eq!(
        db.rating_details(r).await.unwrap(),
        RatingAggregate::default()
    );
    assert_eq!(db.user_rating(11, r).await.unwrap(), UserRating::NotRated);

    let aggregate = db.add_rating(11, r, stars(4)).await.unwrap();
    assert_eq!((aggregate.count, aggregate.mean()), (1, 4.0));
    let aggregate = db.add_rating(12, r, stars(2)).await.unwrap();
    assert_eq!((aggregate.count, aggregate.mean()), (2, 3.0));

    let err = db.add_rating(11, r, stars(1)).await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::Conflict(ConflictError::AlreadyRated)
    ));

    let aggregate = db.update_rating(11, r, stars(5), stars(4)).await.unwrap();
    assert_eq!((aggregate.count, aggregate.mean()), (2, 3.5));

    let err = db
        .update_rating(11, r, stars(5), stars(4))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RequestError::Conflict(ConflictError::StaleRating {
            current: Some(current),
            ..
        }) if current == stars(5)
    ));
    assert_eq!(db.rating_details(r).await.unwrap(), RatingAggregate::new(2, 7));
    assert_eq!(
        db.user_rating(11, r).await.unwrap(),
        UserRating::Rated { stars: stars(5) }
    );

    let err = db.add_rating(404, r, stars(3)).await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::NotFound {
            entity: Entity::User,
            ..
        }
    ));
    let err = db.add_rating(11, r + 100, stars(3)).await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::NotFound {
            entity: Entity::Resource,
            ..
        }
    ));
    assert_eq!(db.rating_details(r).await.unwrap(), RatingAggregate::new(2, 7));
}

#[tokio::test]
#[ignore = "requires a local postgres"]
async fn concurrent_revisions_apply_once() {
    let _lock = SERIAL_LOCK.lock().await;
    let db = Arc::new(init_and_get_db().await);

    create_user(&db, 1, "uploader").await;
    let r = db
        .create_resource(&resource("buildah", &["build"], 1))
        .await
        .unwrap();
    db.add_rating(1, r, stars(2)).await.unwrap();

    let mut handles = Vec::new();
    for value in [3, 4, 5, 1] {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            db.update_rating(1, r, stars(value), stars(2)).await
        }));
    }
    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);

    let current = db.user_rating(1, r).await.unwrap().stars().unwrap();
    assert_eq!(
        db.rating_details(r).await.unwrap(),
        RatingAggregate::new(1, current.get().into())
    );
}

#[tokio::test]
#[ignore = "requires a local postgres"]
async fn registry_queries() {
    let _lock = SERIAL_LOCK.lock().await;
    let db = init_and_get_db().await;

    create_user(&db, 1, "alice").await;
    create_user(&db, 2, "bob").await;
    let ab = db
        .create_resource(&resource("git-clone", &["a", "b"], 1))
        .await
        .unwrap();
    let c = db
        .create_resource(&resource("lint", &["c"], 2))
        .await
        .unwrap();
    let ac = db
        .create_resource(&resource("buildah", &["a", "c"], 1))
        .await
        .unwrap();
    let untagged = db
        .create_resource(&resource("noop", &[], 2))
        .await
        .unwrap();

    let all = db.list_resources(&ResourceFilter::All).await.unwrap();
    assert_eq!(
        all.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![ab, c, ac, untagged]
    );
    assert!(all[3].tags.is_empty());

    let wanted: BTreeSet<String> = ["a", "b"].iter().map(|t| t.to_string()).collect();
    let filtered = db
        .list_resources(&ResourceFilter::Tags(wanted))
        .await
        .unwrap();
    assert_eq!(
        filtered.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![ab, ac]
    );
    assert_eq!(filtered[1].tags, vec!["a".to_string(), "c".to_string()]);

    let by_bob = db.list_resources(&ResourceFilter::Uploader(2)).await.unwrap();
    assert_eq!(
        by_bob.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![c, untagged]
    );

    let tags = db.all_tags().await.unwrap();
    assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);

    for _ in 0..3 {
        db.increment_downloads(c).await.unwrap();
    }
    assert_eq!(db.resource(c).await.unwrap().download_count, 3);
    assert_eq!(
        db.github_details(c).await.unwrap().path,
        "task/lint/lint.yaml"
    );
    assert!(matches!(
        db.increment_downloads(999).await,
        Err(RequestError::NotFound { .. })
    ));

    let err = db
        .create_resource(&resource("orphan", &["x"], 77))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RequestError::NotFound {
            entity: Entity::User,
            ..
        }
    ));
    assert_eq!(db.all_tags().await.unwrap().len(), 3);
}

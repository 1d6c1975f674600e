mod common;

use std::collections::BTreeSet;
use std::time::SystemTime;

use s3site_core::contract::NO_CACHE_DIRECTIVES;
use s3site_core::{deploy, BucketController, DeployError, DeployPhase, Existence};
use tempfile::tempdir;

use common::{test_config, write_file, InMemoryStore};

const BUCKET: &str = "s3site-test-site";

#[tokio::test]
async fn deploy_publishes_every_file_under_its_relative_path() {
    let site = tempdir().unwrap();
    write_file(site.path(), "index.html", "<h1>home</h1>");
    write_file(site.path(), "css/site.css", "body {}");
    write_file(site.path(), "nested/folder/test.html", "<p>nested</p>");

    let controller =
        BucketController::new(InMemoryStore::new(), test_config(Some(site.path()))).unwrap();
    let report = controller.deploy().await.expect("deploy should succeed");

    assert_eq!(report.phase, DeployPhase::Done);
    assert_eq!(report.bucket, BUCKET);
    assert_eq!(
        report.website_url,
        "http://s3site-test-site.s3-website-us-east-1.amazonaws.com"
    );
    assert_eq!(
        report.uploaded_keys,
        vec!["css/site.css", "index.html", "nested/folder/test.html"]
    );

    let listed: BTreeSet<String> = controller
        .list_contents()
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.key)
        .collect();
    let expected: BTreeSet<String> = ["css/site.css", "index.html", "nested/folder/test.html"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn deploy_configures_website_and_public_policy() {
    let site = tempdir().unwrap();
    write_file(site.path(), "index.html", "home");

    let mut config = test_config(Some(site.path()));
    config.error_document = Some("404.html".into());
    let controller = BucketController::new(InMemoryStore::new(), config).unwrap();
    controller.deploy().await.unwrap();

    let website = controller.store().website(BUCKET).expect("website configured");
    assert_eq!(website.index_document, "index.html");
    assert_eq!(website.error_document.as_deref(), Some("404.html"));

    let policy = controller.store().policy(BUCKET).expect("policy installed");
    let policy: serde_json::Value = serde_json::from_str(&policy).unwrap();
    assert_eq!(
        policy["Statement"][0]["Resource"][0],
        "arn:aws:s3:::s3site-test-site/*"
    );
}

#[tokio::test]
async fn deploy_replaces_previous_contents() {
    let site = tempdir().unwrap();
    write_file(site.path(), "index.html", "fresh");

    let store = InMemoryStore::new();
    store.seed_bucket(BUCKET, &["stale.html", "old/page.html"]);

    let controller = BucketController::new(store, test_config(Some(site.path()))).unwrap();
    controller.deploy().await.unwrap();

    assert_eq!(controller.store().keys(BUCKET), vec!["index.html"]);
    let object = controller.store().object(BUCKET, "index.html").unwrap();
    assert_eq!(object.body, b"fresh");
}

#[tokio::test]
async fn deploy_strips_extensions_and_marks_no_cache_keys() {
    let site = tempdir().unwrap();
    write_file(site.path(), "index.html", "home");
    write_file(site.path(), "about.html", "about");
    write_file(site.path(), "app.js", "console.log(1)");

    let mut config = test_config(Some(site.path()));
    config.remove_extensions = [".html".to_string()].into_iter().collect();
    config.no_cache = ["index".to_string()].into_iter().collect();
    let before = SystemTime::now();

    let controller = BucketController::new(InMemoryStore::new(), config).unwrap();
    let report = controller.deploy().await.unwrap();
    assert_eq!(report.uploaded_keys, vec!["about", "app.js", "index"]);

    let index = controller.store().object(BUCKET, "index").unwrap();
    assert_eq!(index.content_type, "text/html");
    let cache = index.cache.expect("no-cache headers on index");
    assert_eq!(cache.cache_control, NO_CACHE_DIRECTIVES);
    assert!(cache.expires >= before);
    assert!(cache.expires <= SystemTime::now());

    let about = controller.store().object(BUCKET, "about").unwrap();
    assert!(about.cache.is_none());
}

#[tokio::test]
async fn deploy_with_missing_source_keeps_the_live_site() {
    let missing = tempdir().unwrap().path().join("typo");
    let store = InMemoryStore::new();
    store.seed_bucket(BUCKET, &["index.html", "about.html"]);
    let controller = BucketController::new(store, test_config(Some(&missing))).unwrap();

    let err = controller.deploy().await.unwrap_err();
    assert!(matches!(err, DeployError::InvalidConfig(_)), "got {err:?}");

    assert_eq!(
        controller.store().keys(BUCKET),
        vec!["about.html", "index.html"]
    );
    assert!(controller.store().calls().is_empty());
}

#[tokio::test]
async fn deploy_with_file_as_source_keeps_the_live_site() {
    let site = tempdir().unwrap();
    write_file(site.path(), "index.html", "not a directory root");
    let store = InMemoryStore::new();
    store.seed_bucket(BUCKET, &["index.html"]);
    let controller =
        BucketController::new(store, test_config(Some(&site.path().join("index.html"))))
            .unwrap();

    let err = controller.deploy().await.unwrap_err();
    assert!(matches!(err, DeployError::InvalidConfig(_)), "got {err:?}");
    assert_eq!(controller.store().keys(BUCKET), vec!["index.html"]);
}

#[tokio::test]
async fn deploy_without_source_touches_nothing() {
    let store = InMemoryStore::new();
    store.seed_bucket(BUCKET, &["index.html"]);
    let controller = BucketController::new(store, test_config(None)).unwrap();

    assert!(matches!(
        controller.deploy().await,
        Err(DeployError::InvalidConfig(_))
    ));
    assert!(controller.store().calls().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn deploy_failure_in_upload_leaves_bucket_in_place() {
    let site = tempdir().unwrap();
    write_file(site.path(), "real/page.html", "real");
    std::os::unix::fs::symlink(site.path().join("real"), site.path().join("loop")).unwrap();

    let controller =
        BucketController::new(InMemoryStore::new(), test_config(Some(site.path()))).unwrap();

    let err = controller.deploy().await.unwrap_err();
    assert!(matches!(err, DeployError::UnsupportedEntry { .. }), "got {err:?}");

    // no rollback: the bucket created before the upload remains
    assert!(controller.store().has_bucket(BUCKET));
    assert!(controller.store().policy(BUCKET).is_some());
}

#[tokio::test]
async fn create_then_remove_bucket_leaves_it_absent() {
    let controller = BucketController::new(InMemoryStore::new(), test_config(None)).unwrap();

    controller.create().await.unwrap();
    assert_eq!(controller.verify_existence().await.unwrap(), Existence::Exists);

    controller.remove_bucket().await.unwrap();
    assert_eq!(
        controller.verify_existence().await.unwrap(),
        Existence::NotFound
    );
}

#[tokio::test]
async fn destroy_empties_buckets_larger_than_one_page() {
    let store = InMemoryStore::with_page_size(2);
    store.seed_bucket(BUCKET, &["a", "b", "c", "d", "e"]);

    let controller = BucketController::new(store, test_config(None)).unwrap();
    assert_eq!(controller.list_contents().await.unwrap().len(), 5);

    controller.destroy().await.unwrap();
    assert!(!controller.store().has_bucket(BUCKET));
    assert_eq!(controller.store().count_calls("delete_objects"), 1);
}

#[tokio::test]
async fn destroy_is_idempotent() {
    let controller = BucketController::new(InMemoryStore::new(), test_config(None)).unwrap();
    controller.destroy().await.unwrap();
    controller.destroy().await.unwrap();
    assert_eq!(controller.store().count_calls("delete_bucket"), 0);
}

#[tokio::test]
async fn deploy_entrypoint_runs_full_pipeline() {
    let site = tempdir().unwrap();
    write_file(site.path(), "index.html", "home");

    let report = deploy(InMemoryStore::new(), test_config(Some(site.path())))
        .await
        .unwrap();
    assert_eq!(report.uploaded_keys, vec!["index.html"]);
}

#[tokio::test]
async fn deploy_issues_remote_calls_in_lifecycle_order() {
    let site = tempdir().unwrap();
    write_file(site.path(), "index.html", "home");

    let controller =
        BucketController::new(InMemoryStore::new(), test_config(Some(site.path()))).unwrap();
    controller.deploy().await.unwrap();

    assert_eq!(
        controller.store().calls(),
        vec![
            "head_bucket",
            "create_bucket",
            "put_bucket_website",
            "remove_public_access_block",
            "put_bucket_policy",
            "put_object",
        ]
    );
}

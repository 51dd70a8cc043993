//! Integration tests for item sources and the download manager.
//!
//! These tests serve real HTML listing pages and file bodies from a mock
//! server, then drive discovery and full downloads through the public
//! API.

use std::sync::Arc;
use std::time::Duration;

use patchdl_core::{
    DEFAULT_FILE_PATTERN, DownloadEngine, DownloadManager, ItemSource, ListingSource, NullSink,
    SourceError, UrlListSource,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, file_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

// ==================== Listing Discovery Tests ====================

#[tokio::test]
async fn test_listing_discovers_matching_files_in_page_order() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    let html = format!(
        r#"<html><body>
<h1>Patch archive</h1>
<a href="{uri}/files/Client-001.bin">Client patch 001</a><br>
<a href="{uri}/files/Client-002.zip"><b>Client</b> patch 002</a><br>
<a href="{uri}/notes/readme.html">Release notes</a>
<a href="/relative/Client-003.bin">relative link</a>
</body></html>"#
    );
    mount_html(&mock_server, "/patches/", html).await;

    let engine = DownloadEngine::default();
    let source = ListingSource::new(
        engine.client().clone(),
        format!("{uri}/patches/"),
        DEFAULT_FILE_PATTERN,
    )
    .expect("default pattern should compile");

    let items = source.discover().await.expect("discovery should succeed");

    assert_eq!(items.len(), 2, "only absolute matching hrefs survive");
    assert_eq!(items[0].file_name(), "Client-001.bin");
    assert_eq!(items[0].display_name(), "Client patch 001");
    assert_eq!(items[0].url(), format!("{uri}/files/Client-001.bin"));
    assert_eq!(items[1].file_name(), "Client-002.zip");
    assert_eq!(items[1].display_name(), "Client patch 002");
}

#[tokio::test]
async fn test_listing_decodes_entities_in_display_names() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    let html =
        format!(r#"<a href="{uri}/p/fix.bin">Patch&nbsp;&amp;&nbsp;Fix&nbsp;Pack</a>"#);
    mount_html(&mock_server, "/list", html).await;

    let engine = DownloadEngine::default();
    let source = ListingSource::new(
        engine.client().clone(),
        format!("{uri}/list"),
        DEFAULT_FILE_PATTERN,
    )
    .expect("default pattern should compile");

    let items = source.discover().await.expect("discovery should succeed");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].display_name(), "Patch & Fix Pack");
}

#[tokio::test]
async fn test_listing_http_error_maps_to_source_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let engine = DownloadEngine::default();
    let source = ListingSource::new(
        engine.client().clone(),
        format!("{}/list", mock_server.uri()),
        DEFAULT_FILE_PATTERN,
    )
    .expect("default pattern should compile");

    let error = source
        .discover()
        .await
        .expect_err("a 503 listing must not discover anything");

    match error {
        SourceError::Http { status, .. } => assert_eq!(status, Some(503)),
        other => panic!("expected an HTTP source error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_listing_empty_page_discovers_nothing() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/list", "<html><body>nothing here</body></html>".to_string()).await;

    let engine = DownloadEngine::default();
    let source = ListingSource::new(
        engine.client().clone(),
        format!("{}/list", mock_server.uri()),
        DEFAULT_FILE_PATTERN,
    )
    .expect("default pattern should compile");

    let items = source.discover().await.expect("discovery should succeed");
    assert!(items.is_empty());
}

// ==================== Manager Tests ====================

#[tokio::test]
async fn test_manager_downloads_everything_a_listing_discovers() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    let html = format!(
        r#"<a href="{uri}/files/a.bin">Patch A</a>
<a href="{uri}/files/b.bin">Patch B</a>"#
    );
    mount_html(&mock_server, "/patches/", html).await;
    mount_file(&mock_server, "/files/a.bin", b"contents of a").await;
    mount_file(&mock_server, "/files/b.bin", b"contents of b").await;

    let engine = DownloadEngine::default();
    let source = ListingSource::new(
        engine.client().clone(),
        format!("{uri}/patches/"),
        DEFAULT_FILE_PATTERN,
    )
    .expect("default pattern should compile");
    let manager = DownloadManager::with_engine(engine, Box::new(source));

    let count = manager.load().await.expect("load should succeed");
    assert_eq!(count, 2);

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let stats = manager.start(temp_dir.path(), Arc::new(NullSink), 2).await;

    assert_eq!(stats.completed(), 2);
    assert_eq!(stats.failed(), 0);
    let a = std::fs::read(temp_dir.path().join("a.bin")).expect("a.bin should exist");
    assert_eq!(a, b"contents of a");
    let b = std::fs::read(temp_dir.path().join("b.bin")).expect("b.bin should exist");
    assert_eq!(b, b"contents of b");
}

#[tokio::test]
async fn test_manager_start_honors_deselection() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    mount_file(&mock_server, "/a.bin", b"aaa").await;
    mount_file(&mock_server, "/b.bin", b"bbb").await;

    let source = UrlListSource::new(format!("{uri}/a.bin\n{uri}/b.bin"));
    let manager = DownloadManager::new(Box::new(source));

    let count = manager.load().await.expect("load should succeed");
    assert_eq!(count, 2);
    manager.items()[0].set_selected(false);

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let stats = manager.start(temp_dir.path(), Arc::new(NullSink), 2).await;

    assert_eq!(stats.total(), 1, "deselected items stay out of the batch");
    assert!(!temp_dir.path().join("a.bin").exists());
    assert!(temp_dir.path().join("b.bin").exists());
}

#[tokio::test]
async fn test_manager_cancel_all_stops_running_batch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0_u8; 1024])
                .set_delay(Duration::from_millis(1000)),
        )
        .mount(&mock_server)
        .await;

    let source = UrlListSource::new(format!("{}/slow.bin", mock_server.uri()));
    let manager = Arc::new(DownloadManager::new(Box::new(source)));
    manager.load().await.expect("load should succeed");

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let handle = {
        let manager = Arc::clone(&manager);
        let dest = temp_dir.path().to_path_buf();
        tokio::spawn(async move { manager.start(&dest, Arc::new(NullSink), 1).await })
    };

    tokio::time::sleep(Duration::from_millis(300)).await;
    manager.cancel_all();
    let stats = handle.await.expect("batch task should not panic");

    assert_eq!(stats.cancelled(), 1);
    assert_eq!(manager.items()[0].status(), "cancelled");
}

#[tokio::test]
async fn test_manager_failed_load_leaves_list_empty() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patches/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let engine = DownloadEngine::default();
    let source = ListingSource::new(
        engine.client().clone(),
        format!("{}/patches/", mock_server.uri()),
        DEFAULT_FILE_PATTERN,
    )
    .expect("default pattern should compile");
    let manager = DownloadManager::with_engine(engine, Box::new(source));

    let result = manager.load().await;
    assert!(result.is_err(), "a 500 listing must fail the load");
    assert!(
        manager.items().is_empty(),
        "a failed load must leave the list empty"
    );
}

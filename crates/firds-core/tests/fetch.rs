mod common;

use axum::routing::get;
use axum::Router;
use firds_core::config::HttpSection;
use firds_core::{HttpFetcher, PipelineError};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&HttpSection::default()).expect("http client")
}

async fn index_server() -> String {
    let router = Router::new().route(
        "/select",
        get(|| async { common::index_xml("http://localhost") }),
    );
    format!("http://{}", common::serve(router).await)
}

#[tokio::test]
async fn downloads_to_named_file() {
    let base = index_server().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let path = fetcher()
        .download(&format!("{base}/select"), dir.path(), "sourcefile.xml")
        .await
        .expect("download failed");

    assert!(path.is_absolute());
    assert_eq!(
        path,
        dir.path()
            .canonicalize()
            .expect("canonical tempdir")
            .join("sourcefile.xml")
    );
    let contents = std::fs::read_to_string(&path).expect("downloaded file");
    assert!(!contents.is_empty());
    assert!(contents.contains(common::ARCHIVE_NAME));
    assert!(!dir.path().join("sourcefile.xml.part").exists());
}

#[tokio::test]
async fn creates_missing_download_directory() {
    let base = index_server().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let another = dir.path().join("anotherpath");

    let path = fetcher()
        .download(&format!("{base}/select"), &another, "sourcefile.xml")
        .await
        .expect("download failed");

    assert!(another.is_dir());
    assert!(path.ends_with("anotherpath/sourcefile.xml"));
}

#[tokio::test]
async fn non_success_status_leaves_no_file() {
    let base = index_server().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let err = fetcher()
        .download(&format!("{base}/does-not-exist"), dir.path(), "sourcefile.xml")
        .await
        .expect_err("404 should fail");

    assert!(matches!(err, PipelineError::HttpStatus { status: 404, .. }));
    assert!(!dir.path().join("sourcefile.xml").exists());
}

#[tokio::test]
async fn unreachable_host_is_a_request_error() {
    // Bind then drop a listener so the port is known to be closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let dir = tempfile::tempdir().expect("tempdir");
    let err = fetcher()
        .download(&format!("http://{addr}/select"), dir.path(), "sourcefile.xml")
        .await
        .expect_err("closed port should fail");

    assert!(matches!(err, PipelineError::Request { .. }));
    assert!(!dir.path().join("sourcefile.xml").exists());
}

#[tokio::test]
async fn directory_below_a_file_is_rejected() {
    let base = index_server().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").expect("write blocker");

    let err = fetcher()
        .download(&format!("{base}/select"), &blocker.join("downloads"), "sourcefile.xml")
        .await
        .expect_err("directory under a file should fail");

    assert!(matches!(err, PipelineError::Io { .. }));
}

#[tokio::test]
async fn path_like_names_are_rejected_before_any_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = fetcher()
        .download("http://127.0.0.1:9/never", dir.path(), "../escape.xml")
        .await
        .expect_err("name with separators should fail");
    assert!(matches!(err, PipelineError::InvalidFileName(_)));
}

#[tokio::test]
async fn failed_rename_removes_partial_download() {
    let base = index_server().await;
    let dir = tempfile::tempdir().expect("tempdir");
    // A non-empty directory at the target path makes the final rename fail.
    let occupied = dir.path().join("sourcefile.xml");
    std::fs::create_dir(&occupied).expect("create occupied dir");
    std::fs::write(occupied.join("keep"), "").expect("write occupant");

    let err = fetcher()
        .download(&format!("{base}/select"), dir.path(), "sourcefile.xml")
        .await
        .expect_err("rename onto a directory should fail");

    assert!(matches!(err, PipelineError::Io { .. }));
    assert!(!dir.path().join("sourcefile.xml.part").exists());
    assert!(occupied.join("keep").exists());
}

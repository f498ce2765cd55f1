//! Integration tests for the HTTP download path, exercised end-to-end
//! against a `wiremock` server rather than unit-testing each stage.

use downloader_core::{Downloader, RequestOverrides, SessionConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_http_download_writes_full_content_with_no_sidecar_left_behind() {
    let server = MockServer::start().await;
    let body = b"the quick brown fox jumps over the lazy dog".to_vec();

    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", body.len().to_string().as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let mut downloader = Downloader::new(2, 2, false, false, SessionConfig::default());
    downloader
        .enqueue_file(format!("{}/file.bin", server.uri()), Some(dir.path().to_path_buf()), None, None, RequestOverrides::new())
        .unwrap();

    let results = downloader.download();

    assert_eq!(results.success().len(), 1);
    assert!(results.errors().is_empty());
    let final_path = &results.success()[0].path;
    assert_eq!(std::fs::read(final_path).unwrap(), body);
    let sidecar = final_path.with_file_name(format!("{}.matris", final_path.file_name().unwrap().to_string_lossy()));
    assert!(!sidecar.exists());
}

#[tokio::test]
async fn test_http_head_error_status_is_retried_up_to_max_tries_then_fails() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let session = SessionConfig::default().with_max_tries(3);
    let mut downloader = Downloader::new(2, 2, false, false, session);
    downloader
        .enqueue_file(format!("{}/missing.bin", server.uri()), Some(dir.path().to_path_buf()), None, None, RequestOverrides::new())
        .unwrap();

    let results = downloader.download();

    assert!(results.success().is_empty());
    assert_eq!(results.errors().len(), 1);
    assert!(results.errors()[0].cause.contains("404"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_name_collision_across_two_batches_gets_numbered_variant() {
    let server = MockServer::start().await;
    let body = b"payload".to_vec();
    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", body.len().to_string().as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();

    let mut first = Downloader::new(1, 1, false, false, SessionConfig::default());
    first
        .enqueue_file(format!("{}/file.bin", server.uri()), Some(dir.path().to_path_buf()), None, None, RequestOverrides::new())
        .unwrap();
    let first_results = first.download();
    assert_eq!(first_results.success()[0].path, dir.path().join("file.bin"));

    let mut second = Downloader::new(1, 1, false, false, SessionConfig::default());
    second
        .enqueue_file(format!("{}/file.bin", server.uri()), Some(dir.path().to_path_buf()), None, None, RequestOverrides::new())
        .unwrap();
    let second_results = second.download();
    assert_eq!(second_results.success()[0].path, dir.path().join("file.1.bin"));
}

#[tokio::test]
async fn test_results_url_count_invariant_holds_across_mixed_outcomes() {
    let server = MockServer::start().await;
    let body = b"ok".to_vec();
    Mock::given(method("HEAD"))
        .and(path("/ok.bin"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", body.len().to_string().as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/broken.bin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let mut downloader = Downloader::new(2, 2, false, false, SessionConfig::default());
    downloader
        .enqueue_file(format!("{}/ok.bin", server.uri()), Some(dir.path().to_path_buf()), None, None, RequestOverrides::new())
        .unwrap();
    downloader
        .enqueue_file(
            format!("{}/broken.bin", server.uri()),
            Some(dir.path().to_path_buf()),
            None,
            None,
            RequestOverrides::new().with_max_tries(1),
        )
        .unwrap();

    let results = downloader.download();
    assert_eq!(results.success().len() + results.errors().len(), results.urls().len());
    assert_eq!(results.urls().len(), 2);
}

#[tokio::test]
async fn test_results_preserve_enqueue_order_despite_reversed_completion_order() {
    let server = MockServer::start().await;
    let body = b"payload".to_vec();

    Mock::given(method("HEAD"))
        .and(path("/slow.bin"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", body.len().to_string().as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()).set_delay(std::time::Duration::from_millis(300)))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/fast.bin"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", body.len().to_string().as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let mut downloader = Downloader::new(2, 1, false, false, SessionConfig::default());
    // Enqueued first but finishes last; the reverse should hold for completion.
    downloader
        .enqueue_file(format!("{}/slow.bin", server.uri()), Some(dir.path().to_path_buf()), None, None, RequestOverrides::new())
        .unwrap();
    downloader
        .enqueue_file(format!("{}/fast.bin", server.uri()), Some(dir.path().to_path_buf()), None, None, RequestOverrides::new())
        .unwrap();

    let results = downloader.download();

    assert_eq!(results.success().len(), 2);
    assert!(results.success()[0].url.ends_with("/slow.bin"));
    assert!(results.success()[1].url.ends_with("/fast.bin"));
    assert_eq!(results.urls()[0], results.success()[0].url);
    assert_eq!(results.urls()[1], results.success()[1].url);
}

#[test]
fn test_enqueue_unsupported_scheme_is_rejected_immediately() {
    let mut downloader = Downloader::new(2, 2, false, false, SessionConfig::default());
    let result = downloader.enqueue_file("gopher://example.com/file", None, None, None, RequestOverrides::new());
    assert!(result.is_err());
    assert_eq!(downloader.queued_downloads(), 0);

    let results = downloader.download();
    assert_eq!(results.errors().len(), 1);
    assert_eq!(results.errors()[0].url, "gopher://example.com/file");
    assert_eq!(results.urls().len(), 1);
}

// Integration tests for the api.video transport
//
// These tests drive the full dispatch pipeline (token fetch, 401 retry,
// error reclassification, multipart encoding) against a mock API server.

use mockito::{Matcher, Mock, Server};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use apivideo_transport::{
    config::{ACCEPT, USER_AGENT},
    ApiError, ApiHttpClient, ClientConfig, FileSource, RequestOptions,
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

fn create_test_client(server: &Server) -> ApiHttpClient {
    ApiHttpClient::new(ClientConfig {
        api_key: Some("secret".to_string()),
        base_uri: server.url(),
        ..ClientConfig::default()
    })
    .expect("Failed to create HTTP client")
}

/// Auth endpoint that hands out `tokens` in order, repeating the last one
///
/// Returned uncreated so callers can set hit expectations first.
fn mock_auth(server: &mut Server, tokens: &'static [&'static str]) -> Mock {
    let counter = Arc::new(AtomicUsize::new(0));
    server
        .mock("POST", "/auth/api-key")
        .match_body(Matcher::Json(json!({ "apiKey": "secret" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let token = tokens[n.min(tokens.len() - 1)];
            json!({
                "tokenType": "Bearer",
                "accessToken": token,
                "refreshToken": format!("r{}", n + 1),
            })
            .to_string()
            .into_bytes()
        })
}

fn temp_video(content: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("clip")
        .suffix(".mp4")
        .tempfile()
        .unwrap();
    file.write_all(content).unwrap();
    file
}

// ==================================================================================================
// Token Lifecycle
// ==================================================================================================

#[tokio::test]
async fn test_first_call_fetches_token() {
    let mut server = Server::new_async().await;
    let auth = mock_auth(&mut server, &["abc"]).expect(1).create_async().await;
    let videos = server
        .mock("GET", "/videos")
        .match_header("authorization", "Bearer abc")
        .match_header("user-agent", USER_AGENT)
        .match_header("accept", ACCEPT)
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .expect(2)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let response = client.call("videos", RequestOptions::new()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(ApiHttpClient::is_successful(&response));

    // token is reused
    client.call("videos", RequestOptions::new()).await.unwrap();

    auth.assert_async().await;
    videos.assert_async().await;
    assert_eq!(
        client.credentials().get().await.unwrap().refresh_token,
        "r1"
    );
}

#[tokio::test]
async fn test_401_refreshes_and_retries_once() {
    let mut server = Server::new_async().await;
    let auth = mock_auth(&mut server, &["abc", "xyz"]).expect(2).create_async().await;
    let stale = server
        .mock("GET", "/videos")
        .match_header("authorization", "Bearer abc")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/videos")
        .match_header("authorization", "Bearer xyz")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let response = client.call("videos", RequestOptions::new()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // refreshed credential is the new default; no further fetch needed
    let response = client.call("videos", RequestOptions::new()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(client.credentials().get().await.unwrap().access_token, "xyz");

    auth.assert_async().await;
    stale.assert_async().await;
    fresh.assert_async().await;
}

#[tokio::test]
async fn test_second_401_is_not_retried() {
    let mut server = Server::new_async().await;
    let auth = mock_auth(&mut server, &["abc", "xyz", "never"]).expect(2).create_async().await;
    let videos = server
        .mock("GET", "/videos")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"expired"}"#)
        .expect(2)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let err = client.call("videos", RequestOptions::new()).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.status(), Some(401));
    auth.assert_async().await;
    videos.assert_async().await;
}

#[tokio::test]
async fn test_retry_failure_is_classified_normally() {
    let mut server = Server::new_async().await;
    let auth = mock_auth(&mut server, &["abc", "xyz", "never"]).expect(2).create_async().await;
    let stale = server
        .mock("GET", "/videos")
        .match_header("authorization", "Bearer abc")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let invalid = server
        .mock("GET", "/videos")
        .match_header("authorization", "Bearer xyz")
        .with_status(400)
        .with_header("content-type", "application/problem+json")
        .with_body(r#"{"title":"Bad Request","status":400}"#)
        .expect(1)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let err = client.call("videos", RequestOptions::new()).await.unwrap_err();

    let problem = err.problem().expect("expected a problem error");
    assert_eq!(problem.status, 400);
    assert_eq!(problem.details.title.as_deref(), Some("Bad Request"));
    auth.assert_async().await;
    stale.assert_async().await;
    invalid.assert_async().await;
}

#[tokio::test]
async fn test_auth_failure_stops_dispatch() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/api-key")
        .with_status(403)
        .with_header("content-type", "application/problem+json")
        .with_body(r#"{"title":"Forbidden","status":403}"#)
        .create_async()
        .await;
    let videos = server
        .mock("GET", "/videos")
        .expect(0)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let err = client.call("videos", RequestOptions::new()).await.unwrap_err();

    assert!(matches!(err, ApiError::AuthError { status: Some(403), .. }));
    videos.assert_async().await;
}

#[tokio::test]
async fn test_explicit_authorization_skips_token_fetch() {
    let mut server = Server::new_async().await;
    let auth = mock_auth(&mut server, &["abc"]).expect(0).create_async().await;
    let videos = server
        .mock("GET", "/videos")
        .match_header("authorization", "Bearer caller-token")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let options = RequestOptions::new()
        .header("Authorization", "Bearer caller-token")
        .unwrap();
    client.call("videos", options).await.unwrap();

    auth.assert_async().await;
    videos.assert_async().await;
    assert!(client.credentials().is_empty().await);
}

#[tokio::test]
async fn test_concurrent_first_use_each_request_is_authorized() {
    let mut server = Server::new_async().await;
    let auth = mock_auth(&mut server, &["abc"])
        .expect_at_least(1)
        .expect_at_most(2)
        .create_async()
        .await;
    let videos = server
        .mock("GET", "/videos")
        .match_header("authorization", "Bearer abc")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let (first, second) = futures::join!(
        client.call("videos", RequestOptions::new()),
        client.call("videos", RequestOptions::new()),
    );

    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);
    auth.assert_async().await;
    videos.assert_async().await;
}

// ==================================================================================================
// Error Reclassification
// ==================================================================================================

#[tokio::test]
async fn test_problem_payload_becomes_typed_error() {
    let mut server = Server::new_async().await;
    mock_auth(&mut server, &["abc"]).create_async().await;
    server
        .mock("GET", "/videos")
        .with_status(400)
        .with_header("content-type", "application/problem+json")
        .with_body(r#"{"type":"https://docs.api.video/reference/invalid-attribute","title":"Bad Request","status":400}"#)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let err = client.call("videos", RequestOptions::new()).await.unwrap_err();

    let problem = err.problem().expect("expected a problem error");
    assert_eq!(problem.status, 400);
    assert_eq!(problem.details.title.as_deref(), Some("Bad Request"));
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_other_failures_keep_transport_error() {
    let mut server = Server::new_async().await;
    mock_auth(&mut server, &["abc"]).create_async().await;
    server
        .mock("GET", "/videos/missing")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"title":"Not Found","status":404}"#)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let err = client
        .call("videos/missing", RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_stream_mode_bypasses_retry_and_reclassification() {
    let mut server = Server::new_async().await;
    let auth = mock_auth(&mut server, &["abc", "xyz"]).expect(1).create_async().await;
    let unauthorized = server
        .mock("GET", "/videos/abc/source")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/videos/bad/source")
        .with_status(400)
        .with_header("content-type", "application/problem+json")
        .with_body(r#"{"title":"Bad Request","status":400}"#)
        .create_async()
        .await;

    let client = create_test_client(&server);

    let response = client
        .call("videos/abc/source", RequestOptions::new().stream(true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .call("videos/bad/source", RequestOptions::new().stream(true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!ApiHttpClient::is_successful(&response));

    auth.assert_async().await;
    unauthorized.assert_async().await;
}

// ==================================================================================================
// Request Options
// ==================================================================================================

#[tokio::test]
async fn test_call_with_method_query_and_json_body() {
    let mut server = Server::new_async().await;
    mock_auth(&mut server, &["abc"]).create_async().await;
    let create = server
        .mock("POST", "/videos")
        .match_query(Matcher::UrlEncoded("dryRun".into(), "true".into()))
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({ "title": "Maths course" })))
        .with_status(201)
        .with_body(r#"{"videoId":"vi123"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let options = RequestOptions::new()
        .method(Method::POST)
        .query("dryRun", "true")
        .json(json!({ "title": "Maths course" }));
    let response = client.call("videos", options).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["videoId"], "vi123");
    create.assert_async().await;
}

// ==================================================================================================
// Multipart Uploads
// ==================================================================================================

#[tokio::test]
async fn test_submit_from_bytes_uses_caller_field_name() {
    let mut server = Server::new_async().await;
    mock_auth(&mut server, &["abc"]).create_async().await;
    let upload = server
        .mock("POST", "/videos/vi123/thumbnail")
        .match_header("content-type", Matcher::Regex("^multipart/form-data; boundary=".into()))
        .match_header("x-custom", "1")
        .match_body(Matcher::Regex(
            r#"(?s)name="thumb.jpg"; filename="thumb.jpg".*jpeg-bytes"#.into(),
        ))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let mut headers = HeaderMap::new();
    headers.insert("x-custom", "1".parse().unwrap());
    client
        .submit(
            "videos/vi123/thumbnail",
            FileSource::from(b"jpeg-bytes".to_vec()),
            "thumb.jpg",
            headers,
        )
        .await
        .unwrap();

    upload.assert_async().await;
}

#[tokio::test]
async fn test_submit_multipart_preserves_field_order() {
    let mut server = Server::new_async().await;
    mock_auth(&mut server, &["abc"]).create_async().await;
    let file = temp_video(b"frame-data");
    let file_name = file.path().file_name().unwrap().to_string_lossy().to_string();

    let pattern = format!(
        r#"(?s)name="file"; filename="{}".*frame-data.*name="zeta"\r\n\r\nlast letter\r\n.*name="alpha"\r\n\r\nfirst letter\r\n.*name="mid"\r\n\r\na=b\r\n"#,
        file_name.replace('.', r"\.")
    );
    let upload = server
        .mock("POST", "/watermarks")
        .match_body(Matcher::Regex(pattern))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let fields = vec![
        ("zeta".to_string(), "last letter".to_string()),
        ("alpha".to_string(), "first letter".to_string()),
        ("mid".to_string(), "a=b".to_string()),
    ];
    client
        .submit_multipart("watermarks", file.path(), fields, HeaderMap::new())
        .await
        .unwrap();

    upload.assert_async().await;
}

#[tokio::test]
async fn test_file_upload_is_reopened_on_retry() {
    let mut server = Server::new_async().await;
    let auth = mock_auth(&mut server, &["abc", "xyz"]).expect(2).create_async().await;
    let file = temp_video(b"full-file-content");

    let body = Matcher::Regex(r#"(?s)name="source".*full-file-content"#.into());
    let rejected = server
        .mock("POST", "/videos/vi123/source")
        .match_header("authorization", "Bearer abc")
        .match_body(body.clone())
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/videos/vi123/source")
        .match_header("authorization", "Bearer xyz")
        .match_body(body)
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let response = client
        .submit("videos/vi123/source", file.path().to_path_buf(), "source", HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    auth.assert_async().await;
    rejected.assert_async().await;
    accepted.assert_async().await;
}

#[tokio::test]
async fn test_missing_upload_file_is_io_error() {
    let mut server = Server::new_async().await;
    mock_auth(&mut server, &["abc"]).create_async().await;
    let upload = server
        .mock("POST", "/videos/vi123/source")
        .expect(0)
        .create_async()
        .await;

    let client = create_test_client(&server);
    let err = client
        .submit_multipart(
            "videos/vi123/source",
            "/no/such/file.mp4",
            Vec::new(),
            HeaderMap::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Io(_)));
    upload.assert_async().await;
}

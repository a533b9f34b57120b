//! Router-level tests for the facematch HTTP API.
//!
//! Requests go through the full axum stack with `tower::ServiceExt::oneshot`.
//! Candidate images are served by a mockito server; the face encoder is the
//! deterministic thumbnail encoder, which treats a whole picture as one face
//! and a flat picture as no face.

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use axum::Router;
use embedding::ThumbnailEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use matcher::{FetchConfig, HttpImageFetcher};
use mockito::Matcher;
use records::{FirestoreClient, FirestoreConfig, RecordSource, RecordsError, StaticRecordSource};
use serde_json::{json, Value};
use server::routes::matching::MatchResponse;
use server::{build_router, ServerConfig, ServerState};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "facematch-test-boundary";

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

fn diagonal(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let v = ((x + y) * 255 / (2 * size)) as u8;
        Rgb([v, v, v])
    })
}

fn inverted(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let v = 255 - ((x + y) * 255 / (2 * size)) as u8;
        Rgb([v, v, v])
    })
}

fn flat(size: u32) -> RgbImage {
    RgbImage::from_pixel(size, size, Rgb([90, 90, 90]))
}

fn encode(img: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), format)
        .unwrap();
    out
}

fn png(img: RgbImage) -> Vec<u8> {
    encode(img, ImageFormat::Png)
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn reference(content_type: &'static str, data: &'static [u8]) -> Part<'static> {
    Part::File {
        name: "reference_image",
        filename: "me.png",
        content_type,
        data,
    }
}

fn match_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/match-images/")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Record source that counts how often it is asked.
struct CountingSource {
    inner: Arc<dyn RecordSource>,
    calls: AtomicUsize,
}

#[async_trait]
impl RecordSource for CountingSource {
    async fn list_photo_urls(&self, group_id: &str) -> Result<Vec<Option<String>>, RecordsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_photo_urls(group_id).await
    }
}

struct TestApp {
    router: Router,
    calls: Arc<CountingSource>,
    upload_dir: TempDir,
}

impl TestApp {
    fn new(records: Arc<dyn RecordSource>) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            upload_dir: upload_dir.path().to_string_lossy().into_owned(),
            default_group_id: "trip".into(),
            ..Default::default()
        };
        let calls = Arc::new(CountingSource {
            inner: records,
            calls: AtomicUsize::new(0),
        });
        let fetcher = HttpImageFetcher::new(&FetchConfig::default()).unwrap();
        let state = ServerState::from_parts(
            config,
            Arc::new(ThumbnailEncoder::new()),
            calls.clone(),
            Arc::new(fetcher),
        )
        .unwrap();

        Self {
            router: build_router(Arc::new(state)),
            calls,
            upload_dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    fn store_calls(&self) -> usize {
        self.calls.calls.load(Ordering::SeqCst)
    }

    fn scratch_files(&self) -> usize {
        count_files(self.upload_dir.path())
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Photos hosted on `server`: A and D show the reference person, B someone
/// else, C is a dead link, and one record has no URL at all.
async fn host_group(server: &mut mockito::Server) -> (Vec<Option<String>>, Vec<mockito::Mock>) {
    let mut mocks = Vec::new();
    for (path, body) in [
        ("/A.png", png(diagonal(48))),
        ("/B.png", png(inverted(48))),
        ("/D.jpg", encode(diagonal(96), ImageFormat::Jpeg)),
    ] {
        mocks.push(
            server
                .mock("GET", path)
                .with_status(200)
                .with_body(body)
                .create_async()
                .await,
        );
    }
    mocks.push(
        server
            .mock("GET", "/C.png")
            .with_status(404)
            .create_async()
            .await,
    );

    let url = |p: &str| Some(format!("{}{p}", server.url()));
    let urls = vec![url("/A.png"), url("/B.png"), url("/C.png"), None, url("/D.jpg")];
    (urls, mocks)
}

fn expected_hits(server: &mockito::Server) -> Vec<String> {
    vec![format!("{}/A.png", server.url()), format!("{}/D.jpg", server.url())]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn greeting_routes() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new()));

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Hello, it's facematch");

    let (status, body) = app.get("/api/test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Hello, World!");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new()));
    let (status, body) = app
        .send_json(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not found"}));
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new()));
    let (status, body) = app
        .send_json(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new()));

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/test")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/api/test").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn missing_reference_part() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new()));

    let (status, body) = app
        .send_json(match_request(&[Part::Text {
            name: "group_id",
            value: "trip",
        }]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No image part"}));

    let not_multipart = Request::builder()
        .method("POST")
        .uri("/api/match-images/")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = app.send_json(not_multipart).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No image part"}));
    assert_eq!(app.store_calls(), 0);
}

#[tokio::test]
async fn unsupported_format_is_rejected_before_any_work() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new().with_group(
        "trip",
        [Some("http://127.0.0.1:9/never-fetched.png")],
    )));
    let bytes = png(diagonal(32));

    let (status, body) = app
        .send_json(match_request(&[Part::File {
            name: "reference_image",
            filename: "me.gif",
            content_type: "image/gif",
            data: &bytes,
        }]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid image format. Use JPEG or PNG."}));
    assert_eq!(app.store_calls(), 0);
    assert_eq!(app.scratch_files(), 0);
}

#[tokio::test]
async fn undecodable_upload_is_bad_request() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new()));
    let (status, body) = app
        .send_json(match_request(&[reference("image/png", b"this is not a png")]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(app.store_calls(), 0);
    assert_eq!(app.scratch_files(), 0);
}

#[tokio::test]
async fn faceless_reference_fails_for_any_group() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new()));
    let blank = png(flat(40));

    for group in [None, Some("trip"), Some("does-not-exist")] {
        let mut parts = vec![Part::File {
            name: "reference_image",
            filename: "blank.png",
            content_type: "image/png",
            data: &blank,
        }];
        if let Some(group) = group {
            parts.push(Part::Text {
                name: "group_id",
                value: group,
            });
        }

        let (status, body) = app.send_json(match_request(&parts)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "group {group:?}");
        assert_eq!(body, json!({"error": "No face found in the reference image."}));
    }
    assert_eq!(app.store_calls(), 0);
    assert_eq!(app.scratch_files(), 0);
}

#[tokio::test]
async fn matches_group_photos_in_record_order() {
    let mut images = mockito::Server::new_async().await;
    let (urls, _mocks) = host_group(&mut images).await;
    let app = TestApp::new(Arc::new(StaticRecordSource::new().with_group("beach", urls)));
    let me = png(diagonal(64));

    let (status, body) = app
        .send(match_request(&[
            Part::Text {
                name: "group_id",
                value: "beach",
            },
            Part::File {
                name: "reference_image",
                filename: "me.png",
                content_type: "image/png",
                data: &me,
            },
        ]))
        .await;

    assert_eq!(status, StatusCode::OK);
    let response: MatchResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.matching_images, expected_hits(&images));
    assert_eq!(app.store_calls(), 1);
    assert_eq!(app.scratch_files(), 0);
}

#[tokio::test]
async fn jpeg_reference_and_default_group() {
    let mut images = mockito::Server::new_async().await;
    let (urls, _mocks) = host_group(&mut images).await;
    let app = TestApp::new(Arc::new(StaticRecordSource::new().with_group("trip", urls)));
    let me = encode(diagonal(64), ImageFormat::Jpeg);

    // A blank group id falls back to the configured default.
    let (status, body) = app
        .send_json(match_request(&[
            Part::File {
                name: "reference_image",
                filename: "me.jpg",
                content_type: "image/jpeg",
                data: &me,
            },
            Part::Text {
                name: "group_id",
                value: "  ",
            },
        ]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"matching_images": expected_hits(&images)}));
}

#[tokio::test]
async fn empty_group_matches_nothing() {
    let app = TestApp::new(Arc::new(StaticRecordSource::new()));
    let me = png(diagonal(64));
    let (status, body) = app
        .send_json(match_request(&[
            Part::File {
                name: "reference_image",
                filename: "me.png",
                content_type: "image/png",
                data: &me,
            },
            Part::Text {
                name: "group_id",
                value: "empty",
            },
        ]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"matching_images": []}));
}

#[tokio::test]
async fn relative_group_ids_are_bad_requests() {
    let mut images = mockito::Server::new_async().await;
    let (urls, _mocks) = host_group(&mut images).await;
    let app = TestApp::new(Arc::new(StaticRecordSource::new().with_group("..", urls)));
    let me = png(diagonal(64));

    for group in [".", ".."] {
        let (status, body) = app
            .send_json(match_request(&[
                Part::File {
                    name: "reference_image",
                    filename: "me.png",
                    content_type: "image/png",
                    data: &me,
                },
                Part::Text {
                    name: "group_id",
                    value: group,
                },
            ]))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "group {group:?}");
        assert_eq!(body, json!({"error": format!("Invalid group id '{group}'")}));
    }
    assert_eq!(app.scratch_files(), 0);
}

#[tokio::test]
async fn repeated_requests_give_identical_results() {
    let mut images = mockito::Server::new_async().await;
    let (urls, _mocks) = host_group(&mut images).await;
    let app = TestApp::new(Arc::new(StaticRecordSource::new().with_group("trip", urls)));
    let me = png(diagonal(64));

    let mut bodies = Vec::new();
    for _ in 0..3 {
        let (status, body) = app
            .send_json(match_request(&[Part::File {
                name: "reference_image",
                filename: "me.png",
                content_type: "image/png",
                data: &me,
            }]))
            .await;
        assert_eq!(status, StatusCode::OK);
        bodies.push(body);
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(app.scratch_files(), 0);
}

#[tokio::test]
async fn record_store_failure_is_generic_500() {
    let mut firestore = mockito::Server::new_async().await;
    let _mock = firestore
        .mock("GET", Matcher::Regex(r"/documents/groups/trip/photos".into()))
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("backend unavailable")
        .create_async()
        .await;
    let client = FirestoreClient::from_config(&FirestoreConfig {
        emulator_host: Some(firestore.host_with_port()),
        project_id: Some("demo".into()),
        ..Default::default()
    })
    .unwrap();
    let app = TestApp::new(Arc::new(client));
    let me = png(diagonal(64));

    let (status, body) = app
        .send_json(match_request(&[Part::File {
            name: "reference_image",
            filename: "me.png",
            content_type: "image/png",
            data: &me,
        }]))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
    assert_eq!(app.scratch_files(), 0);
}

#[tokio::test]
async fn end_to_end_through_firestore_emulator() {
    let mut server = mockito::Server::new_async().await;
    let (urls, _mocks) = host_group(&mut server).await;

    let documents: Vec<Value> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            let fields = match url {
                Some(url) => json!({"photoURL": {"stringValue": url}}),
                None => json!({"caption": {"stringValue": "no link"}}),
            };
            json!({
                "name": format!("projects/demo/databases/(default)/documents/groups/beach/photos/{i}"),
                "fields": fields,
            })
        })
        .collect();
    let listing = server
        .mock(
            "GET",
            Matcher::Regex(r"^/v1/projects/demo/databases/\(default\)/documents/groups/beach/photos".into()),
        )
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer owner")
        .with_status(200)
        .with_body(json!({ "documents": documents }).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = FirestoreClient::from_config(&FirestoreConfig {
        emulator_host: Some(server.host_with_port()),
        project_id: Some("demo".into()),
        ..Default::default()
    })
    .unwrap();
    let app = TestApp::new(Arc::new(client));
    let me = png(diagonal(64));

    let (status, body) = app
        .send_json(match_request(&[
            Part::File {
                name: "reference_image",
                filename: "me.png",
                content_type: "image/png",
                data: &me,
            },
            Part::Text {
                name: "group_id",
                value: "beach",
            },
        ]))
        .await;

    listing.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"matching_images": expected_hits(&server)}));
}

#[tokio::test]
async fn metrics_expose_candidate_outcomes() {
    let mut images = mockito::Server::new_async().await;
    let (urls, _mocks) = host_group(&mut images).await;
    let app = TestApp::new(Arc::new(StaticRecordSource::new().with_group("trip", urls)));
    let me = png(diagonal(64));

    let (status, _) = app
        .send(match_request(&[Part::File {
            name: "reference_image",
            filename: "me.png",
            content_type: "image/png",
            data: &me,
        }]))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains(r#"facematch_candidates_total{outcome="matched"} 2"#), "{text}");
    assert!(text.contains(r#"facematch_candidates_total{outcome="no_match"} 1"#), "{text}");
    assert!(text.contains(r#"facematch_candidates_total{outcome="fetch_failed"} 1"#), "{text}");
    assert!(text.contains(r#"facematch_candidates_total{outcome="skipped"} 1"#), "{text}");
    assert!(text.contains("facematch_requests_total"), "{text}");
}

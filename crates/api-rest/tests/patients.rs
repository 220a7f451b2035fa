use api_rest::{router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use registry_core::{db, LocalFileStorage, NotificationDispatcher, PatientService};
use registry_notify::{NoopNotifier, NotificationMessage, Notifier};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

const MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;
const BOUNDARY: &str = "registry-test-boundary";

struct SpyNotifier(mpsc::UnboundedSender<NotificationMessage>);

#[async_trait]
impl Notifier for SpyNotifier {
    async fn notify(&self, message: NotificationMessage) {
        let _ = self.0.send(message);
    }

    fn kind(&self) -> &'static str {
        "spy"
    }
}

struct TestApp {
    _temp_dir: TempDir,
    uploads: PathBuf,
    app: Router,
    sent: mpsc::UnboundedReceiver<NotificationMessage>,
}

async fn app_with(notifier: Option<Arc<dyn Notifier>>) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let uploads = temp_dir.path().join("uploads");
    let url = format!("sqlite://{}", temp_dir.path().join("registry.db").display());
    let pool = db::connect(&url, 4).await.unwrap();
    db::migrate(&pool).await.unwrap();

    let (tx, sent) = mpsc::unbounded_channel();
    let notifier = notifier.unwrap_or_else(|| Arc::new(SpyNotifier(tx)) as Arc<dyn Notifier>);
    let storage = Arc::new(LocalFileStorage::new(&uploads, MAX_DOCUMENT_BYTES).unwrap());
    let patients = PatientService::new(
        pool,
        storage,
        NotificationDispatcher::new(notifier),
        MAX_DOCUMENT_BYTES,
    );

    TestApp {
        _temp_dir: temp_dir,
        uploads,
        app: router(AppState { patients }),
        sent,
    }
}

async fn app() -> TestApp {
    app_with(None).await
}

struct Upload<'a> {
    filename: &'a str,
    content_type: &'a str,
    bytes: &'a [u8],
}

fn jpeg(bytes: &[u8]) -> Upload<'_> {
    Upload {
        filename: "id-card.jpg",
        content_type: "image/jpeg",
        bytes,
    }
}

fn png(bytes: &[u8]) -> Upload<'_> {
    Upload {
        filename: "id-card.png",
        content_type: "image/png",
        bytes,
    }
}

fn multipart_body(fields: &[(&str, &str)], upload: Option<&Upload<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(upload) = upload {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document_photo\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                upload.filename, upload.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(upload.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(
    method: Method,
    uri: &str,
    fields: &[(&str, &str)],
    upload: Option<&Upload<'_>>,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, upload)))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn patient_fields<'a>(name: &'a str, email: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("full_name", name),
        ("email", email),
        ("phone_number", "+59899111222"),
    ]
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    Reply {
        status,
        headers,
        body,
    }
}

async fn create(app: &Router, name: &str, email: &str, upload: &Upload<'_>) -> Reply {
    send(
        app,
        multipart_request(
            Method::POST,
            "/patients",
            &patient_fields(name, email),
            Some(upload),
        ),
    )
    .await
}

async fn create_ok(app: &Router, name: &str, email: &str) -> String {
    let reply = create(app, name, email, &png(b"\x89PNG-bytes")).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.json()["id"].as_str().unwrap().to_string()
}

fn stored_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stored_files(&path)
            } else {
                1
            }
        })
        .sum()
}

async fn next_message(rx: &mut mpsc::UnboundedReceiver<NotificationMessage>) -> NotificationMessage {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("no notification sent")
        .expect("channel closed")
}

fn assert_error(reply: &Reply, status: StatusCode, code: &str) {
    assert_eq!(reply.status, status);
    let body = reply.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], code);
}

#[tokio::test]
async fn test_health() {
    let t = app().await;
    let reply = send(&t.app, empty_request(Method::GET, "/health")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["ok"], true);
}

#[tokio::test]
async fn test_create_then_download_document() {
    let mut t = app().await;
    let photo = b"\xFF\xD8\xFF\xE0 fake jpeg payload";

    let reply = create(&t.app, "Ana Lopez", "ana@example.com", &jpeg(photo)).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let body = reply.json();
    assert_eq!(body["full_name"], "Ana Lopez");
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["phone_number"], "+59899111222");
    assert_eq!(body["document_file"]["content_type"], "image/jpeg");
    assert_eq!(body["document_file"]["original_filename"], "id-card.jpg");
    assert_eq!(body["document_file"]["size_bytes"], photo.len());

    let id = body["id"].as_str().unwrap();
    let download = send(
        &t.app,
        empty_request(Method::GET, &format!("/patients/{id}/document-photo")),
    )
    .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.body, photo);
    assert_eq!(download.headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        download.headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"id-card.jpg\""
    );

    let message = next_message(&mut t.sent).await;
    assert_eq!(message.recipient, "ana@example.com");
    assert_eq!(
        message.subject.as_deref(),
        Some("Patient registration confirmation")
    );
    assert_eq!(
        message.body,
        "Hello Ana Lopez, your patient registration was successful."
    );
}

#[tokio::test]
async fn test_create_with_noop_notifier_succeeds() {
    let t = app_with(Some(Arc::new(NoopNotifier))).await;
    create_ok(&t.app, "Ana Lopez", "ana@example.com").await;
}

#[tokio::test]
async fn test_oversized_document_is_rejected_and_nothing_persists() {
    let t = app().await;
    let big = vec![0xAB; MAX_DOCUMENT_BYTES as usize + 1];

    let reply = create(&t.app, "Ana Lopez", "ana@example.com", &png(&big)).await;
    assert_error(&reply, StatusCode::BAD_REQUEST, "INVALID_PAYLOAD");
    assert_eq!(
        reply.json()["message"],
        "Document photo exceeds max size of 5MB."
    );

    let list = send(&t.app, empty_request(Method::GET, "/patients")).await;
    assert_eq!(list.json()["total"], 0);
    assert_eq!(stored_files(&t.uploads), 0);
}

#[tokio::test]
async fn test_disallowed_document_types_are_rejected() {
    let t = app().await;
    let cases = [
        Upload {
            filename: "id.gif",
            content_type: "image/gif",
            bytes: b"GIF89a",
        },
        Upload {
            filename: "id.png",
            content_type: "image/jpeg",
            bytes: b"data",
        },
        Upload {
            filename: "id.pdf",
            content_type: "application/pdf",
            bytes: b"%PDF",
        },
    ];

    for upload in &cases {
        let reply = create(&t.app, "Ana Lopez", "ana@example.com", upload).await;
        assert_error(&reply, StatusCode::BAD_REQUEST, "INVALID_PAYLOAD");
        assert_eq!(
            reply.json()["message"],
            "Document photo must be PNG or JPG/JPEG."
        );
    }

    let list = send(&t.app, empty_request(Method::GET, "/patients")).await;
    assert_eq!(list.json()["total"], 0);
    assert_eq!(stored_files(&t.uploads), 0);
}

#[tokio::test]
async fn test_create_validation_errors_list_fields() {
    let t = app().await;

    let reply = send(
        &t.app,
        multipart_request(
            Method::POST,
            "/patients",
            &[
                ("full_name", "Ana Lopez"),
                ("email", "not-an-email"),
                ("phone_number", "12"),
            ],
            Some(&png(b"x")),
        ),
    )
    .await;
    assert_error(&reply, StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR");
    let fields: Vec<String> = reply.json()["details"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["email", "phone_number"]);

    let reply = send(&t.app, empty_request(Method::POST, "/patients")).await;
    assert_error(&reply, StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR");
    assert_eq!(reply.json()["details"]["errors"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_duplicate_email_conflicts_without_extra_notification() {
    let mut t = app().await;
    create_ok(&t.app, "Ana Lopez", "ana@example.com").await;
    next_message(&mut t.sent).await;

    let reply = create(&t.app, "Someone Else", "ana@example.com", &png(b"other")).await;
    assert_error(&reply, StatusCode::CONFLICT, "DUPLICATE_RESOURCE");
    assert_eq!(
        reply.json()["message"],
        "A patient with this email already exists."
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(t.sent.try_recv().is_err());
    assert_eq!(stored_files(&t.uploads), 1);
}

#[tokio::test]
async fn test_list_pagination() {
    let t = app().await;
    let a = create_ok(&t.app, "Patient One", "one@example.com").await;
    let b = create_ok(&t.app, "Patient Two", "two@example.com").await;
    let c = create_ok(&t.app, "Patient Three", "three@example.com").await;

    let first = send(&t.app, empty_request(Method::GET, "/patients?page=1&size=2")).await;
    assert_eq!(first.status, StatusCode::OK);
    let first = first.json();
    assert_eq!(first["total"], 3);
    assert_eq!(first["page"], 1);
    assert_eq!(first["size"], 2);
    let ids: Vec<&str> = first["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![c.as_str(), b.as_str()]);

    let second = send(&t.app, empty_request(Method::GET, "/patients?page=2&size=2"))
        .await
        .json();
    let items = second["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], a.as_str());

    let defaults = send(&t.app, empty_request(Method::GET, "/patients")).await.json();
    assert_eq!(defaults["page"], 1);
    assert_eq!(defaults["size"], 10);
    assert_eq!(defaults["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_rejects_out_of_range_paging() {
    let t = app().await;
    for query in ["page=0", "size=0", "size=101", "page=abc"] {
        let reply = send(
            &t.app,
            empty_request(Method::GET, &format!("/patients?{query}")),
        )
        .await;
        assert_error(&reply, StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_get_unknown_and_malformed_ids() {
    let t = app().await;

    let reply = send(
        &t.app,
        empty_request(Method::GET, "/patients/5f0c7f1e-8a5e-4c9a-9d6b-2f1c3b1e4a7d"),
    )
    .await;
    assert_error(&reply, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_eq!(reply.json()["message"], "Patient was not found.");

    let reply = send(&t.app, empty_request(Method::GET, "/patients/not-a-uuid")).await;
    assert_error(&reply, StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR");

    let reply = send(
        &t.app,
        empty_request(
            Method::DELETE,
            "/patients/5f0c7f1e-8a5e-4c9a-9d6b-2f1c3b1e4a7d",
        ),
    )
    .await;
    assert_error(&reply, StatusCode::NOT_FOUND, "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_removes_patient_and_document() {
    let t = app().await;
    let id = create_ok(&t.app, "Ana Lopez", "ana@example.com").await;
    assert_eq!(stored_files(&t.uploads), 1);

    let reply = send(&t.app, empty_request(Method::DELETE, &format!("/patients/{id}"))).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert!(reply.body.is_empty());

    let document = send(
        &t.app,
        empty_request(Method::GET, &format!("/patients/{id}/document-photo")),
    )
    .await;
    assert_error(&document, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_eq!(stored_files(&t.uploads), 0);

    let again = send(&t.app, empty_request(Method::DELETE, &format!("/patients/{id}"))).await;
    assert_error(&again, StatusCode::NOT_FOUND, "NOT_FOUND");
}

#[tokio::test]
async fn test_put_replaces_fields_and_document() {
    let t = app().await;
    let created = create(&t.app, "Ana Lopez", "ana@example.com", &png(b"old-bytes")).await;
    let created = created.json();
    let id = created["id"].as_str().unwrap();

    let reply = send(
        &t.app,
        multipart_request(
            Method::PUT,
            &format!("/patients/{id}"),
            &patient_fields("Ana Maria Lopez", "ana.maria@example.com"),
            Some(&jpeg(b"new-bytes")),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["full_name"], "Ana Maria Lopez");
    assert_eq!(body["email"], "ana.maria@example.com");
    assert_eq!(body["document_file"]["content_type"], "image/jpeg");
    assert_ne!(body["document_file"]["id"], created["document_file"]["id"]);
    assert_eq!(body["created_at"], created["created_at"]);

    let old_path = created["document_file"]["storage_path"].as_str().unwrap();
    assert!(!t.uploads.join(old_path).exists());
    assert_eq!(stored_files(&t.uploads), 1);

    let download = send(
        &t.app,
        empty_request(Method::GET, &format!("/patients/{id}/document-photo")),
    )
    .await;
    assert_eq!(download.body, b"new-bytes");
}

#[tokio::test]
async fn test_put_requires_every_field() {
    let t = app().await;
    let id = create_ok(&t.app, "Ana Lopez", "ana@example.com").await;

    let reply = send(
        &t.app,
        multipart_request(
            Method::PUT,
            &format!("/patients/{id}"),
            &[("full_name", "Ana Lopez")],
            None,
        ),
    )
    .await;
    assert_error(&reply, StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_patch_updates_supplied_fields_only() {
    let t = app().await;
    let id = create_ok(&t.app, "Ana Lopez", "ana@example.com").await;

    let reply = send(
        &t.app,
        multipart_request(
            Method::PATCH,
            &format!("/patients/{id}"),
            &[("phone_number", "099123456")],
            None,
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["phone_number"], "099123456");
    assert_eq!(body["full_name"], "Ana Lopez");
    assert_eq!(body["email"], "ana@example.com");
}

#[tokio::test]
async fn test_empty_patch_is_invalid_payload() {
    let t = app().await;
    let id = create_ok(&t.app, "Ana Lopez", "ana@example.com").await;

    let empty_form = send(
        &t.app,
        multipart_request(Method::PATCH, &format!("/patients/{id}"), &[], None),
    )
    .await;
    assert_error(&empty_form, StatusCode::BAD_REQUEST, "INVALID_PAYLOAD");
    assert_eq!(
        empty_form.json()["message"],
        "At least one field or document photo must be provided."
    );

    let no_body = send(&t.app, empty_request(Method::PATCH, &format!("/patients/{id}"))).await;
    assert_error(&no_body, StatusCode::BAD_REQUEST, "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_patch_to_taken_email_conflicts() {
    let t = app().await;
    create_ok(&t.app, "Ana Lopez", "ana@example.com").await;
    let id = create_ok(&t.app, "Bruno Diaz", "bruno@example.com").await;

    let reply = send(
        &t.app,
        multipart_request(
            Method::PATCH,
            &format!("/patients/{id}"),
            &[("email", "ana@example.com")],
            None,
        ),
    )
    .await;
    assert_error(&reply, StatusCode::CONFLICT, "DUPLICATE_RESOURCE");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let t = app().await;
    let reply = send(&t.app, empty_request(Method::GET, "/health")).await;
    assert!(reply.headers.contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let reply = send(&t.app, request).await;
    assert_eq!(reply.headers["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let t = app().await;
    let reply = send(&t.app, empty_request(Method::GET, "/api-docs/openapi.json")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.json()["paths"]["/patients/{id}/document-photo"].is_object());
}

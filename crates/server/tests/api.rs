use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use engine::{Engine, LocalBlobStore};
use migration::MigratorTrait;

const BOUNDARY: &str = "BOOKKEEPING_BOUNDARY";

async fn test_app() -> (Router, TempDir) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::builder()
        .database(db)
        .blob_store(Arc::new(LocalBlobStore::new(dir.path())))
        .build()
        .await
        .unwrap();
    (server::app(engine, server::DEFAULT_MAX_UPLOAD_BYTES), dir)
}

fn multipart_body(fields: &[(&str, &str)], receipt: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = receipt {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"receipt\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn request(method: &str, uri: &str, user: Option<(&str, &str)>, body: Option<Vec<u8>>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user_id, role)) = user {
        builder = builder.header("x-user-id", user_id).header("x-user-role", role);
    }
    match body {
        Some(body) => builder
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

const EMPLOYEE_7: Option<(&str, &str)> = Some(("7", "employee"));
const EMPLOYEE_9: Option<(&str, &str)> = Some(("9", "employee"));
const ADMIN_1: Option<(&str, &str)> = Some(("1", "admin"));

async fn create_expense(app: &Router) -> i64 {
    let body = multipart_body(
        &[
            ("amount", "150.00"),
            ("description", "Office supplies"),
            ("type", "operational"),
        ],
        Some(("ticket.pdf", b"%PDF-1.4 office")),
    );
    let (status, json) = send(app, request("POST", "/expenses", EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_needs_no_identity() {
    let (app, _dir) = test_app().await;

    let (status, json) = send(&app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn records_need_identity_headers() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(&app, request("GET", "/expenses", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/expenses", Some(("abc", "admin")), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/expenses", Some(("3", "janitor")), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_returns_record_with_receipt() {
    let (app, _dir) = test_app().await;
    let body = multipart_body(
        &[
            ("amount", "150.00"),
            ("description", "Office supplies"),
            ("type", "operational"),
        ],
        Some(("ticket.pdf", b"%PDF-1.4 office")),
    );

    let (status, json) = send(&app, request("POST", "/expenses", EMPLOYEE_7, Some(body))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["kind"], "expense");
    assert_eq!(json["amount"], "150.00");
    assert_eq!(json["amount_minor"], 15_000);
    assert_eq!(json["type"], "operational");
    assert_eq!(json["created_by"], 7);
    assert_eq!(json["receipt"]["uploaded_by"], 7);
    assert_eq!(json["receipt"]["mime_type"], "application/pdf");
    assert_eq!(
        json["receipt"]["checksum"],
        engine::checksum(b"%PDF-1.4 office")
    );
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let (app, _dir) = test_app().await;

    let body = multipart_body(
        &[("amount", "10"), ("description", "x"), ("type", "operational")],
        Some(("photo.png", b"png")),
    );
    let (status, _) = send(&app, request("POST", "/expenses", EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let body = multipart_body(
        &[("amount", "10"), ("description", "x"), ("type", "operational")],
        None,
    );
    let (status, json) = send(&app, request("POST", "/expenses", EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("receipt file is required"));

    let body = multipart_body(
        &[("amount", "10"), ("description", "x"), ("type", "operational")],
        Some(("a.pdf", b"%PDF")),
    );
    let (status, _) = send(&app, request("POST", "/incomes", EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let body = multipart_body(&[("description", "x"), ("type", "operational")], Some(("a.pdf", b"%PDF")));
    let (status, _) = send(&app, request("POST", "/expenses", EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn soft_delete_restore_flow() {
    let (app, _dir) = test_app().await;
    let id = create_expense(&app).await;
    let uri = format!("/expenses/{id}");

    let (status, _) = send(&app, request("DELETE", &uri, EMPLOYEE_9, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request("GET", &uri, EMPLOYEE_9, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request("DELETE", &uri, EMPLOYEE_7, None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, request("GET", &uri, EMPLOYEE_7, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, json) = send(&app, request("GET", "/expenses", EMPLOYEE_7, None)).await;
    assert_eq!(json["records"].as_array().unwrap().len(), 0);

    let (status, json) = send(&app, request("POST", &format!("{uri}/restore"), EMPLOYEE_9, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["description"], "Office supplies");
    let (_, json) = send(&app, request("GET", "/expenses", EMPLOYEE_7, None)).await;
    assert_eq!(json["records"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_is_sparse_and_creator_only() {
    let (app, _dir) = test_app().await;
    let id = create_expense(&app).await;
    let uri = format!("/expenses/{id}");

    let body = multipart_body(&[("description", "Stolen")], None);
    let (status, _) = send(&app, request("PATCH", &uri, EMPLOYEE_9, Some(body))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let body = multipart_body(&[("amount", "99,50")], Some(("new.pdf", b"%PDF-1.4 new")));
    let (status, json) = send(&app, request("PATCH", &uri, EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["amount"], "99.50");
    assert_eq!(json["description"], "Office supplies");
    assert_eq!(json["receipt"]["checksum"], engine::checksum(b"%PDF-1.4 new"));
}

#[tokio::test]
async fn purge_requires_admin_role() {
    let (app, _dir) = test_app().await;
    let id = create_expense(&app).await;
    let uri = format!("/expenses/{id}/purge");

    let (status, _) = send(&app, request("DELETE", &uri, EMPLOYEE_7, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request("DELETE", &uri, ADMIN_1, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request("POST", &format!("/expenses/{id}/restore"), ADMIN_1, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_id_is_bad_request() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(&app, request("GET", "/incomes/abc", EMPLOYEE_7, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_treats_blank_and_zero_fields_as_unchanged() {
    let (app, _dir) = test_app().await;
    let id = create_expense(&app).await;
    let uri = format!("/expenses/{id}");

    let body = multipart_body(
        &[
            ("amount", ""),
            ("description", "Chairs"),
            ("type", ""),
            ("date", ""),
        ],
        None,
    );
    let (status, json) = send(&app, request("PATCH", &uri, EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["description"], "Chairs");
    assert_eq!(json["amount"], "150.00");
    assert_eq!(json["type"], "operational");

    let body = multipart_body(&[("amount", "0"), ("description", "Desks")], None);
    let (status, json) = send(&app, request("PATCH", &uri, EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["description"], "Desks");
    assert_eq!(json["amount"], "150.00");

    let body = multipart_body(
        &[("amount", ""), ("description", "x"), ("type", "operational")],
        Some(("a.pdf", b"%PDF")),
    );
    let (status, _) = send(&app, request("POST", "/expenses", EMPLOYEE_7, Some(body))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

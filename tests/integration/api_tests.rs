//! API integration tests, driving the router in process

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_circulation::{
    api, circulation::CirculationPolicy, services::credentials::Argon2Verifier, AppConfig, AppState,
};

use crate::common::{day, Harness};

fn app(h: &Harness) -> Router {
    api::router(AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(h.services.clone()),
    })
}

fn harness() -> Harness {
    Harness::with_verifier(CirculationPolicy::default(), Arc::new(Argon2Verifier))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register_borrower(app: &Router, registration: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/borrowers",
        Some(json!({
            "name": "Ana Souza",
            "registration": registration,
            "email": format!("{}@example.org", registration),
            "secret": "123456"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn register_book(app: &Router, catalog_code: &str, stock: i32) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/books",
        Some(json!({
            "catalog_code": catalog_code,
            "title": "Dom Casmurro",
            "author": "Machado de Assis",
            "publisher": "Garnier",
            "stock": stock
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn test_health_check() {
    let h = harness();
    let (status, body) = send(&app(&h), Method::GET, "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_borrow_renew_return_over_http() {
    let h = harness();
    let app = app(&h);

    let borrower = register_borrower(&app, "202401").await;
    assert!(borrower.get("credential_hash").is_none());
    assert_eq!(borrower["loan_limit"], 3);

    let book = register_book(&app, "LIT-001", 1).await;
    assert_eq!(book["status"], "available");

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(json!({ "registration": "202401", "catalog_code": "LIT-001", "secret": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["loan"]["status"], "loaned");
    assert_eq!(created["loan"]["due_on"], day(10).to_string());
    let loan_id = created["loan"]["id"].as_i64().unwrap();

    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", book["id"]), None).await;
    assert_eq!(book["status"], "unavailable");
    assert_eq!(book["on_loan"], 1);

    let (status, error) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/renew", loan_id),
        Some(json!({ "secret": "000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "IncorrectCredential");
    assert_eq!(error["message"], "incorrect credential");

    h.clock.set(day(3));
    let (status, renewed) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/renew", loan_id),
        Some(json!({ "secret": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", renewed);
    assert_eq!(renewed["loan"]["status"], "renewed");
    assert_eq!(renewed["loan"]["due_on"], day(13).to_string());

    let (status, returned) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", loan_id),
        Some(json!({ "secret": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", returned);
    assert_eq!(returned["loan"]["status"], "returned");
    assert_eq!(returned["message"], "Book returned");

    let (_, stats) = send(&app, Method::GET, "/api/v1/loans/stats", None).await;
    assert_eq!(stats, json!({ "active": 0, "overdue": 0 }));

    let (_, history) = send(
        &app,
        Method::GET,
        &format!("/api/v1/borrowers/{}/loans", borrower["id"]),
        None,
    )
    .await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_error_bodies_carry_codes() {
    let h = harness();
    let app = app(&h);
    register_borrower(&app, "202401").await;
    register_borrower(&app, "202402").await;
    register_book(&app, "LIT-001", 1).await;

    let (status, error) = send(&app, Method::GET, "/api/v1/loans/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "NoSuchLoan");
    assert_eq!(error["code"], 6);

    let borrow = |registration: &str| {
        json!({ "registration": registration, "catalog_code": "LIT-001", "secret": "123456" })
    };
    let (status, _) = send(&app, Method::POST, "/api/v1/loans", Some(borrow("202401"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = send(&app, Method::POST, "/api/v1/loans", Some(borrow("202402"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BookNotAvailable");
    assert_eq!(error["message"], "book unavailable");

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(json!({ "borrower_id": 1, "registration": "202401", "book_id": 1, "secret": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BadValue");

    let (status, error) = send(&app, Method::PUT, "/api/v1/books/1/stock", Some(json!({ "stock": 3 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "LoansOutstanding");
}

#[tokio::test]
async fn test_borrower_registration_rules() {
    let h = harness();
    let app = app(&h);
    register_borrower(&app, "202401").await;

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/borrowers",
        Some(json!({
            "name": "Other",
            "registration": "202401",
            "email": "other@example.org",
            "secret": "654321"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "Duplicate");

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/borrowers",
        Some(json!({
            "name": "Al",
            "registration": "12a456",
            "email": "not-an-email",
            "secret": "654321"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BadValue");

    let (status, deactivated) = send(&app, Method::POST, "/api/v1/borrowers/1/deactivate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deactivated["active"], false);

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(json!({ "borrower_id": 1, "catalog_code": "NONE", "secret": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BorrowerInactive");
}

#[tokio::test]
async fn test_account_and_catalog_upkeep_over_http() {
    let h = harness();
    let app = app(&h);
    register_borrower(&app, "202401").await;
    register_borrower(&app, "202402").await;
    register_book(&app, "LIT-001", 1).await;
    register_book(&app, "LIT-002", 1).await;

    let (status, updated) = send(
        &app,
        Method::PUT,
        "/api/v1/borrowers/1",
        Some(json!({ "name": "Ana Lima", "loan_limit": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["name"], "Ana Lima");
    assert_eq!(updated["loan_limit"], 5);

    let (status, error) = send(&app, Method::PUT, "/api/v1/borrowers/1", Some(json!({ "email": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BadValue");

    send(&app, Method::POST, "/api/v1/borrowers/2/deactivate", None).await;
    let (status, reactivated) = send(&app, Method::POST, "/api/v1/borrowers/2/reactivate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reactivated["active"], true);

    let (status, page) = send(&app, Method::GET, "/api/v1/borrowers?registration=202402", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], 2);

    let (status, book) = send(&app, Method::PUT, "/api/v1/books/1", Some(json!({ "category": "Romance" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", book);
    assert_eq!(book["category"], "Romance");
    assert_eq!(book["stock"], 1);

    let (status, page) = send(&app, Method::GET, "/api/v1/books?category=roman&per_page=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["per_page"], 5);
    assert_eq!(page["items"][0]["catalog_code"], "LIT-001");

    let (status, _) = send(&app, Method::DELETE, "/api/v1/books/2", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, error) = send(&app, Method::GET, "/api/v1/books/2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "NoSuchBook");
    assert_eq!(error["message"], "book 2 not found");
}

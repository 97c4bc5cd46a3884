//! Common helpers for router-level integration tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use product_api::{
    auth::JwtHandler,
    catalog::{NewProduct, ProductStore},
    middleware::{RateLimitConfig, RateLimitLayer},
    AppState, Database,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub jwt: Arc<JwtHandler>,
}

/// App over an in-memory database, rate limited to `max_requests` per minute,
/// with every request arriving from `client`.
pub fn test_app_with(max_requests: u32, client: SocketAddr) -> TestApp {
    let db = Database::in_memory().expect("Failed to create test database");
    let jwt = Arc::new(JwtHandler::new(TEST_SECRET).expect("Failed to create JWT handler"));
    let limiter = RateLimitLayer::new(RateLimitConfig {
        max_requests,
        window: Duration::from_secs(60),
    });

    let state = AppState::new(db.clone(), jwt.clone(), 4, limiter);
    let router = product_api::build_router(state).layer(MockConnectInfo(client));

    TestApp { router, db, jwt }
}

pub fn test_app() -> TestApp {
    test_app_with(1000, local_client())
}

pub fn local_client() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40000))
}

pub async fn seed_products(db: &Database, n: usize) {
    let products: Vec<_> = (1..=n)
        .map(|i| NewProduct {
            name: format!("Product {i}"),
            description: format!("Description {i}"),
            price: i as f64,
        })
        .collect();
    ProductStore::new(db.clone())
        .insert_many(&products)
        .await
        .expect("Failed to seed products");
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn register(
    router: &Router,
    username: &str,
    email: &str,
    password: &str,
) -> (StatusCode, Value) {
    send(
        router,
        post_json(
            "/api/auth/register",
            json!({ "username": username, "email": email, "password": password }),
        ),
    )
    .await
}

pub async fn login(router: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        router,
        post_json(
            "/api/auth/login",
            json!({ "email": email, "password": password }),
        ),
    )
    .await
}

/// Register the canonical test user and return a bearer token for it.
pub async fn registered_token(router: &Router) -> String {
    let (status, _) = register(router, "testuser", "test@example.com", "password123").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = login(router, "test@example.com", "password123").await;
    assert_eq!(status, StatusCode::OK);
    body["token"]
        .as_str()
        .expect("token in login response")
        .to_string()
}

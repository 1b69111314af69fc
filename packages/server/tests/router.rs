//! Router-level tests against a mock database: routing, extractors, and
//! error bodies, without a running PostgreSQL.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use sea_orm::{DatabaseBackend, MockDatabase, Value};
use serde_json::Value as Json;
use tower::ServiceExt;

use common::mail::LogMailer;
use common::media::{CloudinaryClient, CloudinaryConfig};
use server::config::{AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig};
use server::state::AppState;
use server::utils::jwt::{self, TokenKind};

const JWT_SECRET: &str = "router-test-secret";

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            base_url: "http://127.0.0.1:0".into(),
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: "postgres://unused".into(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 1,
            idle_timeout_secs: 1,
        },
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.into(),
        },
        media: CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
        },
        mail: None,
    }
}

fn app_with(db: MockDatabase) -> axum::Router {
    let config = Arc::new(test_config());
    let state = AppState {
        db: db.into_connection(),
        config: config.clone(),
        media: Arc::new(CloudinaryClient::new(config.media.clone())),
        mailer: Arc::new(LogMailer),
    };
    server::build_router(state)
}

async fn body_json(response: axum::response::Response) -> Json {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn signup_with_malformed_email_is_a_validation_error() {
    let app = app_with(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(
            Request::post("/api/v1/auth/signup")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"username":"alice","email":"not-an-email","password":"hunter22"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let app = app_with(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(Request::get("/api/v1/photos").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected() {
    let app = app_with(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(
            Request::get("/api/v1/photos")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn out_of_range_rating_value_is_rejected_at_the_boundary() {
    // The extractor's blacklist lookup is the only query that runs.
    let not_blacklisted: BTreeMap<&str, Value> =
        BTreeMap::from([("num_items", Value::from(0i64))]);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![not_blacklisted]]);
    let app = app_with(db);

    let token = jwt::sign(TokenKind::Access, 1, "a@b.c", "alice", "user", JWT_SECRET).unwrap();

    let response = app
        .oneshot(
            Request::put("/api/v1/photos/1/rating?value=9")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn refresh_endpoint_rejects_an_access_token() {
    let app = app_with(MockDatabase::new(DatabaseBackend::Postgres));

    let token = jwt::sign(TokenKind::Access, 1, "a@b.c", "alice", "user", JWT_SECRET).unwrap();

    let response = app
        .oneshot(
            Request::get("/api/v1/auth/refresh")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = app_with(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/api/v1/auth/signup"].is_object());
    assert!(body["paths"]["/api/v1/photos/search"].is_object());
}

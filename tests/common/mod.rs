/// Shared helpers for integration tests
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use himpun::{
    config::{
        AuthConfig, EmailConfig, LoggingConfig, RateLimitConfig, RetentionConfig, ServerConfig,
        ServiceConfig, SigningConfig, StorageConfig,
    },
    context::AppContext,
    db,
    server::build_router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

pub fn test_config(bootstrap_organizers: Vec<String>) -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            name: "himpun-test".to_string(),
            hostname: "localhost".to_string(),
            port: 0,
            version: "0.0.0-test".to_string(),
        },
        storage: StorageConfig {
            data_directory: "./data".into(),
            database: ":memory:".into(),
        },
        auth: AuthConfig {
            token_secret: "integration-test-secret-integration-test".to_string(),
            access_ttl_hours: 10,
            refresh_ttl_days: 30,
            bootstrap_organizers,
            default_department: "General".to_string(),
        },
        signing: SigningConfig {
            master_key: hex::encode([7u8; 32]),
            key_bits: 2048,
        },
        retention: RetentionConfig {
            audit_log_days: 90,
            email_token_hours: 24,
        },
        email: None::<EmailConfig>,
        rate_limit: RateLimitConfig {
            enabled: false,
            authenticated_rps: 100,
            unauthenticated_rps: 10,
            burst_size: 50,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}

/// Build a context and router over a fresh in-memory database.
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub async fn test_app(bootstrap_organizers: Vec<String>) -> (AppContext, Router) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();

    db::run_migrations(&pool).await.unwrap();

    let ctx = AppContext::with_pool(test_config(bootstrap_organizers), pool).unwrap();
    let router = build_router(ctx.clone());

    (ctx, router)
}

/// Send a JSON request through the router
pub async fn send_json(
    router: &Router,
    method: &str,
    uri: &str,
    cookies: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }

    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Extract cookie pairs ("name=value") from Set-Cookie headers
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .filter_map(|raw| raw.split(';').next().map(|s| s.to_string()))
        .collect()
}

/// Sign up and sign in a user, returning the Cookie header value for
/// subsequent requests
pub async fn signed_in_cookies(
    router: &Router,
    username: &str,
    password: &str,
    member_nim: Option<&str>,
) -> String {
    let signup = send_json(
        router,
        "POST",
        "/api/signup",
        None,
        Some(serde_json::json!({
            "username": username,
            "password": password,
            "member_nim": member_nim,
        })),
    )
    .await;
    assert_eq!(signup.status(), StatusCode::OK);

    let signin = send_json(
        router,
        "POST",
        "/api/signin",
        None,
        Some(serde_json::json!({
            "username": username,
            "password": password,
        })),
    )
    .await;
    assert_eq!(signin.status(), StatusCode::OK);

    set_cookies(&signin).join("; ")
}

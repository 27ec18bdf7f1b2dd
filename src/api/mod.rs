/// API routes and handlers
pub mod agenda;
pub mod audit;
pub mod auth;
pub mod documents;
pub mod keys;
pub mod members;
pub mod middleware;
pub mod news;
pub mod public;
pub mod roster;
pub mod stream;

use crate::context::AppContext;
use axum::{Json, Router};
use serde::Serialize;

/// Standard response envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub status_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 200 envelope with data
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        status_code: 200,
        status_message: "OK".to_string(),
        data: Some(data),
    })
}

/// 200 envelope with a message and no data
pub fn message(text: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        status_code: 200,
        status_message: text.to_string(),
        data: None,
    })
}

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(public::routes())
        .merge(members::routes())
        .merge(roster::routes())
        .merge(agenda::routes())
        .merge(keys::routes())
        .merge(documents::routes())
        .merge(news::routes())
        .merge(stream::routes())
        .merge(audit::routes())
}

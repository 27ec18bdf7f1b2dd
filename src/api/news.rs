/// News endpoints: public listing, organizer-only publishing
use crate::{
    api::{ok, ApiResponse},
    auth::OrganizerContext,
    context::AppContext,
    db::models::NewsItem,
    error::{AppError, AppResult},
    events::EventKind,
};
use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Build news routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/news", get(list_news).post(create_news))
}

/// Latest news items (public)
async fn list_news(State(ctx): State<AppContext>) -> AppResult<Json<ApiResponse<Vec<NewsItem>>>> {
    let items = sqlx::query_as::<_, NewsItem>(
        "SELECT id, title, body, created_by, created_at FROM news ORDER BY created_at DESC LIMIT 50",
    )
    .fetch_all(&ctx.db)
    .await?;

    Ok(ok(items))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateNewsRequest {
    #[validate(length(min = 1, max = 256))]
    title: String,
    #[validate(length(min = 1))]
    body: String,
}

/// Publish a news item (organizer only)
async fn create_news(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Json(req): Json<CreateNewsRequest>,
) -> AppResult<Json<ApiResponse<NewsItem>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let created_at = Utc::now();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO news (title, body, created_by, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id",
    )
    .bind(&req.title)
    .bind(&req.body)
    .bind(&organizer.user.identity.username)
    .bind(created_at)
    .fetch_one(&ctx.db)
    .await?;

    let item = NewsItem {
        id,
        title: req.title,
        body: req.body,
        created_by: organizer.user.identity.username.clone(),
        created_at,
    };

    ctx.broadcaster
        .publish(EventKind::News, json!({ "id": item.id, "title": item.title }))
        .await?;

    Ok(ok(item))
}

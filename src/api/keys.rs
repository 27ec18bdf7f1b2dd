/// Signing key management endpoints (organizer only)
use crate::{
    api::{message, ok, ApiResponse},
    auth::OrganizerContext,
    context::AppContext,
    error::{AppError, AppResult},
    signing::SigningKeyView,
};
use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Build signing key routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/keys", post(create_key).get(list_keys))
        .route("/api/keys/:tag", delete(delete_key))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateKeyRequest {
    #[validate(length(min = 1, max = 128))]
    title: String,
    #[validate(length(min = 1, max = 64))]
    tag: String,
}

/// Generate a keypair for a new signing tag
async fn create_key(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Json(req): Json<CreateKeyRequest>,
) -> AppResult<Json<ApiResponse<SigningKeyView>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let record = ctx.keys.create(&req.title, &req.tag).await?;

    ctx.audit
        .record(
            "key.create",
            &organizer.user.identity.username,
            None,
            Some(&req.title),
            Some(&req.tag),
        )
        .await?;

    Ok(ok(SigningKeyView::from(&record)))
}

/// List signing key records
async fn list_keys(
    State(ctx): State<AppContext>,
    _organizer: OrganizerContext,
) -> AppResult<Json<ApiResponse<Vec<SigningKeyView>>>> {
    let records = ctx.keys.list().await?;

    Ok(ok(records.iter().map(SigningKeyView::from).collect()))
}

/// Tombstone a tag's signing key
async fn delete_key(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Path(tag): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    ctx.keys.delete(&tag).await?;

    ctx.audit
        .record(
            "key.delete",
            &organizer.user.identity.username,
            None,
            None,
            Some(&tag),
        )
        .await?;

    Ok(message("Signing key deleted"))
}

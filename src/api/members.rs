/// Member directory endpoints
use crate::{
    api::{ok, ApiResponse},
    auth::{AuthContext, OrganizerContext},
    context::AppContext,
    db::models::Member,
    error::{AppError, AppResult},
    events::EventKind,
    members::MemberStatus,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Build member routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/members", post(create_member).get(list_members))
        .route("/api/members/:nim", get(get_member))
        .route("/api/members/:nim/status", post(set_status))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateMemberRequest {
    #[validate(length(min = 4, max = 16))]
    nim: String,
    #[validate(length(min = 1, max = 128))]
    full_name: String,
    #[validate(email)]
    email: Option<String>,
    status: Option<String>,
}

/// Create a member profile (organizer only)
async fn create_member(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Json(req): Json<CreateMemberRequest>,
) -> AppResult<Json<ApiResponse<Member>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let status = match req.status.as_deref() {
        Some(s) => MemberStatus::from_str(s)?,
        None => MemberStatus::Free,
    };

    let member = ctx
        .members
        .create(&req.nim, &req.full_name, req.email, status)
        .await?;

    ctx.audit
        .record(
            "member.create",
            &organizer.user.identity.username,
            None,
            None,
            Some(&member.nim),
        )
        .await?;

    ctx.broadcaster
        .publish(EventKind::Member, json!({ "nim": member.nim, "action": "created" }))
        .await?;

    Ok(ok(member))
}

/// List members
async fn list_members(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
) -> AppResult<Json<ApiResponse<Vec<Member>>>> {
    Ok(ok(ctx.members.list().await?))
}

/// Get a member by NIM
async fn get_member(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(nim): Path<String>,
) -> AppResult<Json<ApiResponse<Member>>> {
    Ok(ok(ctx.members.get(&nim).await?))
}

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status: String,
}

/// Update a member's status (organizer only)
async fn set_status(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Path(nim): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> AppResult<Json<ApiResponse<Member>>> {
    let status = MemberStatus::from_str(&req.status)?;
    ctx.members.set_status(&nim, status).await?;

    ctx.audit
        .record(
            "member.status",
            &organizer.user.identity.username,
            None,
            Some(status.as_str()),
            Some(&nim),
        )
        .await?;

    Ok(ok(ctx.members.get(&nim).await?))
}

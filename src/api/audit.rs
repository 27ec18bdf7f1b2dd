/// Audit log endpoints (organizer only)
use crate::{
    api::{ok, ApiResponse},
    auth::OrganizerContext,
    context::AppContext,
    db::models::AuditRecord,
    error::AppResult,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Build audit routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/audit", get(list_audit))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<i64>,
}

/// Most recent audit records
async fn list_audit(
    State(ctx): State<AppContext>,
    _organizer: OrganizerContext,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<ApiResponse<Vec<AuditRecord>>>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    Ok(ok(ctx.audit.list_recent(limit).await?))
}

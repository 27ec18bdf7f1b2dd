/// Administration and department roster endpoints
use crate::{
    api::{ok, ApiResponse},
    auth::{AuthContext, OrganizerContext},
    context::AppContext,
    db::models::{AdministrationRecord, DepartmentRecord},
    error::{AppError, AppResult},
    roster::OfficerRole,
};
use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Build roster routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/administration",
            post(assign_officer).get(list_administration),
        )
        .route(
            "/api/departments",
            post(assign_department).get(list_departments),
        )
}

#[derive(Debug, Deserialize)]
struct AssignOfficerRequest {
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    role: String,
    member_nim: String,
}

/// Assign an officer seat for a period (organizer only)
async fn assign_officer(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Json(req): Json<AssignOfficerRequest>,
) -> AppResult<Json<ApiResponse<AdministrationRecord>>> {
    let role = OfficerRole::from_str(&req.role)?;

    // Seat holders must be registered members
    ctx.members
        .get(&req.member_nim)
        .await
        .map_err(|_| AppError::Validation(format!("Unknown member {}", req.member_nim)))?;

    let record = ctx
        .roster
        .assign_officer(req.period_start, req.period_end, role, &req.member_nim)
        .await?;

    ctx.audit
        .record(
            "roster.assign_officer",
            &organizer.user.identity.username,
            None,
            Some(role.as_str()),
            Some(&req.member_nim),
        )
        .await?;

    Ok(ok(record))
}

/// Officer seats for the current period
async fn list_administration(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
) -> AppResult<Json<ApiResponse<Vec<AdministrationRecord>>>> {
    Ok(ok(ctx.roster.list_current_administration(Utc::now()).await?))
}

#[derive(Debug, Deserialize)]
struct AssignDepartmentRequest {
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    label: String,
    member_nim: String,
}

/// Assign a member to a department for a period (organizer only)
async fn assign_department(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Json(req): Json<AssignDepartmentRequest>,
) -> AppResult<Json<ApiResponse<DepartmentRecord>>> {
    if req.label.trim().is_empty() {
        return Err(AppError::Validation("Department label required".to_string()));
    }

    ctx.members
        .get(&req.member_nim)
        .await
        .map_err(|_| AppError::Validation(format!("Unknown member {}", req.member_nim)))?;

    let record = ctx
        .roster
        .assign_department(req.period_start, req.period_end, &req.label, &req.member_nim)
        .await?;

    ctx.audit
        .record(
            "roster.assign_department",
            &organizer.user.identity.username,
            None,
            Some(&req.label),
            Some(&req.member_nim),
        )
        .await?;

    Ok(ok(record))
}

/// Department assignments for the current period
async fn list_departments(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
) -> AppResult<Json<ApiResponse<Vec<DepartmentRecord>>>> {
    Ok(ok(ctx.roster.list_current_departments(Utc::now()).await?))
}

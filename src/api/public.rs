/// Public read-only endpoints
use crate::{
    api::{ok, ApiResponse},
    context::AppContext,
    db::models::Agenda,
    error::AppResult,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Build public routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/stats", get(stats))
        .route("/api/config", get(app_config))
        .route("/api/nearest-agenda", get(nearest_agenda))
        .route("/api/organizer", get(organizer))
}

#[derive(Debug, Serialize)]
struct Stats {
    members: i64,
    agendas: i64,
    events: i64,
}

/// Aggregate counters for the landing page
async fn stats(State(ctx): State<AppContext>) -> AppResult<Json<ApiResponse<Stats>>> {
    let members = ctx.members.count().await?;
    let agendas = ctx.agendas.count().await?;
    let events = ctx.broadcaster.current_seq().await?.unwrap_or(0);

    Ok(ok(Stats {
        members,
        agendas,
        events,
    }))
}

#[derive(Debug, Serialize)]
struct PublicConfig {
    name: String,
    version: String,
    default_department: String,
}

/// Public application configuration
async fn app_config(State(ctx): State<AppContext>) -> AppResult<Json<ApiResponse<PublicConfig>>> {
    Ok(ok(PublicConfig {
        name: ctx.config.service.name.clone(),
        version: ctx.config.service.version.clone(),
        default_department: ctx.config.auth.default_department.clone(),
    }))
}

/// The next upcoming agenda, if any
async fn nearest_agenda(
    State(ctx): State<AppContext>,
) -> AppResult<Json<ApiResponse<Option<Agenda>>>> {
    let agenda = ctx.agendas.nearest(Utc::now()).await?;

    Ok(ok(agenda))
}

#[derive(Debug, Deserialize)]
struct OrganizerQuery {
    nim: String,
}

#[derive(Debug, Serialize)]
struct OrganizerInfo {
    nim: String,
    role: String,
    department: String,
    organizer: bool,
}

/// Computed role and department for a member identifier.
///
/// Missing roster records resolve to the defaults; this endpoint never fails
/// on an unknown nim.
async fn organizer(
    State(ctx): State<AppContext>,
    Query(query): Query<OrganizerQuery>,
) -> AppResult<Json<ApiResponse<OrganizerInfo>>> {
    let info = ctx.roster.resolve(&query.nim, Utc::now()).await;

    Ok(ok(OrganizerInfo {
        nim: query.nim,
        role: info.role,
        department: info.department,
        organizer: info.organizer,
    }))
}

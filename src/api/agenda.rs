/// Agenda endpoints: CRUD plus committee/participant registration
use crate::{
    api::{message, ok, ApiResponse},
    auth::{AuthContext, OrganizerContext},
    context::AppContext,
    db::models::{Agenda, CommitteeEntry, ParticipantEntry},
    error::{AppError, AppResult},
    events::EventKind,
    roster::RegistrationRule,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Build agenda routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/agenda", post(create_agenda).get(list_agendas))
        .route("/api/agenda/:id", get(get_agenda))
        .route(
            "/api/agenda/:id/committee",
            post(register_committee).get(list_committees),
        )
        .route(
            "/api/agenda/:id/committee/:nim/approve",
            post(approve_committee),
        )
        .route(
            "/api/agenda/:id/participant",
            post(register_participant).get(list_participants),
        )
        .route("/api/agenda/:id/participant/:nim/visit", post(mark_visited))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateAgendaRequest {
    #[validate(length(min = 1, max = 256))]
    title: String,
    description: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    location: Option<String>,
    registration_rule: Option<String>,
}

/// Create an agenda (organizer only)
async fn create_agenda(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Json(req): Json<CreateAgendaRequest>,
) -> AppResult<Json<ApiResponse<Agenda>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let rule = match req.registration_rule.as_deref() {
        Some(s) => RegistrationRule::from_str(s)?,
        None => RegistrationRule::All,
    };

    let agenda = ctx
        .agendas
        .create(
            &req.title,
            req.description,
            req.starts_at,
            req.ends_at,
            req.location,
            rule,
            &organizer.user.identity.username,
        )
        .await?;

    ctx.audit
        .record(
            "agenda.create",
            &organizer.user.identity.username,
            None,
            None,
            Some(&agenda.id),
        )
        .await?;

    ctx.broadcaster
        .publish(
            EventKind::Agenda,
            json!({ "id": agenda.id, "title": agenda.title, "startsAt": agenda.starts_at }),
        )
        .await?;

    Ok(ok(agenda))
}

/// List agendas
async fn list_agendas(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
) -> AppResult<Json<ApiResponse<Vec<Agenda>>>> {
    Ok(ok(ctx.agendas.list().await?))
}

/// Get an agenda by id
async fn get_agenda(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Agenda>>> {
    Ok(ok(ctx.agendas.get(&id).await?))
}

#[derive(Debug, Deserialize)]
struct RegisterCommitteeRequest {
    job: String,
}

/// Register the caller to an agenda's committee
async fn register_committee(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<RegisterCommitteeRequest>,
) -> AppResult<Json<ApiResponse<CommitteeEntry>>> {
    if req.job.trim().is_empty() {
        return Err(AppError::Validation("Committee job required".to_string()));
    }

    let nim = auth
        .user
        .nim()
        .ok_or_else(|| AppError::Validation("No member profile linked".to_string()))?
        .to_string();

    let entry = ctx
        .agendas
        .register_committee(
            &id,
            &nim,
            &req.job,
            auth.user.role.organizer,
            auth.user.role.in_department,
        )
        .await?;

    Ok(ok(entry))
}

/// Approve a committee registration (organizer only)
async fn approve_committee(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Path((id, nim)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<()>>> {
    ctx.agendas.approve_committee(&id, &nim).await?;

    ctx.audit
        .record(
            "agenda.committee.approve",
            &organizer.user.identity.username,
            None,
            Some(&id),
            Some(&nim),
        )
        .await?;

    Ok(message("Committee registration approved"))
}

/// Committee entries for an agenda
async fn list_committees(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<CommitteeEntry>>>> {
    Ok(ok(ctx.agendas.list_committees(&id).await?))
}

/// Register the caller as a participant
async fn register_participant(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<ParticipantEntry>>> {
    let nim = auth
        .user
        .nim()
        .ok_or_else(|| AppError::Validation("No member profile linked".to_string()))?
        .to_string();

    let entry = ctx
        .agendas
        .register_participant(
            &id,
            &nim,
            auth.user.role.organizer,
            auth.user.role.in_department,
        )
        .await?;

    Ok(ok(entry))
}

/// Mark a participant as visiting (organizer only)
async fn mark_visited(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Path((id, nim)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<()>>> {
    ctx.agendas.mark_visited(&id, &nim).await?;

    ctx.audit
        .record(
            "agenda.participant.visit",
            &organizer.user.identity.username,
            None,
            Some(&id),
            Some(&nim),
        )
        .await?;

    Ok(message("Visit recorded"))
}

/// Participant entries for an agenda
async fn list_participants(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<ParticipantEntry>>>> {
    Ok(ok(ctx.agendas.list_participants(&id).await?))
}

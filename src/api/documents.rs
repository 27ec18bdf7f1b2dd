/// Document endpoints: creation, signing, verification, listings
use crate::{
    api::{ok, ApiResponse},
    auth::{AuthContext, OrganizerContext},
    context::AppContext,
    documents::{DocumentWithSigns, SignatureListing},
    error::{AppError, AppResult},
    events::EventKind,
    metrics,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

/// Build document routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/documents", post(create_document))
        .route("/api/documents/:id", get(get_document))
        .route("/api/documents/:id/sign", post(sign_document))
        .route("/api/documents/:id/verify", get(verify_signature))
        .route("/api/my-signatures", get(my_signatures))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateDocumentRequest {
    #[validate(length(min = 1, max = 256))]
    title: String,
    #[validate(length(min = 1))]
    content: String,
    #[validate(length(min = 1, max = 64))]
    tag: String,
    #[validate(length(min = 1))]
    signers: Vec<String>,
}

/// Create a document with its expected signers (organizer only)
async fn create_document(
    State(ctx): State<AppContext>,
    organizer: OrganizerContext,
    Json(req): Json<CreateDocumentRequest>,
) -> AppResult<Json<ApiResponse<DocumentWithSigns>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let doc = ctx
        .documents
        .create(
            &req.title,
            &req.content,
            &req.tag,
            &req.signers,
            &organizer.user.identity.username,
        )
        .await?;

    ctx.audit
        .record(
            "document.create",
            &organizer.user.identity.username,
            None,
            Some(&req.title),
            Some(&doc.document.id),
        )
        .await?;

    ctx.broadcaster
        .publish(
            EventKind::Document,
            json!({ "id": doc.document.id, "title": doc.document.title, "action": "created" }),
        )
        .await?;

    Ok(ok(doc))
}

/// Fetch a document with its signature entries
async fn get_document(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<DocumentWithSigns>>> {
    Ok(ok(ctx.documents.get(&id).await?))
}

#[derive(Debug, Serialize)]
struct SignResult {
    document_id: String,
    signature: String,
}

/// Sign a document as the calling member
async fn sign_document(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<SignResult>>> {
    let nim = auth
        .user
        .nim()
        .ok_or_else(|| AppError::Validation("No member profile linked".to_string()))?
        .to_string();

    let signature = ctx.documents.sign(&id, &nim).await?;

    metrics::DOCUMENTS_SIGNED_TOTAL.inc();
    ctx.audit
        .record(
            "document.sign",
            &auth.user.identity.username,
            None,
            None,
            Some(&id),
        )
        .await?;

    Ok(ok(SignResult {
        document_id: id,
        signature,
    }))
}

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    nim: String,
}

#[derive(Debug, Serialize)]
struct VerifyResult {
    document_id: String,
    nim: String,
    valid: bool,
}

/// Verify a member's signature on a document
async fn verify_signature(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<ApiResponse<VerifyResult>>> {
    let valid = ctx.documents.verify(&id, &query.nim).await?;

    Ok(ok(VerifyResult {
        document_id: id,
        nim: query.nim,
        valid,
    }))
}

#[derive(Debug, Deserialize)]
struct MySignaturesQuery {
    signed: Option<bool>,
}

/// The caller's signature entries, filtered by signed state
async fn my_signatures(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<MySignaturesQuery>,
) -> AppResult<Json<ApiResponse<Vec<SignatureListing>>>> {
    let nim = auth
        .user
        .nim()
        .ok_or_else(|| AppError::Validation("No member profile linked".to_string()))?
        .to_string();

    let listings = ctx
        .documents
        .list_signatures(&nim, query.signed.unwrap_or(true))
        .await?;

    Ok(ok(listings))
}

/// Database row models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Credential-bearing principal, distinct from a member profile
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub member_nim: Option<String>,
    /// Current long-lived refresh token; overwritten on every login
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Member profile
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Member {
    pub nim: String,
    pub full_name: String,
    pub email: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Officer seat assignment, valid within its period
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AdministrationRecord {
    pub id: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub role: String,
    pub member_nim: String,
    pub created_at: DateTime<Utc>,
}

/// Department membership, valid within its period
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub label: String,
    pub member_nim: String,
    pub created_at: DateTime<Utc>,
}

/// Agenda record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Agenda {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub registration_rule: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Committee registration against an agenda
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommitteeEntry {
    pub id: i64,
    pub agenda_id: String,
    pub member_nim: String,
    pub job: String,
    pub approved: bool,
    pub registered_at: DateTime<Utc>,
}

/// Participant registration against an agenda
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ParticipantEntry {
    pub id: i64,
    pub agenda_id: String,
    pub member_nim: String,
    pub visiting: bool,
    pub visited_at: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

/// Stored signing keypair. The private key is wrapped under the configured
/// master key; only ciphertext and nonce are persisted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SigningKeyRecord {
    pub id: String,
    pub title: String,
    pub tag: String,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub encrypted_private_key: String,
    pub iv: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

/// Document to be signed
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub content_hash: String,
    pub tag: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Per-signer entry on a document
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentSign {
    pub id: i64,
    pub document_id: String,
    pub member_nim: String,
    pub signed: bool,
    pub signature: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
}

/// Append-only audit record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub action: String,
    pub user: String,
    pub ip: Option<String>,
    pub details: Option<String>,
    pub target: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Email verification token
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EmailToken {
    pub token: String,
    pub identity_id: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

/// News item
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Documents and their signature entries
///
/// A document carries one sign entry per expected signer. Signing is a
/// conditional single-statement update, so concurrent attempts cannot clobber
/// each other's entries.
use crate::{
    db::models::{Document, DocumentSign},
    error::{AppError, AppResult},
    signing::{content_hash, KeyStore},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Document with its signature entries
#[derive(Debug, Clone, Serialize)]
pub struct DocumentWithSigns {
    #[serde(flatten)]
    pub document: Document,
    pub signs: Vec<DocumentSign>,
}

/// One row of a member's signature listing
#[derive(Debug, Clone, Serialize)]
pub struct SignatureListing {
    pub document_id: String,
    pub title: String,
    pub tag: String,
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
}

/// Document manager
#[derive(Clone)]
pub struct DocumentManager {
    db: SqlitePool,
    keys: KeyStore,
}

impl DocumentManager {
    pub fn new(db: SqlitePool, keys: KeyStore) -> Self {
        Self { db, keys }
    }

    /// Create a document with pending sign entries for each signer
    pub async fn create(
        &self,
        title: &str,
        content: &str,
        tag: &str,
        signers: &[String],
        created_by: &str,
    ) -> AppResult<DocumentWithSigns> {
        if signers.is_empty() {
            return Err(AppError::Validation(
                "Document needs at least one signer".to_string(),
            ));
        }

        // The tag must have an active key before anyone is asked to sign
        self.keys.active_by_tag(tag).await?;

        let document = Document {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            content_hash: content_hash(content),
            tag: tag.to_string(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO document (id, title, content, content_hash, tag, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&document.id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.content_hash)
        .bind(&document.tag)
        .bind(&document.created_by)
        .bind(document.created_at)
        .execute(&self.db)
        .await?;

        for nim in signers {
            sqlx::query(
                "INSERT INTO document_sign (document_id, member_nim, signed) VALUES (?1, ?2, 0)",
            )
            .bind(&document.id)
            .bind(nim)
            .execute(&self.db)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Validation(format!("Duplicate signer {}", nim))
                }
                _ => AppError::Database(e),
            })?;
        }

        self.get(&document.id).await
    }

    /// Fetch a document and its sign entries
    pub async fn get(&self, document_id: &str) -> AppResult<DocumentWithSigns> {
        let document = sqlx::query_as::<_, Document>(
            "SELECT id, title, content, content_hash, tag, created_by, created_at
             FROM document WHERE id = ?1",
        )
        .bind(document_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

        let signs = sqlx::query_as::<_, DocumentSign>(
            "SELECT id, document_id, member_nim, signed, signature, signed_at
             FROM document_sign WHERE document_id = ?1 ORDER BY id ASC",
        )
        .bind(document_id)
        .fetch_all(&self.db)
        .await?;

        Ok(DocumentWithSigns { document, signs })
    }

    /// Sign a document as the given member.
    ///
    /// The signer must have a pending entry; the entry flips to signed in a
    /// single conditional update.
    pub async fn sign(&self, document_id: &str, member_nim: &str) -> AppResult<String> {
        let doc = self.get(document_id).await?;

        let entry = doc
            .signs
            .iter()
            .find(|s| s.member_nim == member_nim)
            .ok_or_else(|| {
                AppError::NotFound(format!("No signature entry for member {}", member_nim))
            })?;

        if entry.signed {
            return Err(AppError::Conflict("Document already signed".to_string()));
        }

        let signature = self.keys.sign(&doc.document.tag, &doc.document.content).await?;

        let result = sqlx::query(
            "UPDATE document_sign SET signed = 1, signature = ?1, signed_at = ?2
             WHERE document_id = ?3 AND member_nim = ?4 AND signed = 0",
        )
        .bind(&signature)
        .bind(Utc::now())
        .bind(document_id)
        .bind(member_nim)
        .execute(&self.db)
        .await?;

        // A concurrent signer got here first
        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("Document already signed".to_string()));
        }

        tracing::info!("document {} signed by {}", document_id, member_nim);

        Ok(signature)
    }

    /// Verify a member's signature on a document against the stored public key
    pub async fn verify(&self, document_id: &str, member_nim: &str) -> AppResult<bool> {
        let doc = self.get(document_id).await?;

        let entry = doc
            .signs
            .iter()
            .find(|s| s.member_nim == member_nim && s.signed)
            .ok_or_else(|| {
                AppError::NotFound(format!("No signature from member {}", member_nim))
            })?;

        let signature = entry
            .signature
            .as_deref()
            .ok_or_else(|| AppError::Internal("Signed entry without signature".to_string()))?;

        self.keys
            .verify(&doc.document.tag, &doc.document.content, signature)
            .await
    }

    /// List a member's signature entries, filtered by signed state
    pub async fn list_signatures(
        &self,
        member_nim: &str,
        signed: bool,
    ) -> AppResult<Vec<SignatureListing>> {
        let rows = sqlx::query_as::<_, (String, String, String, bool, Option<DateTime<Utc>>)>(
            r#"
            SELECT d.id, d.title, d.tag, s.signed, s.signed_at
            FROM document_sign s
            JOIN document d ON d.id = s.document_id
            WHERE s.member_nim = ?1 AND s.signed = ?2
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(member_nim)
        .bind(signed)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(document_id, title, tag, signed, signed_at)| SignatureListing {
                document_id,
                title,
                tag,
                signed,
                signed_at,
            })
            .collect())
    }
}

/// Signing key records: one keypair per tag, private half wrapped at rest
use crate::{
    db::models::SigningKeyRecord,
    error::{AppError, AppResult},
    signing::crypto::{self, KeyWrap},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub const STATE_CREATED: &str = "created";
pub const STATE_ACTIVE: &str = "active";
pub const STATE_DELETED: &str = "deleted";

/// Key store manager
#[derive(Clone)]
pub struct KeyStore {
    db: SqlitePool,
    wrap: KeyWrap,
    key_bits: usize,
}

impl KeyStore {
    pub fn new(db: SqlitePool, wrap: KeyWrap, key_bits: usize) -> Self {
        Self { db, wrap, key_bits }
    }

    /// Create a keypair for a tag and activate it for signing.
    ///
    /// A tag can hold at most one non-deleted key record.
    pub async fn create(&self, title: &str, tag: &str) -> AppResult<SigningKeyRecord> {
        if tag.trim().is_empty() {
            return Err(AppError::Validation("Tag cannot be empty".to_string()));
        }

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM signing_key WHERE tag = ?1 AND state != ?2",
        )
        .bind(tag)
        .bind(STATE_DELETED)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::Conflict(format!("Tag {} already has a key", tag)));
        }

        let pair = crypto::generate_keypair(self.key_bits)?;
        let wrapped = self.wrap.wrap(&pair.private_key)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO signing_key (id, title, tag, public_key, encrypted_private_key, iv, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(title)
        .bind(tag)
        .bind(&pair.public_key)
        .bind(&wrapped.ciphertext)
        .bind(&wrapped.iv)
        .bind(STATE_CREATED)
        .bind(now)
        .execute(&self.db)
        .await?;

        sqlx::query("UPDATE signing_key SET state = ?1 WHERE id = ?2 AND state = ?3")
            .bind(STATE_ACTIVE)
            .bind(&id)
            .bind(STATE_CREATED)
            .execute(&self.db)
            .await?;

        tracing::info!("signing key created for tag {}", tag);

        Ok(SigningKeyRecord {
            id,
            title: title.to_string(),
            tag: tag.to_string(),
            public_key: pair.public_key,
            encrypted_private_key: wrapped.ciphertext,
            iv: wrapped.iv,
            state: STATE_ACTIVE.to_string(),
            created_at: now,
        })
    }

    /// Fetch the active key record for a tag
    pub async fn active_by_tag(&self, tag: &str) -> AppResult<SigningKeyRecord> {
        sqlx::query_as::<_, SigningKeyRecord>(
            "SELECT id, title, tag, public_key, encrypted_private_key, iv, state, created_at
             FROM signing_key WHERE tag = ?1 AND state = ?2",
        )
        .bind(tag)
        .bind(STATE_ACTIVE)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No active key for tag {}", tag)))
    }

    /// List all non-deleted key records
    pub async fn list(&self) -> AppResult<Vec<SigningKeyRecord>> {
        let rows = sqlx::query_as::<_, SigningKeyRecord>(
            "SELECT id, title, tag, public_key, encrypted_private_key, iv, state, created_at
             FROM signing_key WHERE state != ?1 ORDER BY created_at DESC",
        )
        .bind(STATE_DELETED)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Tombstone a tag's key record
    pub async fn delete(&self, tag: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE signing_key SET state = ?1 WHERE tag = ?2 AND state != ?1")
            .bind(STATE_DELETED)
            .bind(tag)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("No key for tag {}", tag)));
        }

        tracing::info!("signing key deleted for tag {}", tag);

        Ok(())
    }

    /// Sign data with the active key for a tag
    pub async fn sign(&self, tag: &str, data: &str) -> AppResult<String> {
        let record = self.active_by_tag(tag).await?;
        let private_pem = self.wrap.unwrap(&record.encrypted_private_key, &record.iv)?;

        crypto::sign_data(&private_pem, data)
    }

    /// Verify a signature against the stored public key for a tag
    pub async fn verify(&self, tag: &str, data: &str, signature: &str) -> AppResult<bool> {
        let record = self.active_by_tag(tag).await?;

        crypto::verify_doc_signature(&record.public_key, data, signature)
    }
}

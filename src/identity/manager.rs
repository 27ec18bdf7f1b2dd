/// Identity manager implementation using runtime queries
use crate::{
    db::models::{EmailToken, Identity},
    error::{AppError, AppResult},
    identity::{
        tokens::{TokenIssuer, SCOPE_ACCESS, SCOPE_REFRESH},
        SessionTokens,
    },
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Identity manager service
#[derive(Clone)]
pub struct IdentityManager {
    db: SqlitePool,
    tokens: TokenIssuer,
}

impl IdentityManager {
    pub fn new(db: SqlitePool, tokens: TokenIssuer) -> Self {
        Self { db, tokens }
    }

    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new identity
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        member_nim: Option<String>,
    ) -> AppResult<Identity> {
        self.validate_username(username)?;

        if self.username_exists(username).await? {
            return Err(AppError::Conflict(format!(
                "Username {} already taken",
                username
            )));
        }

        if let Some(ref nim) = member_nim {
            let linked: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM identity WHERE member_nim = ?1",
            )
            .bind(nim)
            .fetch_one(&self.db)
            .await?;

            if linked > 0 {
                return Err(AppError::Conflict(format!(
                    "Member {} already has an identity",
                    nim
                )));
            }
        }

        let password_hash = hash_password(password)?;

        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash,
            member_nim,
            refresh_token: None,
            verified: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO identity (id, username, password_hash, member_nim, refresh_token, verified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&identity.id)
        .bind(&identity.username)
        .bind(&identity.password_hash)
        .bind(&identity.member_nim)
        .bind(&identity.refresh_token)
        .bind(identity.verified)
        .bind(identity.created_at)
        .execute(&self.db)
        .await?;

        Ok(identity)
    }

    /// Verify credentials and open a session
    ///
    /// Overwrites the stored refresh token: only the latest login's refresh
    /// token stays valid for this identity.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(Identity, SessionTokens)> {
        let mut identity = self.get_by_username(username).await?;

        if !verify_password(password, &identity.password_hash)? {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let access_token = self
            .tokens
            .issue_access(&identity.username, identity.member_nim.as_deref())?;
        let refresh_token = self
            .tokens
            .issue_refresh(&identity.username, identity.member_nim.as_deref())?;

        sqlx::query("UPDATE identity SET refresh_token = ?1 WHERE id = ?2")
            .bind(&refresh_token)
            .bind(&identity.id)
            .execute(&self.db)
            .await?;

        identity.refresh_token = Some(refresh_token.clone());

        Ok((
            identity,
            SessionTokens {
                access_token,
                refresh_token,
            },
        ))
    }

    /// Exchange a refresh token for a new access token
    ///
    /// Verifies signature and expiry, then checks the token is still the one
    /// persisted for the identity (a later login supersedes it). Never writes
    /// the identity row, so concurrent refresh calls are safe.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.tokens.verify(refresh_token, SCOPE_REFRESH)?;

        let identity = self
            .get_by_username(&claims.sub)
            .await
            .map_err(|_| AppError::Unauthorized("Unknown identity".to_string()))?;

        let stored = identity
            .refresh_token
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("No active session".to_string()))?;

        let matches: bool = stored.as_bytes().ct_eq(refresh_token.as_bytes()).into();
        if !matches {
            return Err(AppError::Unauthorized("Refresh token superseded".to_string()));
        }

        self.tokens
            .issue_access(&identity.username, identity.member_nim.as_deref())
    }

    /// Resolve an access token to its identity
    pub async fn validate_access(&self, access_token: &str) -> AppResult<Identity> {
        let claims = self.tokens.verify(access_token, SCOPE_ACCESS)?;

        self.get_by_username(&claims.sub)
            .await
            .map_err(|_| AppError::Unauthorized("Unknown identity".to_string()))
    }

    /// Close the current session
    pub async fn logout(&self, identity_id: &str) -> AppResult<()> {
        sqlx::query("UPDATE identity SET refresh_token = NULL WHERE id = ?1")
            .bind(identity_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Get identity by username
    pub async fn get_by_username(&self, username: &str) -> AppResult<Identity> {
        sqlx::query_as::<_, Identity>(
            "SELECT id, username, password_hash, member_nim, refresh_token, verified, created_at
             FROM identity WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Identity not found".to_string()))
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM identity WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    fn validate_username(&self, username: &str) -> AppResult<()> {
        if username.len() < 3 || username.len() > 32 {
            return Err(AppError::Validation(
                "Username must be 3-32 characters".to_string(),
            ));
        }

        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
        {
            return Err(AppError::Validation(
                "Username may only contain letters, digits, '.', '_' and '-'".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate an email verification token for an identity
    pub async fn create_email_token(
        &self,
        identity_id: &str,
        purpose: &str,
        ttl_hours: i64,
    ) -> AppResult<String> {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO email_token (token, identity_id, purpose, created_at, expires_at, used)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        )
        .bind(&token)
        .bind(identity_id)
        .bind(purpose)
        .bind(now)
        .bind(now + Duration::hours(ttl_hours))
        .execute(&self.db)
        .await?;

        Ok(token)
    }

    /// Confirm an email verification token and mark the identity verified
    pub async fn verify_email(&self, token: &str) -> AppResult<()> {
        let record = sqlx::query_as::<_, EmailToken>(
            "SELECT token, identity_id, purpose, created_at, expires_at, used
             FROM email_token WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Verification token not found".to_string()))?;

        if record.used {
            return Err(AppError::Unauthorized("Token already used".to_string()));
        }

        if Utc::now() > record.expires_at {
            return Err(AppError::Unauthorized("Token expired".to_string()));
        }

        let result = sqlx::query("UPDATE email_token SET used = 1 WHERE token = ?1 AND used = 0")
            .bind(token)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Unauthorized("Token already used".to_string()));
        }

        sqlx::query("UPDATE identity SET verified = 1 WHERE id = ?1")
            .bind(&record.identity_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Delete expired or used email tokens; returns the number removed
    pub async fn cleanup_email_tokens(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM email_token WHERE used = 1 OR expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Hash a password using Argon2id with a generated salt
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored Argon2 hash
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

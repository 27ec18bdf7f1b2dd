/// Background task implementations
use crate::{context::AppContext, error::AppResult};

/// Purge audit records older than the configured retention window
pub async fn purge_expired_audit_records(ctx: &AppContext) -> AppResult<u64> {
    ctx.audit
        .purge_older_than(ctx.config.retention.audit_log_days)
        .await
}

/// Delete used and expired email tokens
pub async fn cleanup_email_tokens(ctx: &AppContext) -> AppResult<u64> {
    ctx.identities.cleanup_email_tokens().await
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> AppResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}

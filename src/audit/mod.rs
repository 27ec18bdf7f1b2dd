/// Append-only audit log with a retention window
use crate::{
    db::models::AuditRecord,
    error::AppResult,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// Audit log manager
#[derive(Clone)]
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append an audit record
    pub async fn record(
        &self,
        action: &str,
        user: &str,
        ip: Option<&str>,
        details: Option<&str>,
        target: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO audit_log (action, user, ip, details, target, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(action)
        .bind(user)
        .bind(ip)
        .bind(details)
        .bind(target)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Most recent audit records
    pub async fn list_recent(&self, limit: i64) -> AppResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRecord>(
            "SELECT id, action, user, ip, details, target, timestamp
             FROM audit_log ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Delete records older than the retention window; returns the count removed
    pub async fn purge_older_than(&self, retention_days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);

        let result = sqlx::query("DELETE FROM audit_log WHERE timestamp < ?1")
            .bind(cutoff)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn create_test_log() -> AuditLog {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT NOT NULL,
                user TEXT NOT NULL,
                ip TEXT,
                details TEXT,
                target TEXT,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        AuditLog::new(db)
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let log = create_test_log().await;

        log.record("signin", "alice", Some("10.0.0.1"), None, None)
            .await
            .unwrap();
        log.record("document.sign", "alice", None, Some("Keputusan 01"), Some("doc-1"))
            .await
            .unwrap();

        let records = log.list_recent(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "document.sign");
        assert_eq!(records[0].target.as_deref(), Some("doc-1"));
    }

    #[tokio::test]
    async fn test_purge_respects_retention() {
        let log = create_test_log().await;

        log.record("signin", "alice", None, None, None).await.unwrap();

        // Insert an old record directly
        sqlx::query(
            "INSERT INTO audit_log (action, user, timestamp) VALUES ('signin', 'bob', ?1)",
        )
        .bind(Utc::now() - Duration::days(120))
        .execute(&log.db)
        .await
        .unwrap();

        let removed = log.purge_older_than(90).await.unwrap();
        assert_eq!(removed, 1);

        let records = log.list_recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user, "alice");
    }
}

/// Member profiles
use crate::{
    db::models::Member,
    error::{AppError, AppResult},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Membership status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Free,
    Active,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Free => "free",
            MemberStatus::Active => "active",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "free" => Ok(MemberStatus::Free),
            "active" => Ok(MemberStatus::Active),
            _ => Err(AppError::Validation(format!("Invalid member status: {}", s))),
        }
    }
}

/// Member directory manager
#[derive(Clone)]
pub struct MemberDirectory {
    db: SqlitePool,
}

impl MemberDirectory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a member profile
    pub async fn create(
        &self,
        nim: &str,
        full_name: &str,
        email: Option<String>,
        status: MemberStatus,
    ) -> AppResult<Member> {
        if nim.trim().is_empty() {
            return Err(AppError::Validation("NIM cannot be empty".to_string()));
        }

        let member = Member {
            nim: nim.to_string(),
            full_name: full_name.to_string(),
            email,
            status: status.as_str().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO member (nim, full_name, email, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&member.nim)
        .bind(&member.full_name)
        .bind(&member.email)
        .bind(&member.status)
        .bind(member.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Member {} already exists", nim))
            }
            _ => AppError::Database(e),
        })?;

        Ok(member)
    }

    /// Get member by NIM
    pub async fn get(&self, nim: &str) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            "SELECT nim, full_name, email, status, created_at FROM member WHERE nim = ?1",
        )
        .bind(nim)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))
    }

    /// List all members
    pub async fn list(&self) -> AppResult<Vec<Member>> {
        let rows = sqlx::query_as::<_, Member>(
            "SELECT nim, full_name, email, status, created_at FROM member ORDER BY nim ASC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Update a member's status
    pub async fn set_status(&self, nim: &str, status: MemberStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE member SET status = ?1 WHERE nim = ?2")
            .bind(status.as_str())
            .bind(nim)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }

        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM member")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}

/// Agendas with committee and participant registration
///
/// Registrations live in their own rows with a (agenda, member) uniqueness
/// constraint; approval and visit marking are conditional updates, so two
/// concurrent requests cannot double-register or double-approve.
use crate::{
    db::models::{Agenda, CommitteeEntry, ParticipantEntry},
    error::{AppError, AppResult},
    roster::{can_register, RegistrationRule},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Agenda manager
#[derive(Clone)]
pub struct AgendaManager {
    db: SqlitePool,
}

impl AgendaManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create an agenda
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        title: &str,
        description: Option<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        location: Option<String>,
        rule: RegistrationRule,
        created_by: &str,
    ) -> AppResult<Agenda> {
        if ends_at <= starts_at {
            return Err(AppError::Validation(
                "Agenda must end after it starts".to_string(),
            ));
        }

        let agenda = Agenda {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description,
            starts_at,
            ends_at,
            location,
            registration_rule: rule.as_str().to_string(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO agenda (id, title, description, starts_at, ends_at, location, registration_rule, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&agenda.id)
        .bind(&agenda.title)
        .bind(&agenda.description)
        .bind(agenda.starts_at)
        .bind(agenda.ends_at)
        .bind(&agenda.location)
        .bind(&agenda.registration_rule)
        .bind(&agenda.created_by)
        .bind(agenda.created_at)
        .execute(&self.db)
        .await?;

        Ok(agenda)
    }

    /// Get agenda by id
    pub async fn get(&self, agenda_id: &str) -> AppResult<Agenda> {
        sqlx::query_as::<_, Agenda>(
            "SELECT id, title, description, starts_at, ends_at, location, registration_rule, created_by, created_at
             FROM agenda WHERE id = ?1",
        )
        .bind(agenda_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Agenda not found".to_string()))
    }

    /// List agendas, newest first
    pub async fn list(&self) -> AppResult<Vec<Agenda>> {
        let rows = sqlx::query_as::<_, Agenda>(
            "SELECT id, title, description, starts_at, ends_at, location, registration_rule, created_by, created_at
             FROM agenda ORDER BY starts_at DESC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// The next agenda starting after now, if any
    pub async fn nearest(&self, now: DateTime<Utc>) -> AppResult<Option<Agenda>> {
        let row = sqlx::query_as::<_, Agenda>(
            "SELECT id, title, description, starts_at, ends_at, location, registration_rule, created_by, created_at
             FROM agenda WHERE starts_at > ?1 ORDER BY starts_at ASC LIMIT 1",
        )
        .bind(now)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM agenda")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    /// Register a member to the committee of an agenda
    pub async fn register_committee(
        &self,
        agenda_id: &str,
        member_nim: &str,
        job: &str,
        is_admin: bool,
        is_dept: bool,
    ) -> AppResult<CommitteeEntry> {
        let agenda = self.get(agenda_id).await?;
        let rule = RegistrationRule::from_str(&agenda.registration_rule)?;

        if !can_register(rule, is_admin, is_dept) {
            return Err(AppError::Forbidden(format!(
                "Registration rule {} does not admit this member",
                rule.as_str()
            )));
        }

        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO agenda_committee (agenda_id, member_nim, job, approved, registered_at)
             VALUES (?1, ?2, ?3, 0, ?4)
             RETURNING id",
        )
        .bind(agenda_id)
        .bind(member_nim)
        .bind(job)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Already registered for this agenda".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(CommitteeEntry {
            id,
            agenda_id: agenda_id.to_string(),
            member_nim: member_nim.to_string(),
            job: job.to_string(),
            approved: false,
            registered_at: now,
        })
    }

    /// Approve a pending committee registration
    pub async fn approve_committee(&self, agenda_id: &str, member_nim: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE agenda_committee SET approved = 1
             WHERE agenda_id = ?1 AND member_nim = ?2 AND approved = 0",
        )
        .bind(agenda_id)
        .bind(member_nim)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM agenda_committee WHERE agenda_id = ?1 AND member_nim = ?2",
            )
            .bind(agenda_id)
            .bind(member_nim)
            .fetch_one(&self.db)
            .await?;

            return if exists > 0 {
                Err(AppError::Conflict("Registration already approved".to_string()))
            } else {
                Err(AppError::NotFound("Committee registration not found".to_string()))
            };
        }

        Ok(())
    }

    /// Register a member as a participant of an agenda
    pub async fn register_participant(
        &self,
        agenda_id: &str,
        member_nim: &str,
        is_admin: bool,
        is_dept: bool,
    ) -> AppResult<ParticipantEntry> {
        let agenda = self.get(agenda_id).await?;
        let rule = RegistrationRule::from_str(&agenda.registration_rule)?;

        if !can_register(rule, is_admin, is_dept) {
            return Err(AppError::Forbidden(format!(
                "Registration rule {} does not admit this member",
                rule.as_str()
            )));
        }

        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO agenda_participant (agenda_id, member_nim, visiting, registered_at)
             VALUES (?1, ?2, 0, ?3)
             RETURNING id",
        )
        .bind(agenda_id)
        .bind(member_nim)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Already registered for this agenda".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(ParticipantEntry {
            id,
            agenda_id: agenda_id.to_string(),
            member_nim: member_nim.to_string(),
            visiting: false,
            visited_at: None,
            registered_at: now,
        })
    }

    /// Mark a registered participant as visiting
    pub async fn mark_visited(&self, agenda_id: &str, member_nim: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE agenda_participant SET visiting = 1, visited_at = ?1
             WHERE agenda_id = ?2 AND member_nim = ?3 AND visiting = 0",
        )
        .bind(Utc::now())
        .bind(agenda_id)
        .bind(member_nim)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM agenda_participant WHERE agenda_id = ?1 AND member_nim = ?2",
            )
            .bind(agenda_id)
            .bind(member_nim)
            .fetch_one(&self.db)
            .await?;

            return if exists > 0 {
                Err(AppError::Conflict("Visit already recorded".to_string()))
            } else {
                Err(AppError::NotFound("Participant registration not found".to_string()))
            };
        }

        Ok(())
    }

    /// Committee entries for an agenda
    pub async fn list_committees(&self, agenda_id: &str) -> AppResult<Vec<CommitteeEntry>> {
        let rows = sqlx::query_as::<_, CommitteeEntry>(
            "SELECT id, agenda_id, member_nim, job, approved, registered_at
             FROM agenda_committee WHERE agenda_id = ?1 ORDER BY registered_at ASC",
        )
        .bind(agenda_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Participant entries for an agenda
    pub async fn list_participants(&self, agenda_id: &str) -> AppResult<Vec<ParticipantEntry>> {
        let rows = sqlx::query_as::<_, ParticipantEntry>(
            "SELECT id, agenda_id, member_nim, visiting, visited_at, registered_at
             FROM agenda_participant WHERE agenda_id = ?1 ORDER BY registered_at ASC",
        )
        .bind(agenda_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn create_test_manager() -> AgendaManager {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE agenda (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                starts_at TEXT NOT NULL,
                ends_at TEXT NOT NULL,
                location TEXT,
                registration_rule TEXT NOT NULL DEFAULT 'All',
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE agenda_committee (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agenda_id TEXT NOT NULL,
                member_nim TEXT NOT NULL,
                job TEXT NOT NULL,
                approved INTEGER NOT NULL DEFAULT 0,
                registered_at TEXT NOT NULL,
                UNIQUE (agenda_id, member_nim)
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE agenda_participant (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agenda_id TEXT NOT NULL,
                member_nim TEXT NOT NULL,
                visiting INTEGER NOT NULL DEFAULT 0,
                visited_at TEXT,
                registered_at TEXT NOT NULL,
                UNIQUE (agenda_id, member_nim)
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        AgendaManager::new(db)
    }

    async fn sample_agenda(manager: &AgendaManager, rule: RegistrationRule) -> Agenda {
        let now = Utc::now();
        manager
            .create(
                "Rapat kerja",
                Some("Annual work meeting".to_string()),
                now + Duration::days(7),
                now + Duration::days(8),
                Some("Aula Barat".to_string()),
                rule,
                "chairman",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_committee_registration_and_approval() {
        let manager = create_test_manager().await;
        let agenda = sample_agenda(&manager, RegistrationRule::All).await;

        let entry = manager
            .register_committee(&agenda.id, "13519001", "logistics", false, false)
            .await
            .unwrap();
        assert!(!entry.approved);

        manager.approve_committee(&agenda.id, "13519001").await.unwrap();
        let committees = manager.list_committees(&agenda.id).await.unwrap();
        assert!(committees[0].approved);

        // Second approval is a conflict
        let err = manager.approve_committee(&agenda.id, "13519001").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let manager = create_test_manager().await;
        let agenda = sample_agenda(&manager, RegistrationRule::All).await;

        manager
            .register_committee(&agenda.id, "13519001", "logistics", false, false)
            .await
            .unwrap();
        let err = manager
            .register_committee(&agenda.id, "13519001", "consumption", false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_registration_rules_enforced() {
        let manager = create_test_manager().await;

        let closed = sample_agenda(&manager, RegistrationRule::No).await;
        let err = manager
            .register_participant(&closed.id, "13519001", true, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let admin_only = sample_agenda(&manager, RegistrationRule::Admin).await;
        let err = manager
            .register_participant(&admin_only.id, "13519001", false, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        manager
            .register_participant(&admin_only.id, "13519002", true, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_visit_flow() {
        let manager = create_test_manager().await;
        let agenda = sample_agenda(&manager, RegistrationRule::All).await;

        manager
            .register_participant(&agenda.id, "13519001", false, false)
            .await
            .unwrap();
        manager.mark_visited(&agenda.id, "13519001").await.unwrap();

        let participants = manager.list_participants(&agenda.id).await.unwrap();
        assert!(participants[0].visiting);
        assert!(participants[0].visited_at.is_some());

        let err = manager.mark_visited(&agenda.id, "13519001").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = manager.mark_visited(&agenda.id, "13519099").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_nearest_agenda() {
        let manager = create_test_manager().await;
        let now = Utc::now();

        assert!(manager.nearest(now).await.unwrap().is_none());

        manager
            .create("Far", None, now + Duration::days(30), now + Duration::days(31), None, RegistrationRule::All, "x")
            .await
            .unwrap();
        let near = manager
            .create("Near", None, now + Duration::days(2), now + Duration::days(3), None, RegistrationRule::All, "x")
            .await
            .unwrap();

        assert_eq!(manager.nearest(now).await.unwrap().unwrap().id, near.id);
    }
}

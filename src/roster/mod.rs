/// Period-scoped officer and department rosters
///
/// Officer seats and department memberships are assigned per administrative
/// period; the "current" roster is whatever rows have a period containing now.
/// Role resolution is read-only and degrades to defaults instead of failing.
use crate::{
    db::models::{AdministrationRecord, DepartmentRecord},
    error::{AppError, AppResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Officer seats within an administration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfficerRole {
    Chairman,
    ViceChairman,
    Secretary,
    ViceSecretary,
    Treasurer,
    ViceTreasurer,
}

impl OfficerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfficerRole::Chairman => "chairman",
            OfficerRole::ViceChairman => "viceChairman",
            OfficerRole::Secretary => "secretary",
            OfficerRole::ViceSecretary => "viceSecretary",
            OfficerRole::Treasurer => "treasurer",
            OfficerRole::ViceTreasurer => "viceTreasurer",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "chairman" => Ok(OfficerRole::Chairman),
            "viceChairman" => Ok(OfficerRole::ViceChairman),
            "secretary" => Ok(OfficerRole::Secretary),
            "viceSecretary" => Ok(OfficerRole::ViceSecretary),
            "treasurer" => Ok(OfficerRole::Treasurer),
            "viceTreasurer" => Ok(OfficerRole::ViceTreasurer),
            _ => Err(AppError::Validation(format!("Invalid officer role: {}", s))),
        }
    }
}

/// Who may register for an agenda
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationRule {
    All,
    No,
    Admin,
    Departement,
    Internal,
    External,
}

impl RegistrationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationRule::All => "All",
            RegistrationRule::No => "No",
            RegistrationRule::Admin => "Admin",
            RegistrationRule::Departement => "Departement",
            RegistrationRule::Internal => "Internal",
            RegistrationRule::External => "External",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "All" => Ok(RegistrationRule::All),
            "No" => Ok(RegistrationRule::No),
            "Admin" => Ok(RegistrationRule::Admin),
            "Departement" => Ok(RegistrationRule::Departement),
            "Internal" => Ok(RegistrationRule::Internal),
            "External" => Ok(RegistrationRule::External),
            _ => Err(AppError::Validation(format!("Invalid registration rule: {}", s))),
        }
    }
}

/// Evaluate a registration rule against the caller's capability flags.
///
/// External admits anyone who is not simultaneously an officer and a
/// department member.
pub fn can_register(rule: RegistrationRule, is_admin: bool, is_dept: bool) -> bool {
    match rule {
        RegistrationRule::All => true,
        RegistrationRule::No => false,
        RegistrationRule::Admin => is_admin,
        RegistrationRule::Departement => is_dept,
        RegistrationRule::Internal => is_admin || is_dept,
        RegistrationRule::External => !is_admin || !is_dept,
    }
}

/// Computed capability level for a member
#[derive(Debug, Clone, Serialize)]
pub struct RoleInfo {
    pub role: String,
    pub department: String,
    pub organizer: bool,
    /// Whether a current department record exists (as opposed to the default label)
    pub in_department: bool,
}

impl RoleInfo {
    /// Capability level with no roster records: plain member
    pub fn member(default_department: &str) -> Self {
        RoleInfo {
            role: "Member".to_string(),
            department: default_department.to_string(),
            organizer: false,
            in_department: false,
        }
    }
}

/// Roster manager
#[derive(Clone)]
pub struct RosterManager {
    db: SqlitePool,
    default_department: String,
}

impl RosterManager {
    pub fn new(db: SqlitePool, default_department: String) -> Self {
        Self {
            db,
            default_department,
        }
    }

    /// Assign an officer seat for a period
    pub async fn assign_officer(
        &self,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        role: OfficerRole,
        member_nim: &str,
    ) -> AppResult<AdministrationRecord> {
        if period_end <= period_start {
            return Err(AppError::Validation(
                "Period end must be after period start".to_string(),
            ));
        }

        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO administration (period_start, period_end, role, member_nim, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(period_start)
        .bind(period_end)
        .bind(role.as_str())
        .bind(member_nim)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        Ok(AdministrationRecord {
            id,
            period_start,
            period_end,
            role: role.as_str().to_string(),
            member_nim: member_nim.to_string(),
            created_at: now,
        })
    }

    /// Assign a member to a department for a period
    pub async fn assign_department(
        &self,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        label: &str,
        member_nim: &str,
    ) -> AppResult<DepartmentRecord> {
        if period_end <= period_start {
            return Err(AppError::Validation(
                "Period end must be after period start".to_string(),
            ));
        }

        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO department (period_start, period_end, label, member_nim, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(period_start)
        .bind(period_end)
        .bind(label)
        .bind(member_nim)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        Ok(DepartmentRecord {
            id,
            period_start,
            period_end,
            label: label.to_string(),
            member_nim: member_nim.to_string(),
            created_at: now,
        })
    }

    /// Officer role currently held by a member, if any
    pub async fn current_officer_role(
        &self,
        member_nim: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<OfficerRole>> {
        let role: Option<String> = sqlx::query_scalar(
            r#"
            SELECT role FROM administration
            WHERE member_nim = ?1 AND period_start <= ?2 AND period_end >= ?2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(member_nim)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;

        role.map(|s| OfficerRole::from_str(&s)).transpose()
    }

    /// Department label currently assigned to a member, if any
    pub async fn current_department(
        &self,
        member_nim: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<String>> {
        let label: Option<String> = sqlx::query_scalar(
            r#"
            SELECT label FROM department
            WHERE member_nim = ?1 AND period_start <= ?2 AND period_end >= ?2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(member_nim)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;

        Ok(label)
    }

    /// Compute the capability level for a member.
    ///
    /// Lookup failures degrade to the defaults ("Member", default department,
    /// not an organizer) so reads never block on roster state.
    pub async fn resolve(&self, member_nim: &str, now: DateTime<Utc>) -> RoleInfo {
        let role = match self.current_officer_role(member_nim, now).await {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!("role lookup failed for {}: {}", member_nim, e);
                None
            }
        };

        let department = match self.current_department(member_nim, now).await {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!("department lookup failed for {}: {}", member_nim, e);
                None
            }
        };

        RoleInfo {
            organizer: role.is_some(),
            in_department: department.is_some(),
            role: role
                .map(|r| r.as_str().to_string())
                .unwrap_or_else(|| "Member".to_string()),
            department: department.unwrap_or_else(|| self.default_department.clone()),
        }
    }

    /// Whether the member currently holds any officer seat
    pub async fn is_organizer(&self, member_nim: &str, now: DateTime<Utc>) -> bool {
        match self.current_officer_role(member_nim, now).await {
            Ok(role) => role.is_some(),
            Err(e) => {
                tracing::warn!("organizer lookup failed for {}: {}", member_nim, e);
                false
            }
        }
    }

    /// List all officer seats for the period containing now
    pub async fn list_current_administration(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AdministrationRecord>> {
        let rows = sqlx::query_as::<_, AdministrationRecord>(
            r#"
            SELECT id, period_start, period_end, role, member_nim, created_at
            FROM administration
            WHERE period_start <= ?1 AND period_end >= ?1
            ORDER BY id ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// List all department assignments for the period containing now
    pub async fn list_current_departments(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DepartmentRecord>> {
        let rows = sqlx::query_as::<_, DepartmentRecord>(
            r#"
            SELECT id, period_start, period_end, label, member_nim, created_at
            FROM department
            WHERE period_start <= ?1 AND period_end >= ?1
            ORDER BY id ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn create_test_manager() -> RosterManager {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE administration (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                period_start TEXT NOT NULL,
                period_end TEXT NOT NULL,
                role TEXT NOT NULL,
                member_nim TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE department (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                period_start TEXT NOT NULL,
                period_end TEXT NOT NULL,
                label TEXT NOT NULL,
                member_nim TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        RosterManager::new(db, "General".to_string())
    }

    #[test]
    fn test_officer_role_strings() {
        assert_eq!(OfficerRole::from_str("chairman").unwrap(), OfficerRole::Chairman);
        assert_eq!(OfficerRole::from_str("viceTreasurer").unwrap(), OfficerRole::ViceTreasurer);
        assert_eq!(OfficerRole::Secretary.as_str(), "secretary");
        assert!(OfficerRole::from_str("Chairman").is_err());
        assert!(OfficerRole::from_str("janitor").is_err());
    }

    #[test]
    fn test_can_register_table() {
        use RegistrationRule::*;

        let combos = [(false, false), (false, true), (true, false), (true, true)];

        for (is_admin, is_dept) in combos {
            assert!(can_register(All, is_admin, is_dept));
            assert!(!can_register(No, is_admin, is_dept));
            assert_eq!(can_register(Admin, is_admin, is_dept), is_admin);
            assert_eq!(can_register(Departement, is_admin, is_dept), is_dept);
            assert_eq!(can_register(Internal, is_admin, is_dept), is_admin || is_dept);
            assert_eq!(can_register(External, is_admin, is_dept), !is_admin || !is_dept);
        }

        // External only excludes the admin-and-dept combination
        assert!(can_register(External, false, false));
        assert!(can_register(External, true, false));
        assert!(can_register(External, false, true));
        assert!(!can_register(External, true, true));
    }

    #[tokio::test]
    async fn test_resolve_current_officer() {
        let manager = create_test_manager().await;
        let now = Utc::now();

        manager
            .assign_officer(now - Duration::days(30), now + Duration::days(335), OfficerRole::Chairman, "13519001")
            .await
            .unwrap();

        let info = manager.resolve("13519001", now).await;
        assert_eq!(info.role, "chairman");
        assert!(info.organizer);
        assert_eq!(info.department, "General");
    }

    #[tokio::test]
    async fn test_expired_period_is_not_current() {
        let manager = create_test_manager().await;
        let now = Utc::now();

        manager
            .assign_officer(now - Duration::days(400), now - Duration::days(35), OfficerRole::Chairman, "13519001")
            .await
            .unwrap();

        let info = manager.resolve("13519001", now).await;
        assert_eq!(info.role, "Member");
        assert!(!info.organizer);
        assert!(!manager.is_organizer("13519001", now).await);
    }

    #[tokio::test]
    async fn test_resolve_defaults_without_records() {
        let manager = create_test_manager().await;

        let info = manager.resolve("13519099", Utc::now()).await;
        assert_eq!(info.role, "Member");
        assert_eq!(info.department, "General");
        assert!(!info.organizer);
    }

    #[tokio::test]
    async fn test_department_resolution() {
        let manager = create_test_manager().await;
        let now = Utc::now();

        manager
            .assign_department(now - Duration::days(1), now + Duration::days(364), "Media", "13519002")
            .await
            .unwrap();

        let info = manager.resolve("13519002", now).await;
        assert_eq!(info.department, "Media");
        assert_eq!(info.role, "Member");
        assert!(!info.organizer);
    }

    #[tokio::test]
    async fn test_invalid_period_rejected() {
        let manager = create_test_manager().await;
        let now = Utc::now();

        let err = manager
            .assign_officer(now, now - Duration::days(1), OfficerRole::Chairman, "13519001")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

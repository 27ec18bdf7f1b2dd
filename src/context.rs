/// Application context and dependency injection
use crate::{
    agenda::AgendaManager,
    audit::AuditLog,
    config::ServerConfig,
    db,
    db::models::Identity,
    documents::DocumentManager,
    error::AppResult,
    events::{Broadcaster, BroadcasterConfig},
    identity::{IdentityManager, TokenIssuer},
    mailer::Mailer,
    members::MemberDirectory,
    rate_limit::RateLimiter,
    roster::{RoleInfo, RosterManager},
    signing::{KeyStore, KeyWrap},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub identities: IdentityManager,
    pub members: MemberDirectory,
    pub roster: RosterManager,
    pub agendas: AgendaManager,
    pub keys: KeyStore,
    pub documents: DocumentManager,
    pub audit: AuditLog,
    pub broadcaster: Broadcaster,
    pub rate_limiter: RateLimiter,
    pub mailer: Mailer,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;

        // Run migrations
        db::run_migrations(&pool).await?;

        // Test connection
        db::test_connection(&pool).await?;

        Self::with_pool(config, pool)
    }

    /// Wire the managers over an existing pool (used directly by tests)
    pub fn with_pool(config: ServerConfig, pool: SqlitePool) -> AppResult<Self> {
        let tokens = TokenIssuer::new(
            config.auth.token_secret.clone(),
            config.auth.access_ttl_hours,
            config.auth.refresh_ttl_days,
        );
        let identities = IdentityManager::new(pool.clone(), tokens);

        let members = MemberDirectory::new(pool.clone());
        let roster = RosterManager::new(pool.clone(), config.auth.default_department.clone());
        let agendas = AgendaManager::new(pool.clone());

        let wrap = KeyWrap::new(config.master_key_bytes()?);
        let keys = KeyStore::new(pool.clone(), wrap, config.signing.key_bits);
        let documents = DocumentManager::new(pool.clone(), keys.clone());

        let audit = AuditLog::new(pool.clone());
        let broadcaster = Broadcaster::new(pool.clone(), BroadcasterConfig::default());
        let rate_limiter = RateLimiter::new(&config.rate_limit);
        let mailer = Mailer::new(config.email.clone())?;

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            identities,
            members,
            roster,
            agendas,
            keys,
            documents,
            audit,
            broadcaster,
            rate_limiter,
            mailer,
        })
    }

    /// Capability level for an identity, bootstrap organizers included
    pub async fn role_for(&self, identity: &Identity) -> RoleInfo {
        let mut role = match identity.member_nim.as_deref() {
            Some(nim) => self.roster.resolve(nim, Utc::now()).await,
            None => RoleInfo::member(&self.config.auth.default_department),
        };

        if self
            .config
            .auth
            .bootstrap_organizers
            .contains(&identity.username)
        {
            role.organizer = true;
        }

        role
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}

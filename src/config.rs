/// Configuration management for the himpun server
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub signing: SigningConfig,
    pub retention: RetentionConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for access/refresh token signatures
    pub token_secret: String,
    pub access_ttl_hours: i64,
    pub refresh_ttl_days: i64,
    /// Usernames treated as organizer before any roster exists (comma-separated)
    pub bootstrap_organizers: Vec<String>,
    /// Department label reported when no current record matches
    pub default_department: String,
}

/// Document signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Hex-encoded 32-byte master key that wraps private keys at rest.
    /// Held only in configuration, never persisted next to ciphertext.
    pub master_key: String,
    pub key_bits: usize,
}

/// Data retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub audit_log_days: i64,
    pub email_token_hours: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub authenticated_rps: u32,
    pub unauthenticated_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let name = env::var("HIMPUN_SERVICE_NAME").unwrap_or_else(|_| "himpun".to_string());
        let hostname = env::var("HIMPUN_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("HIMPUN_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let version = env::var("HIMPUN_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("HIMPUN_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("HIMPUN_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("himpun.sqlite"));

        let token_secret = env::var("HIMPUN_TOKEN_SECRET")
            .map_err(|_| AppError::Validation("Token secret required".to_string()))?;
        let access_ttl_hours = env::var("HIMPUN_ACCESS_TTL_HOURS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let refresh_ttl_days = env::var("HIMPUN_REFRESH_TTL_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        // Parse bootstrap organizers from comma-separated list
        let bootstrap_organizers = env::var("HIMPUN_BOOTSTRAP_ORGANIZERS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let default_department = env::var("HIMPUN_DEFAULT_DEPARTMENT")
            .unwrap_or_else(|_| "General".to_string());

        let master_key = env::var("HIMPUN_SIGNING_MASTER_KEY")
            .map_err(|_| AppError::Validation("Signing master key required".to_string()))?;
        let key_bits = env::var("HIMPUN_SIGNING_KEY_BITS")
            .unwrap_or_else(|_| "2048".to_string())
            .parse()
            .unwrap_or(2048);

        let audit_log_days = env::var("HIMPUN_AUDIT_RETENTION_DAYS")
            .unwrap_or_else(|_| "90".to_string())
            .parse()
            .unwrap_or(90);
        let email_token_hours = env::var("HIMPUN_EMAIL_TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let email = if let Ok(smtp_url) = env::var("HIMPUN_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("HIMPUN_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let rate_limit_enabled = env::var("HIMPUN_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let authenticated_rps = env::var("HIMPUN_RATE_LIMIT_AUTHENTICATED_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let unauthenticated_rps = env::var("HIMPUN_RATE_LIMIT_UNAUTHENTICATED_RPS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let burst_size = env::var("HIMPUN_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                name,
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            auth: AuthConfig {
                token_secret,
                access_ttl_hours,
                refresh_ttl_days,
                bootstrap_organizers,
                default_department,
            },
            signing: SigningConfig {
                master_key,
                key_bits,
            },
            retention: RetentionConfig {
                audit_log_days,
                email_token_hours,
            },
            email,
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                authenticated_rps,
                unauthenticated_rps,
                burst_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.token_secret.len() < 32 {
            return Err(AppError::Validation(
                "Token secret must be at least 32 characters".to_string(),
            ));
        }

        let key = hex::decode(&self.signing.master_key)
            .map_err(|_| AppError::Validation("Signing master key must be hex".to_string()))?;
        if key.len() != 32 {
            return Err(AppError::Validation(
                "Signing master key must be 32 bytes (64 hex characters)".to_string(),
            ));
        }

        if self.signing.key_bits < 2048 {
            return Err(AppError::Validation(
                "Signing keys below 2048 bits are not accepted".to_string(),
            ));
        }

        Ok(())
    }

    /// Decoded signing master key bytes. Call after validate().
    pub fn master_key_bytes(&self) -> AppResult<[u8; 32]> {
        let bytes = hex::decode(&self.signing.master_key)
            .map_err(|_| AppError::Validation("Signing master key must be hex".to_string()))?;
        bytes
            .try_into()
            .map_err(|_| AppError::Validation("Signing master key must be 32 bytes".to_string()))
    }
}

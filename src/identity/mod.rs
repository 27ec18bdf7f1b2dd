/// Identity and session management
///
/// Handles registration, credential verification, the access/refresh token
/// lifecycle, and email verification for identities.

mod manager;
pub mod tokens;

pub use manager::IdentityManager;
pub use tokens::{Claims, TokenIssuer, SCOPE_ACCESS, SCOPE_REFRESH};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// Optional link to an existing member profile
    pub member_nim: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token pair produced by a successful login
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session info returned to the authenticated caller
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub username: String,
    pub member_nim: Option<String>,
    pub verified: bool,
    pub role: String,
    pub department: String,
    pub organizer: bool,
}

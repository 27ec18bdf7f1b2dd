/// Authentication extractors
///
/// The request authenticator middleware resolves the caller before any
/// handler runs and stores a `CurrentUser` in the request extensions; these
/// extractors hand it to handlers.
use crate::{
    context::AppContext,
    db::models::Identity,
    error::AppError,
    roster::RoleInfo,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Resolved caller: identity plus computed capability level
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: Identity,
    pub role: RoleInfo,
}

impl CurrentUser {
    /// Member identifier, when the identity has a linked profile
    pub fn nim(&self) -> Option<&str> {
        self.identity.member_nim.as_deref()
    }
}

/// Authenticated context - any signed-in identity
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: CurrentUser,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()))?;

        Ok(AuthContext { user })
    }
}

/// Organizer context - requires a current officer role
#[derive(Debug, Clone)]
pub struct OrganizerContext {
    pub user: CurrentUser,
}

#[async_trait]
impl FromRequestParts<AppContext> for OrganizerContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthContext { user } = AuthContext::from_request_parts(parts, state).await?;

        if !user.role.organizer {
            return Err(AppError::Forbidden("Organizer role required".to_string()));
        }

        Ok(OrganizerContext { user })
    }
}

/// Request authentication middleware
use crate::{
    auth::CurrentUser,
    context::AppContext,
    error::AppError,
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

/// Access token cookie name
pub const ACCESS_COOKIE: &str = "UserCanAccess";
/// Refresh token cookie name (spelling is the wire contract)
pub const REFRESH_COOKIE: &str = "UserCanRrefresh";

/// Public read-only routes
const PUBLIC_GET_ROUTES: &[&str] = &[
    "/api/stats",
    "/api/config",
    "/api/news",
    "/api/nearest-agenda",
    "/api/organizer",
    "/api/refresh",
    "/api/verify-email",
    "/health",
    "/metrics",
];

/// Public routes regardless of method (credential bootstrap)
const PUBLIC_ROUTES: &[&str] = &["/api/signin", "/api/signup"];

/// Extract a cookie value from the Cookie header
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")
        .and_then(|h| h.to_str().ok())
        .and_then(|raw| {
            raw.split(';').find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                if key == name {
                    Some(value.to_string())
                } else {
                    None
                }
            })
        })
}

/// Best-effort client address for audit records
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
}

fn is_public(method: &Method, path: &str) -> bool {
    if PUBLIC_ROUTES.contains(&path) {
        return true;
    }

    method == Method::GET && PUBLIC_GET_ROUTES.contains(&path)
}

/// Resolve the caller from the access cookie
async fn resolve_user(ctx: &AppContext, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let token = extract_cookie(headers, ACCESS_COOKIE)
        .ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()))?;

    let identity = ctx.identities.validate_access(&token).await?;
    let role = ctx.role_for(&identity).await;

    Ok(CurrentUser { identity, role })
}

/// Authenticate the request and attach the resolved caller.
///
/// Runs before every handler. Non-public routes reject outright when no valid
/// access token is presented; public routes pass through, still attaching the
/// caller when one resolves.
pub async fn authenticate(
    State(ctx): State<AppContext>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let public = is_public(req.method(), req.uri().path());

    match resolve_user(&ctx, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
        }
        Err(e) if !public => return Err(e),
        Err(_) => {}
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            "UserCanAccess=abc123; UserCanRrefresh=def456".parse().unwrap(),
        );

        assert_eq!(extract_cookie(&headers, ACCESS_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(extract_cookie(&headers, REFRESH_COOKIE).as_deref(), Some("def456"));
        assert_eq!(extract_cookie(&headers, "Other"), None);
    }

    #[test]
    fn test_extract_cookie_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(extract_cookie(&headers, ACCESS_COOKIE), None);
    }

    #[test]
    fn test_public_route_table() {
        assert!(is_public(&Method::GET, "/api/stats"));
        assert!(is_public(&Method::GET, "/api/news"));
        assert!(is_public(&Method::POST, "/api/signin"));
        assert!(is_public(&Method::POST, "/api/signup"));
        assert!(is_public(&Method::GET, "/api/refresh"));

        // Read-only routes are public for GET only
        assert!(!is_public(&Method::POST, "/api/news"));
        // Everything else requires a resolved identity
        assert!(!is_public(&Method::GET, "/api/members"));
        assert!(!is_public(&Method::POST, "/api/documents"));
    }
}

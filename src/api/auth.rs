/// Authentication endpoints: signup, signin, refresh, signout
use crate::{
    api::{message, middleware, ok, ApiResponse},
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    identity::{SessionInfo, SignInRequest, SignUpRequest},
    metrics,
};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use validator::Validate;

/// Build authentication routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/signup", post(sign_up))
        .route("/api/signin", post(sign_in))
        .route("/api/refresh", get(refresh))
        .route("/api/signout", post(sign_out))
        .route("/api/me", get(me))
        .route("/api/verify-email", get(verify_email))
}

fn auth_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Register a new identity
async fn sign_up(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<SignUpRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // A linked member profile must already exist
    let member = match req.member_nim.as_deref() {
        Some(nim) => Some(ctx.members.get(nim).await?),
        None => None,
    };

    let identity = ctx
        .identities
        .register(&req.username, &req.password, req.member_nim.clone())
        .await?;

    ctx.audit
        .record(
            "auth.signup",
            &identity.username,
            middleware::client_ip(&headers).as_deref(),
            None,
            None,
        )
        .await?;

    // Verification email is best-effort; registration stands without it
    if ctx.mailer.is_configured() {
        if let Some(email) = member.as_ref().and_then(|m| m.email.clone()) {
            match ctx
                .identities
                .create_email_token(&identity.id, "confirm_email", ctx.config.retention.email_token_hours)
                .await
            {
                Ok(token) => {
                    if let Err(e) = ctx
                        .mailer
                        .send_verification_email(&email, &identity.username, &token)
                        .await
                    {
                        tracing::warn!("failed to send verification email: {}", e);
                    }
                }
                Err(e) => tracing::warn!("failed to create verification token: {}", e),
            }
        }
    }

    Ok(message("Account created"))
}

/// Verify credentials, open a session and set the token cookies
async fn sign_in(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<SignInRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<SessionInfo>>)> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (identity, tokens) = match ctx.identities.login(&req.username, &req.password).await {
        Ok(result) => result,
        Err(e) => {
            metrics::SIGNIN_TOTAL.with_label_values(&["failure"]).inc();
            ctx.audit
                .record(
                    "auth.signin.failed",
                    &req.username,
                    middleware::client_ip(&headers).as_deref(),
                    None,
                    None,
                )
                .await?;
            return Err(e);
        }
    };

    metrics::SIGNIN_TOTAL.with_label_values(&["success"]).inc();
    ctx.audit
        .record(
            "auth.signin",
            &identity.username,
            middleware::client_ip(&headers).as_deref(),
            None,
            None,
        )
        .await?;

    let issuer = ctx.identities.token_issuer();
    let jar = jar
        .add(auth_cookie(
            middleware::ACCESS_COOKIE,
            tokens.access_token,
            issuer.access_ttl().num_seconds(),
        ))
        .add(auth_cookie(
            middleware::REFRESH_COOKIE,
            tokens.refresh_token,
            issuer.refresh_ttl().num_seconds(),
        ));

    let role = ctx.role_for(&identity).await;
    let session = SessionInfo {
        username: identity.username,
        member_nim: identity.member_nim,
        verified: identity.verified,
        organizer: role.organizer,
        role: role.role,
        department: role.department,
    };

    Ok((jar, ok(session)))
}

/// Exchange the refresh cookie for a fresh access cookie
async fn refresh(
    State(ctx): State<AppContext>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ApiResponse<()>>)> {
    let refresh_token = jar
        .get(middleware::REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let access_token = ctx.identities.refresh(&refresh_token).await?;

    let jar = jar.add(auth_cookie(
        middleware::ACCESS_COOKIE,
        access_token,
        ctx.identities.token_issuer().access_ttl().num_seconds(),
    ));

    Ok((jar, message("Token refreshed")))
}

/// Close the session and clear both cookies
async fn sign_out(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ApiResponse<()>>)> {
    ctx.identities.logout(&auth.user.identity.id).await?;

    ctx.audit
        .record(
            "auth.signout",
            &auth.user.identity.username,
            middleware::client_ip(&headers).as_deref(),
            None,
            None,
        )
        .await?;

    let jar = jar
        .remove(Cookie::from(middleware::ACCESS_COOKIE))
        .remove(Cookie::from(middleware::REFRESH_COOKIE));

    Ok((jar, message("Signed out")))
}

/// Current session info
async fn me(auth: AuthContext) -> AppResult<Json<ApiResponse<SessionInfo>>> {
    let user = auth.user;

    Ok(ok(SessionInfo {
        username: user.identity.username,
        member_nim: user.identity.member_nim,
        verified: user.identity.verified,
        organizer: user.role.organizer,
        role: user.role.role,
        department: user.role.department,
    }))
}

#[derive(Debug, Deserialize)]
struct VerifyEmailQuery {
    token: String,
}

/// Confirm an email verification token
async fn verify_email(
    State(ctx): State<AppContext>,
    Query(query): Query<VerifyEmailQuery>,
) -> AppResult<Json<ApiResponse<()>>> {
    ctx.identities.verify_email(&query.token).await?;

    Ok(message("Email verified"))
}

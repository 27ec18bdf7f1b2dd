/// Access/refresh token issuance and verification
use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const SCOPE_ACCESS: &str = "access";
pub const SCOPE_REFRESH: &str = "refresh";

/// Claims carried by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the identity
    pub sub: String,
    /// Linked member identifier, when the identity has a profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nim: Option<String>,
    pub scope: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies the session token pair with a shared secret
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, access_ttl_hours: i64, refresh_ttl_days: i64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::hours(access_ttl_hours),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    /// Issue a short-lived access token
    pub fn issue_access(&self, username: &str, nim: Option<&str>) -> AppResult<String> {
        self.issue(username, nim, SCOPE_ACCESS, self.access_ttl)
    }

    /// Issue a long-lived refresh token
    pub fn issue_refresh(&self, username: &str, nim: Option<&str>) -> AppResult<String> {
        self.issue(username, nim, SCOPE_REFRESH, self.refresh_ttl)
    }

    fn issue(&self, username: &str, nim: Option<&str>, scope: &str, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            nim: nim.map(|s| s.to_string()),
            scope: scope.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verify a token's signature, expiry and scope
    ///
    /// This performs:
    /// 1. Signature verification
    /// 2. Expiration checking
    /// 3. Scope matching against the expected token kind
    pub fn verify(&self, token: &str, expected_scope: &str) -> AppResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        // Allow some clock skew (5 minutes)
        validation.leeway = 300;

        let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("token verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::Unauthorized("Invalid token signature".to_string())
                }
                _ => AppError::Unauthorized(format!("Invalid token: {}", e)),
            }
        })?;

        if data.claims.scope != expected_scope {
            return Err(AppError::Unauthorized("Wrong token scope".to_string()));
        }

        Ok(data.claims)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-test-secret-test-secret!", 10, 30)
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let token = issuer.issue_access("alice", Some("13519001")).unwrap();

        let claims = issuer.verify(&token, SCOPE_ACCESS).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.nim.as_deref(), Some("13519001"));
        assert_eq!(claims.scope, SCOPE_ACCESS);
    }

    #[test]
    fn test_scope_mismatch_rejected() {
        let issuer = issuer();
        let refresh = issuer.issue_refresh("alice", None).unwrap();

        let err = issuer.verify(&refresh, SCOPE_ACCESS).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = issuer();
        let token = issuer.issue_access("alice", None).unwrap();

        // Flip a character in the payload segment
        let mut parts: Vec<String> = token.split('.').map(|s| s.to_string()).collect();
        let mut payload: Vec<u8> = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();
        let tampered = parts.join(".");

        assert!(issuer.verify(&tampered, SCOPE_ACCESS).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = issuer();
        let other = TokenIssuer::new("another-secret-another-secret-anoth", 10, 30);

        let token = issuer.issue_access("alice", None).unwrap();
        assert!(other.verify(&token, SCOPE_ACCESS).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();

        // Hand-craft a token expired beyond the verification leeway
        let now = Utc::now();
        let claims = Claims {
            sub: "alice".to_string(),
            nim: None,
            scope: SCOPE_REFRESH.to_string(),
            iat: (now - Duration::days(31)).timestamp(),
            exp: (now - Duration::days(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret-test-secret-test-secret!".as_bytes()),
        )
        .unwrap();

        let err = issuer.verify(&token, SCOPE_REFRESH).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}

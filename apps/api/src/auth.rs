//! Session tokens and the authenticated actor.
//!
//! Tokens are HS256 JWTs carrying the user id, role and a unique `jti`.
//! Logging out stores the `jti` in the revocation table; the [`Actor`]
//! extractor rejects revoked tokens and users that were deactivated after
//! the token was issued.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use till_core::{Role, User};

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID, the handle used for revocation
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.sub.parse().map_err(|_| ApiError::Unauthenticated)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// Issues and verifies session tokens.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: impl Into<String>, lifetime_secs: i64) -> Self {
        JwtManager {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issues a fresh token for `user`.
    pub fn issue(&self, user: &User) -> Result<(String, Claims), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok((token, claims))
    }

    /// Verifies signature and expiry and returns the claims.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected token");
            ApiError::Unauthenticated
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticated operator behind a request.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Actor {
    /// Fails with 403 unless the actor holds one of `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
        require_role(self, allowed)
    }
}

pub fn require_role(actor: &Actor, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        debug!(user_id = actor.user_id, role = %actor.role, "Role not permitted");
        Err(ApiError::Forbidden)
    }
}

/// Admins and managers.
pub const BACK_OFFICE: &[Role] = &[Role::Admin, Role::Manager];

/// Admins only.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or(ApiError::Unauthenticated)?;

        let claims = state.jwt.validate(token)?;
        if state.db.users().is_token_revoked(&claims.jti).await? {
            return Err(ApiError::Unauthenticated);
        }

        let user_id = claims.user_id()?;
        let user = match state.db.users().get(user_id).await {
            Ok(user) => user,
            Err(till_db::DbError::NotFound { .. }) => return Err(ApiError::Unauthenticated),
            Err(e) => return Err(e.into()),
        };
        if !user.can_login() {
            return Err(ApiError::Unauthenticated);
        }

        let actor = Actor {
            user_id,
            // The stored role wins over the one in the token so demotions apply at once.
            role: user.role,
            token_id: claims.jti.clone(),
            expires_at: claims.expires_at(),
        };
        parts.extensions.insert(actor.clone());

        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: 7,
            employee_id: "EMP-0007".to_string(),
            first_name: "Ana".to_string(),
            middle_name: None,
            last_name: "Reyes".to_string(),
            suffix: None,
            email: "ana@till.local".to_string(),
            password_hash: String::new(),
            role,
            phone: None,
            address: None,
            birth_date: None,
            hire_date: None,
            salary_cents: None,
            is_active: true,
            is_deleted: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 3600);
        let (token, issued) = manager.issue(&user(Role::Manager)).unwrap();

        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_each_token_has_its_own_id() {
        let manager = JwtManager::new("test-secret", 3600);
        let (_, first) = manager.issue(&user(Role::Cashier)).unwrap();
        let (_, second) = manager.issue(&user(Role::Cashier)).unwrap();
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = JwtManager::new("secret-a", 3600);
        let verifier = JwtManager::new("secret-b", 3600);
        let (token, _) = issuer.issue(&user(Role::Admin)).unwrap();

        assert!(matches!(verifier.validate(&token), Err(ApiError::Unauthenticated)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let manager = JwtManager::new("test-secret", -3600);
        let (token, _) = manager.issue(&user(Role::Admin)).unwrap();

        assert!(matches!(manager.validate(&token), Err(ApiError::Unauthenticated)));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_require_role() {
        let actor = Actor {
            user_id: 1,
            role: Role::Cashier,
            token_id: "t".to_string(),
            expires_at: Utc::now(),
        };
        assert!(actor.require(&[Role::Cashier, Role::Admin]).is_ok());
        assert!(matches!(actor.require(BACK_OFFICE), Err(ApiError::Forbidden)));
    }
}

//! Signed session tokens carried in the `token` cookie.
//!
//! Tokens are HS256 JWTs over `{name, email, id, iat}` with no expiry.
//! Verification trusts the claims without going back to the user store.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Extension;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error};
use uuid::Uuid;

use crate::helpers::api_error::ApiError;
use crate::models::user::User;

pub const SESSION_COOKIE: &str = "token";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionClaims {
    pub name: String,
    pub email: String,
    pub id: Uuid,
    pub iat: i64,
}

impl SessionClaims {
    pub fn for_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            id: user.id,
            iat: OffsetDateTime::now_utc().unix_timestamp(),
        }
    }
}

pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionManager {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, ApiError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign session token for user: {}, due to: {}", claims.id, e);
            ApiError::Internal(format!("failed to sign session token: {}", e))
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, ApiError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected session token: {}", e);
                ApiError::Unauthorized
            })
    }

    pub fn session_cookie(token: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .finish()
    }

    /// Empty, already-expired `token` cookie. Sent on logout whether or not
    /// the request carried a session.
    pub fn expired_cookie() -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .max_age(time::Duration::ZERO)
            .expires(time::OffsetDateTime::UNIX_EPOCH)
            .finish()
    }
}

/// Identity resolved from the request's session cookie. Rejects with 401
/// when the cookie is missing or fails verification.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub SessionClaims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(sessions) =
            Extension::<Arc<SessionManager>>::from_request_parts(parts, state)
                .await
                .map_err(|e| ApiError::Internal(format!("session manager missing: {}", e)))?;

        let jar = match CookieJar::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };

        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_owned())
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        sessions.verify(&token).map(CurrentUser)
    }
}

// Request guards resolving the bearer credential before a handler runs.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use uuid::Uuid;

use super::session::SessionAuthority;
use crate::db::User;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "session";

/// The `session` cookie carrying `"Bearer <token>"`.
pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, format!("Bearer {token}")))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Pull the raw token from `Authorization: Bearer ...`, falling back to the
/// session cookie.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    cookie_token(&CookieJar::from_headers(headers))
}

/// The raw token held in the session cookie, if any.
pub fn cookie_token(jar: &CookieJar) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let value = cookie.value().trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// An authenticated caller. Says nothing about whether the account is active.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<SessionAuthority>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<Self>() {
            return Ok(auth.clone());
        }

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthenticated("Not authenticated".to_string()))?;

        let sessions = Arc::<SessionAuthority>::from_ref(state);
        let verified = sessions.verify(&token).await?;
        let auth = AuthUser {
            user_id: verified.user_id,
            token_id: verified.token_id,
            token: verified.token,
        };

        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

/// An authenticated caller whose account is active.
#[derive(Debug, Clone)]
pub struct ActiveUser(pub User);

impl<S> FromRequestParts<S> for ActiveUser
where
    S: Send + Sync,
    Arc<SessionAuthority>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let sessions = Arc::<SessionAuthority>::from_ref(state);
        let user = sessions.active_user(auth.user_id).await?;
        Ok(ActiveUser(user))
    }
}

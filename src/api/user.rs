// User and session endpoints.

use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AppState, BaseSchema, Json, Query};
use crate::auth::{cookie_token, session_cookie, ActiveUser, AuthUser};
use crate::db::{Token, User};
use crate::error::{ApiError, ApiResult, CREDENTIALS_REJECTED};
use crate::metrics::LOGIN_ATTEMPTS_TOTAL;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

#[derive(Deserialize)]
pub struct RevokeTokenParams {
    pub token_id: Uuid,
}

#[derive(Deserialize)]
pub struct SetActiveParams {
    pub user_id: Uuid,
    pub active: bool,
}

/// A user as returned by login and verify: the account plus its live token.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserWithToken {
    #[serde(flatten)]
    pub user: User,
    pub token: Token,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<UserWithToken>)> {
    if let Err(e) = state.login_limiter.check_limit(&req.username) {
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&["rate_limited"]).inc();
        tracing::warn!("Login rate limit hit for username {:?}", req.username);
        return Err(ApiError::RateLimited(e.to_string()));
    }

    let session = state.sessions.login(&req.username, &req.password).await?;
    state.login_limiter.clear(&req.username);

    // A cookie from an earlier session in this client is superseded by the new one
    if let Some(previous) = cookie_token(&jar) {
        state
            .sessions
            .discard_superseded(&previous, &session.token)
            .await?;
    }

    let jar = jar.add(session_cookie(&session.token.token, state.cookie_secure));
    Ok((
        jar,
        Json(UserWithToken {
            user: session.user,
            token: session.token,
        }),
    ))
}

pub async fn signup(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Json(req): Json<SignupRequest>,
) -> ApiResult<BaseSchema> {
    let user = state
        .sessions
        .register(&req.username, req.email.as_deref(), &req.password)
        .await?;
    tracing::info!(
        "The user {:?} was created with id {} by {:?} ({})",
        user.username,
        user.id,
        caller.username,
        caller.id
    );
    Ok(BaseSchema::new("User Successfully Created").with("User ID", user.id.to_string()))
}

pub async fn update_password(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<BaseSchema> {
    state.sessions.update_password(&user, &req.password).await?;
    Ok(BaseSchema::new("Successfully updated password"))
}

pub async fn verify(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<UserWithToken>> {
    let user = state.sessions.active_user(auth.user_id).await?;
    let token = state
        .db
        .get_token(auth.token_id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated(CREDENTIALS_REJECTED.to_string()))?;
    Ok(Json(UserWithToken { user, token }))
}

pub async fn revoke_token(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<RevokeTokenParams>,
) -> ApiResult<BaseSchema> {
    state.sessions.revoke_token(params.token_id, &caller).await?;
    Ok(BaseSchema::new("Success"))
}

pub async fn set_active(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<SetActiveParams>,
) -> ApiResult<Json<User>> {
    let user = state
        .sessions
        .set_active(&caller, params.user_id, params.active)
        .await?;
    Ok(Json(user))
}

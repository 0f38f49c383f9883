// Session authority: login, bearer verification, revocation and password
// changes against the user and token tables.
//
// A user holds at most one token row (`tokens.user_id` is UNIQUE). Login
// reuses a token that still verifies, deletes one that does not, and mints a
// replacement when none is left.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::password::{self, check_policy};
use super::token::TokenKeys;
use crate::db::{Database, Token, User};
use crate::error::{conflict_as, ApiError, ApiResult, CREDENTIALS_REJECTED};
use crate::metrics::{LOGIN_ATTEMPTS_TOTAL, TOKENS_ISSUED_TOTAL, TOKENS_REVOKED_TOTAL};

/// Passes through the link step before giving up; each pass only repeats
/// when a concurrent revoke removed the token between insert and read.
const LINK_ATTEMPTS: usize = 3;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 36;

/// A user together with the one token linked to it.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: Token,
}

/// The identity a bearer credential resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub token: String,
    pub token_id: Uuid,
    pub user_id: Uuid,
}

pub struct SessionAuthority {
    db: Arc<Database>,
    keys: TokenKeys,
    // Verified against when the username is unknown so both paths cost one Argon2 run
    dummy_hash: String,
}

impl SessionAuthority {
    pub fn new(db: Arc<Database>, keys: TokenKeys) -> ApiResult<Self> {
        let dummy_hash = password::hash_password(&Uuid::new_v4().to_string())?;
        Ok(Self {
            db,
            keys,
            dummy_hash,
        })
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    // ── Login ────────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Session> {
        if username.trim().is_empty() {
            return Err(ApiError::validation("Username must not be empty"));
        }

        let user = self.db.get_user_by_username(username).await?;
        let stored_hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());

        let verified = verify_blocking(password, stored_hash).await?;
        let Some(user) = user.filter(|_| verified) else {
            LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&["invalid_credentials"])
                .inc();
            tracing::info!("Rejected login for username {username:?}");
            return Err(ApiError::InvalidCredentials);
        };

        let user = match check_active(user) {
            Ok(user) => user,
            Err(e) => {
                LOGIN_ATTEMPTS_TOTAL.with_label_values(&["deactivated"]).inc();
                return Err(e);
            }
        };

        let token = self.ensure_token(user.id).await?;
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!("User {} logged in", user.id);
        Ok(Session { user, token })
    }

    /// Return the user's live token, replacing a stale one or minting the first.
    async fn ensure_token(&self, user_id: Uuid) -> ApiResult<Token> {
        for _ in 0..LINK_ATTEMPTS {
            if let Some(existing) = self.db.get_token_for_user(user_id).await? {
                match self.keys.verify(&existing.token) {
                    Ok(claims) if claims.sub == user_id => return Ok(existing),
                    _ => {
                        // Delete by id so a replacement linked meanwhile survives
                        if self.db.delete_token(existing.id).await? {
                            TOKENS_REVOKED_TOTAL.with_label_values(&["replaced"]).inc();
                            tracing::info!("Discarded stale token {} of user {user_id}", existing.id);
                        }
                    }
                }
            }

            let minted = self.keys.issue(user_id)?;
            if let Some(linked) = self
                .db
                .insert_token_if_absent(user_id, &minted, Utc::now())
                .await?
            {
                if linked.token == minted {
                    TOKENS_ISSUED_TOTAL.inc();
                    tracing::info!("Issued token {} to user {user_id}", linked.id);
                }
                return Ok(linked);
            }
        }

        Err(ApiError::Internal(format!(
            "token for user {user_id} was revoked while logging in"
        )))
    }

    /// Revoke a token left behind by an earlier session in the same client,
    /// unless it is the token the client now holds.
    pub async fn discard_superseded(&self, previous: &str, current: &Token) -> ApiResult<()> {
        if previous == current.token {
            return Ok(());
        }
        if let Some(stale) = self.db.get_token_by_token(previous).await? {
            if stale.id != current.id && self.db.delete_token(stale.id).await? {
                TOKENS_REVOKED_TOTAL.with_label_values(&["superseded"]).inc();
                tracing::info!(
                    "Revoked token {} superseded by a login of user {}",
                    stale.id,
                    current.user_id
                );
            }
        }
        Ok(())
    }

    // ── Verification ─────────────────────────────────────────────────

    /// Resolve a bearer credential. Does not look at `is_active`.
    pub async fn verify(&self, token: &str) -> ApiResult<VerifiedToken> {
        let claims = self.keys.verify(token).map_err(|e| {
            tracing::debug!("Bearer token rejected: {e}");
            ApiError::from(e)
        })?;

        let stored = self
            .db
            .get_token_by_token(token)
            .await?
            .filter(|t| t.user_id == claims.sub)
            .ok_or_else(|| ApiError::Unauthenticated(CREDENTIALS_REJECTED.to_string()))?;

        Ok(VerifiedToken {
            token: stored.token,
            token_id: stored.id,
            user_id: stored.user_id,
        })
    }

    /// Load the user behind a verified token and require it to be active.
    pub async fn active_user(&self, user_id: Uuid) -> ApiResult<User> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated(CREDENTIALS_REJECTED.to_string()))?;
        check_active(user)
    }

    // ── Revocation ───────────────────────────────────────────────────

    pub async fn revoke_token(&self, token_id: Uuid, caller: &User) -> ApiResult<()> {
        if !self.db.delete_token(token_id).await? {
            return Err(ApiError::not_found("Token", token_id));
        }
        TOKENS_REVOKED_TOTAL.with_label_values(&["revoked"]).inc();
        tracing::info!("User {} revoked token {token_id}", caller.id);
        Ok(())
    }

    // ── Account management ───────────────────────────────────────────

    /// Existing tokens stay valid after a password change.
    pub async fn update_password(&self, user: &User, new_password: &str) -> ApiResult<()> {
        check_policy(new_password).map_err(ApiError::Validation)?;
        let hash = hash_blocking(new_password).await?;
        if !self.db.update_password_hash(user.id, &hash).await? {
            return Err(ApiError::not_found("User", user.id));
        }
        tracing::info!("User {} changed their password", user.id);
        Ok(())
    }

    pub async fn register(
        &self,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> ApiResult<User> {
        check_username(username)?;
        if let Some(email) = email {
            check_email(email)?;
        }
        check_policy(password).map_err(ApiError::Validation)?;

        let hash = hash_blocking(password).await?;
        self.db
            .create_user(username, email, &hash)
            .await
            .map_err(|e| conflict_as(e, format!("Username {username} is already taken")))
    }

    pub async fn set_active(&self, caller: &User, user_id: Uuid, active: bool) -> ApiResult<User> {
        if caller.id == user_id && !active {
            return Err(ApiError::validation("You cannot deactivate your own account"));
        }
        let user = self
            .db
            .set_user_active(user_id, active)
            .await?
            .ok_or_else(|| ApiError::not_found("User", user_id))?;
        tracing::info!(
            "User {} set user {} active={}",
            caller.id,
            user.id,
            user.is_active
        );
        Ok(user)
    }

    /// Create the first account when the users table is empty.
    pub async fn bootstrap(&self, username: &str, password: &str) -> ApiResult<Option<User>> {
        if self.db.count_users().await? > 0 {
            return Ok(None);
        }
        let user = self.register(username, None, password).await?;
        tracing::info!("Created bootstrap user {} ({})", user.username, user.id);
        Ok(Some(user))
    }
}

pub fn check_active(user: User) -> ApiResult<User> {
    if user.is_active {
        Ok(user)
    } else {
        Err(ApiError::Forbidden("User is deactivated".to_string()))
    }
}

fn check_username(username: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ApiError::validation(format!(
            "Username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ApiError::validation("Username must not contain whitespace"));
    }
    Ok(())
}

fn check_email(email: &str) -> ApiResult<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(format!("Invalid email address: {email}")))
    }
}

// Argon2 is deliberately slow; keep it off the async workers.

async fn verify_blocking(password: &str, hash: String) -> ApiResult<bool> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password verification task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn hash_blocking(password: &str) -> ApiResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

// HTTP surface: shared state, response envelope and the route table.

mod extract;
mod matches;
mod player;
mod posts;
mod prefix;
mod sets;
mod team;
mod user;

pub use extract::{Json, Path, Query};

use axum::{
    extract::FromRef,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::auth::{SessionAuthority, TokenKeys};
use crate::config::Config;
use crate::db::Database;
use crate::error::ApiResult;
use crate::metrics;
use crate::rate_limit::RateLimiter;

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub sessions: Arc<SessionAuthority>,
    pub login_limiter: RateLimiter,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: &Config) -> ApiResult<Self> {
        let keys = TokenKeys::new(config.jwt_secret.as_bytes(), config.token_ttl);
        let sessions = Arc::new(SessionAuthority::new(db.clone(), keys)?);
        Ok(Self {
            db,
            sessions,
            login_limiter: RateLimiter::per_minute(config.login_attempts_per_minute),
            cookie_secure: config.cookie_secure,
        })
    }
}

impl FromRef<AppState> for Arc<SessionAuthority> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

// ── Response envelope ─────────────────────────────────────────────────

/// Body of every non-resource response: a message plus ordered key/value extras.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaseSchema {
    pub message: String,
    #[serde(default)]
    pub extra: Vec<Map<String, Value>>,
}

impl BaseSchema {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extra: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut entry = Map::new();
        entry.insert(key.into(), value.into());
        self.extra.push(entry);
        self
    }
}

impl IntoResponse for BaseSchema {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        // Users and sessions
        .route("/user/login", post(user::login))
        .route("/user/signup", post(user::signup))
        .route("/user/update-password", post(user::update_password))
        .route("/user/verify", post(user::verify))
        .route("/user/revoke_token", post(user::revoke_token))
        .route("/user/set-active", post(user::set_active))
        // Teams
        .route("/team/all", get(team::list_teams))
        .route("/team/id", get(team::get_team))
        .route("/team/discord-id", get(team::get_team_by_discord_id))
        .route("/team/name", get(team::get_team_by_name).post(team::rename_team))
        .route("/team/create", post(team::create_team))
        .route("/team/delete", post(team::delete_team))
        .route("/team/update-elo", post(team::update_elo))
        .route("/team/add-player-to-team", post(team::add_player_to_team))
        .route(
            "/team/remove-player-from-team",
            post(team::remove_player_from_team),
        )
        // Players
        .route("/player/all", get(player::list_players))
        .route("/player/id", get(player::get_player))
        .route("/player/name", get(player::get_player_by_name))
        .route("/player/create", post(player::create_player))
        .route("/player/delete", post(player::delete_player))
        // Matches
        .route("/match/id", get(matches::get_match))
        .route("/match/get-matches-by-teams", get(matches::matches_between))
        .route("/match/get-matches-by-team-id", get(matches::matches_by_team))
        .route("/match/all", get(matches::list_matches))
        .route("/match/create-match", post(matches::create_match))
        .route("/match/delete", post(matches::delete_match))
        // Sets
        .route("/set/id", get(sets::get_set))
        .route("/set/by-match-id", get(sets::sets_by_match))
        .route("/set/by-map", get(sets::sets_by_map))
        .route("/set/all", get(sets::list_sets))
        .route("/set/create-set", post(sets::create_set))
        // Discord prefixes
        .route("/prefix/all", get(prefix::list_prefixes))
        .route("/prefix/guild-id", get(prefix::get_prefix))
        .route("/prefix/create", post(prefix::create_prefix))
        .route("/prefix/update", post(prefix::update_prefix))
        .route("/prefix/delete", post(prefix::delete_prefix))
        // Blog
        .route("/blog/posts", get(posts::list_posts).post(posts::add_post))
        .route("/blog/posts/{id}", get(posts::get_post))
        .layer(axum::middleware::from_fn(metrics::track_metrics))
        .with_state(state)
}

// ── Service endpoints ─────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "mordhau-stats" }))
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_schema_shape() {
        let body = BaseSchema::new("Created")
            .with("id", "abc")
            .with("count", 2);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({ "message": "Created", "extra": [{ "id": "abc" }, { "count": 2 }] })
        );
    }

    #[test]
    fn test_base_schema_without_extra() {
        let value = serde_json::to_value(BaseSchema::new("Success")).unwrap();
        assert_eq!(value, json!({ "message": "Success", "extra": [] }));
    }
}

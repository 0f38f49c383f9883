use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, BaseSchema, Json, Query};
use crate::auth::ActiveUser;
use crate::db::Player;
use crate::error::{conflict_as, ApiError, ApiResult};

#[derive(Deserialize)]
pub struct IdParams {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct NameParams {
    pub player_name: String,
}

#[derive(Deserialize)]
pub struct PlayerIdParams {
    pub player_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreatePlayerRequest {
    pub player_name: String,
    pub playfab_id: String,
    #[serde(alias = "steam_id")]
    pub steam64: Option<i64>,
    pub team_id: Option<Uuid>,
}

pub async fn list_players(State(state): State<AppState>) -> ApiResult<Json<Vec<Player>>> {
    Ok(Json(state.db.list_players().await?))
}

pub async fn get_player(
    State(state): State<AppState>,
    Query(params): Query<IdParams>,
) -> ApiResult<Json<Player>> {
    state
        .db
        .get_player(params.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Player", params.id))
}

pub async fn get_player_by_name(
    State(state): State<AppState>,
    Query(params): Query<NameParams>,
) -> ApiResult<Json<Player>> {
    state
        .db
        .get_player_by_name(&params.player_name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Could not find player: {}", params.player_name)))
}

pub async fn create_player(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Json(req): Json<CreatePlayerRequest>,
) -> ApiResult<BaseSchema> {
    if req.player_name.trim().is_empty() || req.playfab_id.trim().is_empty() {
        return Err(ApiError::validation(
            "Player name and PlayFab id must not be empty",
        ));
    }
    if let Some(team_id) = req.team_id {
        if state.db.get_team(team_id).await?.is_none() {
            return Err(ApiError::not_found("Team", team_id));
        }
    }

    let player = state
        .db
        .create_player(
            req.player_name.trim(),
            req.playfab_id.trim(),
            req.steam64,
            req.team_id,
        )
        .await
        .map_err(|e| conflict_as(e, "Player already exists"))?;

    tracing::info!(
        "User {} created player {:?} ({})",
        caller.id,
        player.player_name,
        player.id
    );
    Ok(BaseSchema::new(format!("Created player with id: {}", player.id))
        .with("player_id", player.id.to_string()))
}

pub async fn delete_player(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<PlayerIdParams>,
) -> ApiResult<BaseSchema> {
    if !state.db.delete_player(params.player_id).await? {
        return Err(ApiError::not_found("Player", params.player_id));
    }
    tracing::info!("User {} deleted player {}", caller.id, params.player_id);
    Ok(BaseSchema::new(format!("Player {} deleted", params.player_id)))
}

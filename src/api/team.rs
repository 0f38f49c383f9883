// Team endpoints, including roster changes.

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, BaseSchema, Json, Query};
use crate::auth::ActiveUser;
use crate::db::TeamWithPlayers;
use crate::error::{conflict_as, ApiError, ApiResult};

pub const DEFAULT_ELO: i32 = 1500;

#[derive(Deserialize)]
pub struct IdParams {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct DiscordIdParams {
    pub discord_id: i64,
}

#[derive(Deserialize)]
pub struct NameParams {
    pub team_name: String,
}

#[derive(Deserialize)]
pub struct TeamIdParams {
    pub team_id: Uuid,
}

#[derive(Deserialize)]
pub struct RenameParams {
    pub team_id: Uuid,
    pub new_name: String,
}

#[derive(Deserialize)]
pub struct UpdateEloParams {
    pub team_id: Uuid,
    pub new_elo: i32,
}

#[derive(Deserialize)]
pub struct RosterParams {
    pub player_id: Uuid,
    pub team_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateTeamRequest {
    pub team_name: String,
    #[serde(default = "default_elo")]
    pub elo: i32,
    pub discord_id: Option<i64>,
}

fn default_elo() -> i32 {
    DEFAULT_ELO
}

fn check_team_name(name: &str) -> ApiResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Team name must not be empty"));
    }
    Ok(name)
}

pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<Vec<TeamWithPlayers>>> {
    Ok(Json(state.db.list_teams().await?))
}

pub async fn get_team(
    State(state): State<AppState>,
    Query(params): Query<IdParams>,
) -> ApiResult<Json<TeamWithPlayers>> {
    state
        .db
        .get_team(params.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Team", params.id))
}

pub async fn get_team_by_discord_id(
    State(state): State<AppState>,
    Query(params): Query<DiscordIdParams>,
) -> ApiResult<Json<TeamWithPlayers>> {
    state
        .db
        .get_team_by_discord_id(params.discord_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Team with discord id {} not found",
                params.discord_id
            ))
        })
}

pub async fn get_team_by_name(
    State(state): State<AppState>,
    Query(params): Query<NameParams>,
) -> ApiResult<Json<TeamWithPlayers>> {
    state
        .db
        .get_team_by_name(&params.team_name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Team with name {:?} not found", params.team_name)))
}

pub async fn create_team(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<BaseSchema> {
    let name = check_team_name(&req.team_name)?;
    let team = state
        .db
        .create_team(name, req.elo, req.discord_id)
        .await
        .map_err(|e| conflict_as(e, format!("Team {name:?} already exists")))?;

    tracing::info!("User {} created team {:?} ({})", caller.id, team.team_name, team.id);
    Ok(BaseSchema::new(format!("Team ID: {}", team.id)).with("id", team.id.to_string()))
}

pub async fn rename_team(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<RenameParams>,
) -> ApiResult<Json<TeamWithPlayers>> {
    let name = check_team_name(&params.new_name)?;
    let team = state
        .db
        .update_team_name(params.team_id, name)
        .await
        .map_err(|e| conflict_as(e, format!("Team {name:?} already exists")))?
        .ok_or_else(|| ApiError::not_found("Team", params.team_id))?;

    tracing::info!("User {} renamed team {} to {name:?}", caller.id, params.team_id);
    Ok(Json(team))
}

pub async fn delete_team(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<TeamIdParams>,
) -> ApiResult<BaseSchema> {
    if !state.db.delete_team(params.team_id).await? {
        return Err(ApiError::not_found("Team", params.team_id));
    }
    tracing::info!("User {} deleted team {}", caller.id, params.team_id);
    Ok(BaseSchema::new(format!("Team {} deleted", params.team_id))
        .with("id", params.team_id.to_string()))
}

pub async fn update_elo(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<UpdateEloParams>,
) -> ApiResult<Json<TeamWithPlayers>> {
    let team = state
        .db
        .update_team_elo(params.team_id, params.new_elo)
        .await?
        .ok_or_else(|| ApiError::not_found("Team", params.team_id))?;
    tracing::info!(
        "User {} set elo of team {} to {}",
        caller.id,
        params.team_id,
        params.new_elo
    );
    Ok(Json(team))
}

pub async fn add_player_to_team(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<RosterParams>,
) -> ApiResult<Json<TeamWithPlayers>> {
    if state.db.get_team(params.team_id).await?.is_none() {
        return Err(ApiError::not_found("Team", params.team_id));
    }
    if !state
        .db
        .set_player_team(params.player_id, Some(params.team_id))
        .await?
    {
        return Err(ApiError::not_found("Player", params.player_id));
    }
    tracing::info!(
        "User {} added player {} to team {}",
        caller.id,
        params.player_id,
        params.team_id
    );
    roster(&state, params.team_id).await
}

pub async fn remove_player_from_team(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<RosterParams>,
) -> ApiResult<Json<TeamWithPlayers>> {
    let player = state
        .db
        .get_player(params.player_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Player", params.player_id))?;
    if player.team_id != Some(params.team_id) {
        return Err(ApiError::NotFound(format!(
            "Player {} is not on team {}",
            params.player_id, params.team_id
        )));
    }

    state.db.set_player_team(player.id, None).await?;
    tracing::info!(
        "User {} removed player {} from team {}",
        caller.id,
        params.player_id,
        params.team_id
    );
    roster(&state, params.team_id).await
}

async fn roster(state: &AppState, team_id: Uuid) -> ApiResult<Json<TeamWithPlayers>> {
    state
        .db
        .get_team(team_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Team", team_id))
}

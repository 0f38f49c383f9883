// Match endpoints. Rating updates are not computed here; `elo_calculated`
// stays false and team ratings are set through `/team/update-elo`.

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, BaseSchema, Json, Query};
use crate::auth::ActiveUser;
use crate::db::{Match, MatchWithSets};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct IdParams {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct TeamsParams {
    pub team1_id: Uuid,
    pub team2_id: Uuid,
}

#[derive(Deserialize)]
pub struct TeamParams {
    pub team_id: Uuid,
}

#[derive(Deserialize)]
pub struct MatchIdParams {
    pub match_id: Uuid,
}

/// ISO 8601 bounds on `created_at`; both or neither.
#[derive(Deserialize)]
pub struct WindowParams {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct CreateMatchRequest {
    pub team1_id: Option<Uuid>,
    pub team2_id: Option<Uuid>,
}

pub async fn get_match(
    State(state): State<AppState>,
    Query(params): Query<IdParams>,
) -> ApiResult<Json<MatchWithSets>> {
    state
        .db
        .get_match(params.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Match", params.id))
}

pub async fn matches_between(
    State(state): State<AppState>,
    Query(params): Query<TeamsParams>,
) -> ApiResult<Json<Vec<Match>>> {
    Ok(Json(
        state
            .db
            .list_matches_between(params.team1_id, params.team2_id)
            .await?,
    ))
}

pub async fn matches_by_team(
    State(state): State<AppState>,
    Query(params): Query<TeamParams>,
) -> ApiResult<Json<Vec<Match>>> {
    Ok(Json(state.db.list_matches_by_team(params.team_id).await?))
}

pub async fn list_matches(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> ApiResult<Json<Vec<Match>>> {
    let window = match (params.start_time, params.end_time) {
        (Some(start), Some(end)) if start > end => {
            return Err(ApiError::validation("start_time must not be after end_time"));
        }
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => {
            return Err(ApiError::validation(
                "Both a start and end time MUST be supplied if a date is given!",
            ));
        }
    };
    Ok(Json(state.db.list_matches(window).await?))
}

pub async fn create_match(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Json(req): Json<CreateMatchRequest>,
) -> ApiResult<BaseSchema> {
    if req.team1_id.is_some() && req.team1_id == req.team2_id {
        return Err(ApiError::validation("A team cannot play against itself"));
    }
    for team_id in [req.team1_id, req.team2_id].into_iter().flatten() {
        if state.db.get_team(team_id).await?.is_none() {
            return Err(ApiError::not_found("Team", team_id));
        }
    }

    let game = state.db.create_match(req.team1_id, req.team2_id).await?;
    tracing::info!("User {} created match {}", caller.id, game.id);
    Ok(BaseSchema::new(format!("Created match with id: {}", game.id))
        .with("match_id", game.id.to_string()))
}

pub async fn delete_match(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<MatchIdParams>,
) -> ApiResult<BaseSchema> {
    if !state.db.delete_match(params.match_id).await? {
        return Err(ApiError::not_found("Match", params.match_id));
    }
    tracing::info!("User {} deleted match {} and its sets", caller.id, params.match_id);
    Ok(BaseSchema::new(format!("Match {} deleted", params.match_id)))
}

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, BaseSchema, Json, Query};
use crate::auth::ActiveUser;
use crate::db::Set;
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct IdParams {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct MatchIdParams {
    pub match_id: Uuid,
}

#[derive(Deserialize)]
pub struct MapParams {
    pub map_name: String,
}

#[derive(Deserialize)]
pub struct CreateSetRequest {
    pub match_id: Uuid,
    pub map: String,
}

pub async fn get_set(
    State(state): State<AppState>,
    Query(params): Query<IdParams>,
) -> ApiResult<Json<Set>> {
    state
        .db
        .get_set(params.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Set", params.id))
}

pub async fn sets_by_match(
    State(state): State<AppState>,
    Query(params): Query<MatchIdParams>,
) -> ApiResult<Json<Vec<Set>>> {
    Ok(Json(state.db.list_sets_by_match(params.match_id).await?))
}

pub async fn sets_by_map(
    State(state): State<AppState>,
    Query(params): Query<MapParams>,
) -> ApiResult<Json<Vec<Set>>> {
    Ok(Json(state.db.list_sets_by_map(&params.map_name).await?))
}

pub async fn list_sets(State(state): State<AppState>) -> ApiResult<Json<Vec<Set>>> {
    Ok(Json(state.db.list_sets().await?))
}

pub async fn create_set(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Json(req): Json<CreateSetRequest>,
) -> ApiResult<BaseSchema> {
    let map = req.map.trim();
    if map.is_empty() {
        return Err(ApiError::validation("Map name must not be empty"));
    }
    if state.db.get_match(req.match_id).await?.is_none() {
        return Err(ApiError::not_found("Match", req.match_id));
    }

    let set = state.db.create_set(req.match_id, map).await?;
    tracing::info!(
        "User {} created set {} under match {}",
        caller.id,
        set.id,
        req.match_id
    );
    Ok(
        BaseSchema::new(format!("Created a set {} under match {}", set.id, req.match_id))
            .with("set_id", set.id.to_string()),
    )
}

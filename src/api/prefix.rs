// Discord bot command prefixes, one per guild.

use axum::extract::State;
use serde::Deserialize;

use super::{AppState, BaseSchema, Json, Query};
use crate::auth::ActiveUser;
use crate::db::Prefix;
use crate::error::{conflict_as, ApiError, ApiResult};

const MAX_PREFIX_LEN: usize = 10;

#[derive(Deserialize)]
pub struct GuildParams {
    pub guild_id: i64,
}

#[derive(Deserialize)]
pub struct UpdatePrefixParams {
    pub guild_id: i64,
    pub prefix: String,
}

#[derive(Deserialize)]
pub struct CreatePrefixRequest {
    pub guild_id: i64,
    pub prefix: String,
}

fn check_prefix(prefix: &str) -> ApiResult<()> {
    let len = prefix.chars().count();
    if prefix.trim().is_empty() || len > MAX_PREFIX_LEN {
        return Err(ApiError::validation(format!(
            "Prefix must be between 1 and {MAX_PREFIX_LEN} non-blank characters"
        )));
    }
    Ok(())
}

fn no_prefix(guild_id: i64) -> ApiError {
    ApiError::NotFound(format!("No prefix configured for guild {guild_id}"))
}

pub async fn list_prefixes(State(state): State<AppState>) -> ApiResult<Json<Vec<Prefix>>> {
    Ok(Json(state.db.list_prefixes().await?))
}

pub async fn get_prefix(
    State(state): State<AppState>,
    Query(params): Query<GuildParams>,
) -> ApiResult<Json<Prefix>> {
    state
        .db
        .get_prefix_by_guild(params.guild_id)
        .await?
        .map(Json)
        .ok_or_else(|| no_prefix(params.guild_id))
}

pub async fn create_prefix(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Json(req): Json<CreatePrefixRequest>,
) -> ApiResult<BaseSchema> {
    check_prefix(&req.prefix)?;
    let prefix = state
        .db
        .create_prefix(req.guild_id, &req.prefix)
        .await
        .map_err(|e| conflict_as(e, format!("Guild {} already has a prefix", req.guild_id)))?;

    tracing::info!(
        "User {} set prefix {:?} for guild {}",
        caller.id,
        prefix.prefix,
        prefix.guild_id
    );
    Ok(BaseSchema::new(format!("Prefix set for guild {}", prefix.guild_id))
        .with("id", prefix.id.to_string()))
}

pub async fn update_prefix(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<UpdatePrefixParams>,
) -> ApiResult<Json<Prefix>> {
    check_prefix(&params.prefix)?;
    let prefix = state
        .db
        .update_prefix(params.guild_id, &params.prefix)
        .await?
        .ok_or_else(|| no_prefix(params.guild_id))?;
    tracing::info!(
        "User {} changed prefix of guild {} to {:?}",
        caller.id,
        params.guild_id,
        prefix.prefix
    );
    Ok(Json(prefix))
}

pub async fn delete_prefix(
    State(state): State<AppState>,
    ActiveUser(caller): ActiveUser,
    Query(params): Query<GuildParams>,
) -> ApiResult<BaseSchema> {
    if !state.db.delete_prefix(params.guild_id).await? {
        return Err(no_prefix(params.guild_id));
    }
    tracing::info!("User {} removed the prefix of guild {}", caller.id, params.guild_id);
    Ok(BaseSchema::new(format!("Prefix for guild {} deleted", params.guild_id)))
}

// Blog posts. Responses wrap their payload in `{"data": ...}`.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AppState, Json, Path};
use crate::auth::ActiveUser;
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let posts = state.db.list_posts().await?;
    Ok(Json(json!({ "data": posts })))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let post = state
        .db
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post", id))?;
    Ok(Json(json!({ "data": post })))
}

pub async fn add_post(
    State(state): State<AppState>,
    ActiveUser(author): ActiveUser,
    Json(post): Json<NewPost>,
) -> ApiResult<Json<Value>> {
    if post.title.trim().is_empty() {
        return Err(ApiError::validation("Post title must not be empty"));
    }
    let post = state
        .db
        .create_post(post.title.trim(), &post.content, Some(author.id))
        .await?;
    tracing::info!("User {} added blog post {}", author.id, post.id);
    Ok(Json(json!({ "data": "post added" })))
}

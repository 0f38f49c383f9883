use chrono::Utc;
use uuid::Uuid;

use super::{Database, Post};

impl Database {
    // ── Blog ──────────────────────────────────────────────────────────

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        author_id: Option<Uuid>,
    ) -> Result<Post, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            "INSERT INTO posts (title, content, author_id, created_at) VALUES (?, ?, ?, ?) \
             RETURNING id, title, content, author_id, created_at",
        )
        .bind(title)
        .bind(content)
        .bind(author_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            "SELECT id, title, content, author_id, created_at FROM posts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_post(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            "SELECT id, title, content, author_id, created_at FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

use uuid::Uuid;

use super::{Database, Prefix};

impl Database {
    // ── Guild command prefixes ────────────────────────────────────────

    pub async fn create_prefix(&self, guild_id: i64, prefix: &str) -> Result<Prefix, sqlx::Error> {
        sqlx::query_as::<_, Prefix>(
            "INSERT INTO prefixes (id, prefix, guild_id) VALUES (?, ?, ?) \
             RETURNING id, prefix, guild_id",
        )
        .bind(Uuid::new_v4())
        .bind(prefix)
        .bind(guild_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_prefixes(&self) -> Result<Vec<Prefix>, sqlx::Error> {
        sqlx::query_as::<_, Prefix>("SELECT id, prefix, guild_id FROM prefixes ORDER BY guild_id")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_prefix_by_guild(&self, guild_id: i64) -> Result<Option<Prefix>, sqlx::Error> {
        sqlx::query_as::<_, Prefix>("SELECT id, prefix, guild_id FROM prefixes WHERE guild_id = ?")
            .bind(guild_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn update_prefix(
        &self,
        guild_id: i64,
        prefix: &str,
    ) -> Result<Option<Prefix>, sqlx::Error> {
        sqlx::query_as::<_, Prefix>(
            "UPDATE prefixes SET prefix = ? WHERE guild_id = ? RETURNING id, prefix, guild_id",
        )
        .bind(prefix)
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_prefix(&self, guild_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM prefixes WHERE guild_id = ?")
            .bind(guild_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, Token};

const TOKEN_COLUMNS: &str = "id, token, user_id, issued_at";

impl Database {
    // ── Tokens ────────────────────────────────────────────────────────

    /// Link a freshly minted token to `user_id` unless the user already has one.
    ///
    /// The `UNIQUE(user_id)` constraint makes this the single point where
    /// concurrent logins race; the loser's insert is dropped and both read back
    /// the winner. Returns `None` only if the linked token was deleted between
    /// the insert and the read.
    pub async fn insert_token_if_absent(
        &self,
        user_id: Uuid,
        token: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Option<Token>, sqlx::Error> {
        sqlx::query(
            "INSERT INTO tokens (id, token, user_id, issued_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .bind(issued_at)
        .execute(&self.pool)
        .await?;

        self.get_token_for_user(user_id).await
    }

    pub async fn get_token(&self, id: Uuid) -> Result<Option<Token>, sqlx::Error> {
        sqlx::query_as::<_, Token>(&format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_token_by_token(&self, token: &str) -> Result<Option<Token>, sqlx::Error> {
        sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_token_for_user(&self, user_id: Uuid) -> Result<Option<Token>, sqlx::Error> {
        sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn count_tokens_for_user(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn delete_token(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;

    #[tokio::test]
    async fn test_insert_token_keeps_existing_link() {
        let db = test_db().await;
        let user = db.create_user("alice", None, "hash").await.unwrap();

        let first = db
            .insert_token_if_absent(user.id, "first", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.token, "first");
        assert_eq!(first.user_id, user.id);

        let second = db
            .insert_token_if_absent(user.id, "second", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(db.count_tokens_for_user(user.id).await.unwrap(), 1);
        assert!(db.get_token_by_token("second").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_lookup_and_delete() {
        let db = test_db().await;
        let user = db.create_user("alice", None, "hash").await.unwrap();
        let token = db
            .insert_token_if_absent(user.id, "abc", Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(db.get_token(token.id).await.unwrap().unwrap().token, "abc");
        assert_eq!(
            db.get_token_by_token("abc").await.unwrap().unwrap().id,
            token.id
        );

        assert!(db.delete_token(token.id).await.unwrap());
        assert!(!db.delete_token(token.id).await.unwrap());
        assert!(db.get_token_for_user(user.id).await.unwrap().is_none());
    }
}

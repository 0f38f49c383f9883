use chrono::Utc;
use uuid::Uuid;

use super::{Database, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, is_active, created_at";

impl Database {
    // ── Users ─────────────────────────────────────────────────────────

    pub async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let row = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash, is_active, created_at) \
             VALUES (?, ?, ?, ?, 1, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn count_users(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_user_active(&self, id: Uuid, active: bool) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::tests::test_db;

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let db = test_db().await;

        let user = db
            .create_user("alice", Some("alice@example.com"), "hash")
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.is_active);

        let by_name = db.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_name.email.as_deref(), Some("alice@example.com"));

        let by_id = db.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(db.get_user_by_username("bob").await.unwrap().is_none());
        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let db = test_db().await;
        db.create_user("alice", None, "hash").await.unwrap();

        let err = db.create_user("alice", None, "hash").await.unwrap_err();
        match err {
            sqlx::Error::Database(e) => assert!(e.is_unique_violation()),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_password_hash_and_active_flag() {
        let db = test_db().await;
        let user = db.create_user("alice", None, "old").await.unwrap();

        assert!(db.update_password_hash(user.id, "new").await.unwrap());
        let reloaded = db.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new");

        let deactivated = db.set_user_active(user.id, false).await.unwrap().unwrap();
        assert!(!deactivated.is_active);

        assert!(db
            .set_user_active(uuid::Uuid::new_v4(), false)
            .await
            .unwrap()
            .is_none());
    }
}

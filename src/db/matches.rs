use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, Match, MatchWithSets, Set};

const MATCH_COLUMNS: &str = "id, team1_id, team2_id, elo_calculated, created_at";
const SET_COLUMNS: &str = "id, match_id, map, created_at";

impl Database {
    // ── Matches ───────────────────────────────────────────────────────

    pub async fn create_match(
        &self,
        team1_id: Option<Uuid>,
        team2_id: Option<Uuid>,
    ) -> Result<Match, sqlx::Error> {
        sqlx::query_as::<_, Match>(&format!(
            "INSERT INTO matches (id, team1_id, team2_id, elo_calculated, created_at) \
             VALUES (?, ?, ?, 0, ?) RETURNING {MATCH_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(team1_id)
        .bind(team2_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_match(&self, id: Uuid) -> Result<Option<MatchWithSets>, sqlx::Error> {
        let game = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(game) = game else {
            return Ok(None);
        };
        let sets = self.list_sets_by_match(game.id).await?;
        Ok(Some(MatchWithSets { game, sets }))
    }

    /// All matches, or only those created within `[start, end]` when a window is given.
    pub async fn list_matches(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Match>, sqlx::Error> {
        match window {
            Some((start, end)) => {
                sqlx::query_as::<_, Match>(&format!(
                    "SELECT {MATCH_COLUMNS} FROM matches \
                     WHERE created_at >= ? AND created_at <= ? ORDER BY created_at"
                ))
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Match>(&format!(
                    "SELECT {MATCH_COLUMNS} FROM matches ORDER BY created_at"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    pub async fn list_matches_by_team(&self, team_id: Uuid) -> Result<Vec<Match>, sqlx::Error> {
        sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE team1_id = ? OR team2_id = ? ORDER BY created_at"
        ))
        .bind(team_id)
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Matches between two teams regardless of which side each played.
    pub async fn list_matches_between(
        &self,
        team_a: Uuid,
        team_b: Uuid,
    ) -> Result<Vec<Match>, sqlx::Error> {
        sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE (team1_id = ? AND team2_id = ?) OR (team1_id = ? AND team2_id = ?) \
             ORDER BY created_at"
        ))
        .bind(team_a)
        .bind(team_b)
        .bind(team_b)
        .bind(team_a)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn delete_match(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM matches WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Sets ──────────────────────────────────────────────────────────

    pub async fn create_set(&self, match_id: Uuid, map: &str) -> Result<Set, sqlx::Error> {
        sqlx::query_as::<_, Set>(&format!(
            "INSERT INTO sets (id, match_id, map, created_at) VALUES (?, ?, ?, ?) \
             RETURNING {SET_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(match_id)
        .bind(map)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_set(&self, id: Uuid) -> Result<Option<Set>, sqlx::Error> {
        sqlx::query_as::<_, Set>(&format!("SELECT {SET_COLUMNS} FROM sets WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_sets(&self) -> Result<Vec<Set>, sqlx::Error> {
        sqlx::query_as::<_, Set>(&format!("SELECT {SET_COLUMNS} FROM sets ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_sets_by_match(&self, match_id: Uuid) -> Result<Vec<Set>, sqlx::Error> {
        sqlx::query_as::<_, Set>(&format!(
            "SELECT {SET_COLUMNS} FROM sets WHERE match_id = ? ORDER BY created_at"
        ))
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_sets_by_map(&self, map: &str) -> Result<Vec<Set>, sqlx::Error> {
        sqlx::query_as::<_, Set>(&format!(
            "SELECT {SET_COLUMNS} FROM sets WHERE map = ? ORDER BY created_at"
        ))
        .bind(map)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;

    #[tokio::test]
    async fn test_match_queries_by_team() {
        let db = test_db().await;
        let a = db.create_team("Alpha", 1500, None).await.unwrap();
        let b = db.create_team("Bravo", 1500, None).await.unwrap();
        let c = db.create_team("Charlie", 1500, None).await.unwrap();

        let ab = db.create_match(Some(a.id), Some(b.id)).await.unwrap();
        let ba = db.create_match(Some(b.id), Some(a.id)).await.unwrap();
        db.create_match(Some(a.id), Some(c.id)).await.unwrap();
        assert!(!ab.elo_calculated);

        let between = db.list_matches_between(a.id, b.id).await.unwrap();
        let ids: Vec<Uuid> = between.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![ab.id, ba.id]);

        assert_eq!(db.list_matches_by_team(a.id).await.unwrap().len(), 3);
        assert_eq!(db.list_matches_by_team(c.id).await.unwrap().len(), 1);
        assert_eq!(db.list_matches(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_match_time_window() {
        let db = test_db().await;
        let before = Utc::now() - chrono::Duration::seconds(1);
        let game = db.create_match(None, None).await.unwrap();
        let after = Utc::now() + chrono::Duration::seconds(1);

        let inside = db.list_matches(Some((before, after))).await.unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].id, game.id);

        let later = after + chrono::Duration::hours(1);
        let outside = db.list_matches(Some((after, later))).await.unwrap();
        assert!(outside.is_empty());
    }

    #[tokio::test]
    async fn test_sets_cascade_with_match() {
        let db = test_db().await;
        let game = db.create_match(None, None).await.unwrap();
        let set = db.create_set(game.id, "Camp").await.unwrap();
        db.create_set(game.id, "Feitoria").await.unwrap();

        let detail = db.get_match(game.id).await.unwrap().unwrap();
        assert_eq!(detail.sets.len(), 2);
        assert_eq!(db.list_sets_by_map("Camp").await.unwrap().len(), 1);

        assert!(db.delete_match(game.id).await.unwrap());
        assert!(db.get_set(set.id).await.unwrap().is_none());
        assert!(db.list_sets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_requires_existing_match() {
        let db = test_db().await;
        let err = db.create_set(Uuid::new_v4(), "Camp").await.unwrap_err();
        match err {
            sqlx::Error::Database(e) => assert!(e.is_foreign_key_violation()),
            other => panic!("expected foreign key violation, got {other:?}"),
        }
    }
}

use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Database, Player, Team, TeamWithPlayers};

const TEAM_COLUMNS: &str = "id, team_name, elo, discord_id, created_at";
const PLAYER_COLUMNS: &str = "id, player_name, playfab_id, steam_id, team_id, created_at";

impl Database {
    // ── Team CRUD ─────────────────────────────────────────────────────

    pub async fn create_team(
        &self,
        team_name: &str,
        elo: i32,
        discord_id: Option<i64>,
    ) -> Result<Team, sqlx::Error> {
        sqlx::query_as::<_, Team>(&format!(
            "INSERT INTO teams (id, team_name, elo, discord_id, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {TEAM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(team_name)
        .bind(elo)
        .bind(discord_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_teams(&self) -> Result<Vec<TeamWithPlayers>, sqlx::Error> {
        let teams = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams ORDER BY team_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        let players = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE team_id IS NOT NULL ORDER BY player_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut rosters: HashMap<Uuid, Vec<Player>> = HashMap::new();
        for player in players {
            if let Some(team_id) = player.team_id {
                rosters.entry(team_id).or_default().push(player);
            }
        }

        Ok(teams
            .into_iter()
            .map(|team| {
                let players = rosters.remove(&team.id).unwrap_or_default();
                TeamWithPlayers { team, players }
            })
            .collect())
    }

    pub async fn get_team(&self, id: Uuid) -> Result<Option<TeamWithPlayers>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.with_roster(team).await
    }

    pub async fn get_team_by_name(
        &self,
        team_name: &str,
    ) -> Result<Option<TeamWithPlayers>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE team_name = ?"
        ))
        .bind(team_name)
        .fetch_optional(&self.pool)
        .await?;
        self.with_roster(team).await
    }

    pub async fn get_team_by_discord_id(
        &self,
        discord_id: i64,
    ) -> Result<Option<TeamWithPlayers>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE discord_id = ?"
        ))
        .bind(discord_id)
        .fetch_optional(&self.pool)
        .await?;
        self.with_roster(team).await
    }

    pub async fn update_team_name(
        &self,
        id: Uuid,
        team_name: &str,
    ) -> Result<Option<TeamWithPlayers>, sqlx::Error> {
        let result = sqlx::query("UPDATE teams SET team_name = ? WHERE id = ?")
            .bind(team_name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_team(id).await
    }

    pub async fn update_team_elo(
        &self,
        id: Uuid,
        elo: i32,
    ) -> Result<Option<TeamWithPlayers>, sqlx::Error> {
        let result = sqlx::query("UPDATE teams SET elo = ? WHERE id = ?")
            .bind(elo)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_team(id).await
    }

    pub async fn delete_team(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn with_roster(
        &self,
        team: Option<Team>,
    ) -> Result<Option<TeamWithPlayers>, sqlx::Error> {
        let Some(team) = team else {
            return Ok(None);
        };
        let players = self.list_team_players(team.id).await?;
        Ok(Some(TeamWithPlayers { team, players }))
    }

    // ── Player CRUD ───────────────────────────────────────────────────

    pub async fn create_player(
        &self,
        player_name: &str,
        playfab_id: &str,
        steam_id: Option<i64>,
        team_id: Option<Uuid>,
    ) -> Result<Player, sqlx::Error> {
        sqlx::query_as::<_, Player>(&format!(
            "INSERT INTO players (id, player_name, playfab_id, steam_id, team_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(player_name)
        .bind(playfab_id)
        .bind(steam_id)
        .bind(team_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_players(&self) -> Result<Vec<Player>, sqlx::Error> {
        sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY player_name"
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_team_players(&self, team_id: Uuid) -> Result<Vec<Player>, sqlx::Error> {
        sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE team_id = ? ORDER BY player_name"
        ))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_player(&self, id: Uuid) -> Result<Option<Player>, sqlx::Error> {
        sqlx::query_as::<_, Player>(&format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_player_by_name(&self, player_name: &str) -> Result<Option<Player>, sqlx::Error> {
        sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE player_name = ?"
        ))
        .bind(player_name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Move a player onto `team_id`, or off any team when `None`.
    pub async fn set_player_team(
        &self,
        player_id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE players SET team_id = ? WHERE id = ?")
            .bind(team_id)
            .bind(player_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_player(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM players WHERE id = ?")
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
    async fn test_team_crud() {
        let db = test_db().await;

        let team = db.create_team("Alpha", 1500, Some(42)).await.unwrap();
        assert_eq!(team.team_name, "Alpha");
        assert_eq!(team.elo, 1500);

        let by_name = db.get_team_by_name("Alpha").await.unwrap().unwrap();
        assert_eq!(by_name.team.id, team.id);
        assert!(by_name.players.is_empty());

        let by_discord = db.get_team_by_discord_id(42).await.unwrap().unwrap();
        assert_eq!(by_discord.team.id, team.id);

        let renamed = db.update_team_name(team.id, "Bravo").await.unwrap().unwrap();
        assert_eq!(renamed.team.team_name, "Bravo");

        let rated = db.update_team_elo(team.id, 1620).await.unwrap().unwrap();
        assert_eq!(rated.team.elo, 1620);

        assert!(db.delete_team(team.id).await.unwrap());
        assert!(db.get_team(team.id).await.unwrap().is_none());
        assert!(db
            .update_team_name(team.id, "Ghost")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_roster_follows_player_team() {
        let db = test_db().await;
        let team = db.create_team("Alpha", 1500, None).await.unwrap();
        let player = db
            .create_player("knight", "PF1", Some(76561198000000000), None)
            .await
            .unwrap();

        assert!(db.set_player_team(player.id, Some(team.id)).await.unwrap());
        let teams = db.list_teams().await.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].players.len(), 1);
        assert_eq!(teams[0].players[0].player_name, "knight");

        // Deleting the team frees the player rather than deleting it
        db.delete_team(team.id).await.unwrap();
        let player = db.get_player(player.id).await.unwrap().unwrap();
        assert!(player.team_id.is_none());
    }

    #[tokio::test]
    async fn test_player_lookup_and_delete() {
        let db = test_db().await;
        let player = db.create_player("knight", "PF1", None, None).await.unwrap();

        assert_eq!(
            db.get_player_by_name("knight").await.unwrap().unwrap().id,
            player.id
        );
        assert_eq!(db.list_players().await.unwrap().len(), 1);
        assert!(db.create_player("knight", "PF2", None, None).await.is_err());

        assert!(db.delete_player(player.id).await.unwrap());
        assert!(!db.delete_player(player.id).await.unwrap());
    }
}

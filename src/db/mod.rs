// Database access layer (SQLite via sqlx).

mod matches;
mod posts;
mod prefixes;
mod teams;
mod tokens;
mod users;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Token {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub team_name: String,
    pub elo: i32,
    pub discord_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A team as returned by the API: the row plus its current roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamWithPlayers {
    #[serde(flatten)]
    pub team: Team,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: Uuid,
    pub player_name: String,
    pub playfab_id: String,
    pub steam_id: Option<i64>,
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: Uuid,
    pub team1_id: Option<Uuid>,
    pub team2_id: Option<Uuid>,
    pub elo_calculated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchWithSets {
    #[serde(flatten)]
    pub game: Match,
    pub sets: Vec<Set>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Set {
    pub id: Uuid,
    pub match_id: Uuid,
    pub map: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prefix {
    pub id: Uuid,
    pub prefix: String,
    pub guild_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Every table the service owns, in dependency order.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT,
        password_hash TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tokens (
        id BLOB PRIMARY KEY NOT NULL,
        token TEXT NOT NULL UNIQUE,
        user_id BLOB NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        issued_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teams (
        id BLOB PRIMARY KEY NOT NULL,
        team_name TEXT NOT NULL UNIQUE,
        elo INTEGER NOT NULL DEFAULT 1500,
        discord_id INTEGER UNIQUE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS players (
        id BLOB PRIMARY KEY NOT NULL,
        player_name TEXT NOT NULL UNIQUE,
        playfab_id TEXT NOT NULL UNIQUE,
        steam_id INTEGER UNIQUE,
        team_id BLOB REFERENCES teams(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id)",
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        id BLOB PRIMARY KEY NOT NULL,
        team1_id BLOB REFERENCES teams(id) ON DELETE SET NULL,
        team2_id BLOB REFERENCES teams(id) ON DELETE SET NULL,
        elo_calculated INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_matches_team1 ON matches(team1_id)",
    "CREATE INDEX IF NOT EXISTS idx_matches_team2 ON matches(team2_id)",
    "CREATE INDEX IF NOT EXISTS idx_matches_created ON matches(created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS sets (
        id BLOB PRIMARY KEY NOT NULL,
        match_id BLOB NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
        map TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sets_match ON sets(match_id)",
    "CREATE INDEX IF NOT EXISTS idx_sets_map ON sets(map)",
    r#"
    CREATE TABLE IF NOT EXISTS prefixes (
        id BLOB PRIMARY KEY NOT NULL,
        prefix TEXT NOT NULL,
        guild_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        author_id BLOB REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL
    )
    "#,
];

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::with_acquire_timeout(database_url, Duration::from_secs(5)).await
    }

    pub async fn with_acquire_timeout(
        database_url: &str,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        // An in-memory database lives and dies with its connections
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Applied {} schema statements", MIGRATIONS.len());
        Ok(())
    }

    /// The underlying pool, for callers that need a raw connection.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

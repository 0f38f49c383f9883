// Application configuration, loaded from environment variables and CLI flags.

use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Address to bind the HTTP server to.
    pub host: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// HMAC secret used to sign bearer tokens.
    pub jwt_secret: String,
    /// Lifetime of an issued bearer token.
    pub token_ttl: chrono::Duration,
    /// Mark the session cookie `Secure` (set behind TLS).
    pub cookie_secure: bool,
    /// Login attempts allowed per username per minute.
    pub login_attempts_per_minute: usize,
    /// How long a request waits for a pooled connection before giving up.
    pub db_acquire_timeout: Duration,
    /// Account created on startup when no users exist yet.
    pub bootstrap: Option<BootstrapUser>,
}

#[derive(Debug, Clone)]
pub struct BootstrapUser {
    pub username: String,
    pub password: String,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:mordhau.db?mode=rwc`)
    /// - `HOST` - bind address (default: `0.0.0.0`)
    /// - `PORT` - HTTP server port (default: 8000)
    /// - `JWT_SECRET` - token signing secret
    /// - `TOKEN_EXPIRY_HOURS` - bearer token lifetime (default: 24)
    /// - `COOKIE_SECURE` - `true` to mark the session cookie secure
    /// - `LOGIN_ATTEMPTS_PER_MINUTE` - per-username login limit (default: 10)
    /// - `DB_ACQUIRE_TIMEOUT_SECS` - pool acquire timeout (default: 5)
    /// - `BOOTSTRAP_USERNAME` / `BOOTSTRAP_PASSWORD` - first account
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--database-url <URL>` - Override the database URL
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();

        let database_url = Self::parse_cli_value(&args, "--database-url")
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| "sqlite:mordhau.db?mode=rwc".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(&args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env_parse("PORT"))
            .unwrap_or(8000);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET is not set, using the development secret");
            "mordhau-dev-secret-change-in-production".to_string()
        });

        let token_ttl = chrono::Duration::hours(env_parse("TOKEN_EXPIRY_HOURS").unwrap_or(24));

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let login_attempts_per_minute = env_parse("LOGIN_ATTEMPTS_PER_MINUTE").unwrap_or(10);

        let db_acquire_timeout =
            Duration::from_secs(env_parse("DB_ACQUIRE_TIMEOUT_SECS").unwrap_or(5));

        let bootstrap = match (
            std::env::var("BOOTSTRAP_USERNAME"),
            std::env::var("BOOTSTRAP_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) => Some(BootstrapUser { username, password }),
            _ => None,
        };

        Config {
            database_url,
            host,
            port,
            jwt_secret,
            token_ttl,
            cookie_secure,
            login_attempts_per_minute,
            db_acquire_timeout,
            bootstrap,
        }
    }

    /// Configuration for tests: in-memory database, fixed secret.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            token_ttl: chrono::Duration::hours(1),
            cookie_secure: false,
            login_attempts_per_minute: 1000,
            db_acquire_timeout: Duration::from_secs(5),
            bootstrap: None,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_value() {
        let args: Vec<String> = ["bin", "--port", "9000", "--database-url", "sqlite::memory:"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(Config::parse_cli_value(&args, "--port"), Some("9000".into()));
        assert_eq!(
            Config::parse_cli_value(&args, "--database-url"),
            Some("sqlite::memory:".into())
        );
        assert_eq!(Config::parse_cli_value(&args, "--missing"), None);
    }

    #[test]
    fn test_flag_without_value_is_ignored() {
        let args: Vec<String> = ["bin", "--port"].iter().map(|s| s.to_string()).collect();
        assert_eq!(Config::parse_cli_value(&args, "--port"), None);
    }

    #[test]
    fn test_config_for_tests() {
        let config = Config::for_tests();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert!(config.bootstrap.is_none());
        assert_eq!(config.token_ttl, chrono::Duration::hours(1));
    }
}

/// Rate limits applied to the ratings endpoints, per client IP.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per minute across all ratings endpoints (default: `100`).
    pub ratings_per_minute: u32,
    /// Submissions allowed per window (default: `3`).
    pub submissions_per_window: u32,
    /// Length of the submission window in seconds (default: `900`).
    pub submission_window_secs: u64,
    /// Key limits on the first `X-Forwarded-For` entry instead of the socket
    /// address (default: `false`). Enable only behind a proxy that sets it.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ratings_per_minute: 100,
            submissions_per_window: 3,
            submission_window_secs: 15 * 60,
            trust_forwarded_for: false,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// PostgreSQL connection string (required).
    pub database_url: String,
    /// Maximum pool size (default: `10`).
    pub db_max_connections: u32,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Apply embedded migrations at startup (default: `true`).
    pub run_migrations: bool,
    pub rate_limits: RateLimitConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: &str) -> T {
    std::env::var(key)
        .unwrap_or_else(|_| default.into())
        .parse()
        .unwrap_or_else(|_| panic!("{key} has an invalid value"))
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `HOST`                          | `0.0.0.0`               |
    /// | `PORT`                          | `3001`                  |
    /// | `DATABASE_URL`                  | required                |
    /// | `DB_MAX_CONNECTIONS`            | `10`                    |
    /// | `CORS_ORIGINS`                  | `http://localhost:3000` |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                    |
    /// | `RUN_MIGRATIONS`                | `true`                  |
    /// | `RATINGS_RATE_LIMIT_PER_MINUTE` | `100`                   |
    /// | `SUBMIT_RATE_LIMIT`             | `3`                     |
    /// | `SUBMIT_RATE_WINDOW_SECS`       | `900`                   |
    /// | `TRUST_FORWARDED_FOR`           | `false`                 |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port: env_or("PORT", "3001"),
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", "10"),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", "30"),
            run_migrations: env_or("RUN_MIGRATIONS", "true"),
            rate_limits: RateLimitConfig {
                ratings_per_minute: env_or("RATINGS_RATE_LIMIT_PER_MINUTE", "100"),
                submissions_per_window: env_or("SUBMIT_RATE_LIMIT", "3"),
                submission_window_secs: env_or("SUBMIT_RATE_WINDOW_SECS", "900"),
                trust_forwarded_for: env_or("TRUST_FORWARDED_FOR", "false"),
            },
        }
    }
}

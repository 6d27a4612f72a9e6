use anyhow::Context as _;

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// PostgreSQL connection string. Only the database commands need it.
    pub database_url: Option<String>,
    /// Pool size for database commands (default: `5`).
    pub db_max_connections: u32,
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default |
    /// |----------------------|---------|
    /// | `DATABASE_URL`       | unset   |
    /// | `DB_MAX_CONNECTIONS` | `5`     |
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let db_max_connections = parse_max_connections(std::env::var("DB_MAX_CONNECTIONS").ok())?;
        Ok(Self {
            database_url,
            db_max_connections,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set for database commands")
    }
}

fn parse_max_connections(raw: Option<String>) -> anyhow::Result<u32> {
    match raw {
        None => Ok(5),
        Some(raw) => {
            let n: u32 = raw
                .trim()
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS must be a positive integer, got '{raw}'"))?;
            anyhow::ensure!(n > 0, "DB_MAX_CONNECTIONS must be at least 1");
            Ok(n)
        }
    }
}

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8000;
pub const DEFAULT_DB_WAIT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_DB_WAIT_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Which `SchemaMigrator` implementation the orchestrator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigratorKind {
    /// Migrations compiled into the binary and applied through sqlx.
    Embedded,
    /// Shell out to the `sqlx` command-line tool.
    Cli,
}

impl FromStr for MigratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" => Ok(MigratorKind::Embedded),
            "cli" => Ok(MigratorKind::Cli),
            other => Err(format!("expected `embedded` or `cli`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    /// Development mode: single worker, immediate shutdown so a file watcher
    /// can restart the process without waiting on in-flight requests.
    pub server_reload: bool,
    pub db_wait_max_attempts: u32,
    pub db_wait_interval: Duration,
    pub migrator: MigratorKind,
    pub migrations_dir: PathBuf,
    pub migration_workdir: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Call `dotenv::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let db_wait_max_attempts =
            parse_or(&lookup, "DB_WAIT_MAX_ATTEMPTS", DEFAULT_DB_WAIT_MAX_ATTEMPTS)?;
        if db_wait_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_WAIT_MAX_ATTEMPTS",
                value: "0".into(),
                reason: "at least one attempt is required".into(),
            });
        }

        Ok(Self {
            database_url,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", DEFAULT_SERVER_PORT)?,
            server_reload: parse_or(&lookup, "SERVER_RELOAD", true)?,
            db_wait_max_attempts,
            db_wait_interval: Duration::from_secs(parse_or(
                &lookup,
                "DB_WAIT_INTERVAL_SECS",
                DEFAULT_DB_WAIT_INTERVAL_SECS,
            )?),
            migrator: parse_or(&lookup, "MIGRATOR", MigratorKind::Embedded)?,
            migrations_dir: lookup("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("migrations")),
            migration_workdir: lookup("MIGRATION_WORKDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://test")]))
            .unwrap();

        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 8000);
        assert!(config.server_reload);
        assert_eq!(config.db_wait_max_attempts, 60);
        assert_eq!(config.db_wait_interval, Duration::from_secs(2));
        assert_eq!(config.migrator, MigratorKind::Embedded);
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "3000"),
            ("SERVER_RELOAD", "false"),
            ("DB_WAIT_MAX_ATTEMPTS", "5"),
            ("DB_WAIT_INTERVAL_SECS", "1"),
            ("MIGRATOR", "CLI"),
            ("MIGRATION_WORKDIR", "/app"),
        ]))
        .unwrap();

        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.server_port, 3000);
        assert!(!config.server_reload);
        assert_eq!(config.db_wait_max_attempts, 5);
        assert_eq!(config.db_wait_interval, Duration::from_secs(1));
        assert_eq!(config.migrator, MigratorKind::Cli);
        assert_eq!(config.migration_workdir, PathBuf::from("/app"));
    }

    #[test]
    fn test_config_missing_database_url() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("SERVER_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SERVER_PORT", .. }));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("DB_WAIT_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "DB_WAIT_MAX_ATTEMPTS", .. }
        ));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("MIGRATOR", "alembic"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MIGRATOR", .. }));
    }
}

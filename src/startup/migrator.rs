//! Schema migration capability and its two implementations.
//!
//! The orchestrator only sees [`SchemaMigrator`]. [`EmbeddedMigrator`] applies
//! the `migrations/` directory compiled into the binary; [`CommandMigrator`]
//! drives the `sqlx` command-line tool against the same directory on disk.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;

use crate::error::StartupError;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

lazy_static! {
    static ref ANSI_ESCAPE: Regex = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
}

/// Applied-revision state of the database schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionInfo {
    /// Highest applied migration version, `None` on a fresh database.
    pub current: Option<i64>,
    /// Highest version known to the migrator.
    pub latest: Option<i64>,
    pub pending: usize,
}

impl RevisionInfo {
    pub fn is_at_head(&self) -> bool {
        self.pending == 0
    }
}

impl fmt::Display for RevisionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<i64>| v.map_or_else(|| "none".to_string(), |v| v.to_string());
        write!(
            f,
            "current revision {}, latest {}, {} pending",
            show(self.current),
            show(self.latest),
            self.pending
        )
    }
}

/// Result of a successful upgrade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutput {
    /// Versions applied by this run, in order. Empty for the CLI migrator,
    /// which only reports through `log`.
    pub applied: Vec<i64>,
    /// Human-readable output of the run.
    pub log: String,
}

#[async_trait]
pub trait SchemaMigrator: Send + Sync {
    async fn current_revision(&self) -> Result<RevisionInfo, StartupError>;
    async fn upgrade_to_latest(&self) -> Result<MigrationOutput, StartupError>;
}

/// Applies the migrations embedded at compile time.
#[derive(Debug, Clone)]
pub struct EmbeddedMigrator {
    database_url: String,
}

impl EmbeddedMigrator {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    async fn connect(&self) -> Result<PgPool, StartupError> {
        PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.database_url)
            .await
            .map_err(|e| StartupError::Migrator(format!("cannot connect to database: {}", e)))
    }
}

fn query_failed(e: sqlx::Error) -> StartupError {
    StartupError::Migrator(format!("cannot read migration history: {}", e))
}

/// Up-migrations of `migrator` that are not in `applied`, in version order.
fn pending_versions(migrator: &Migrator, applied: &HashSet<i64>) -> Vec<(i64, String)> {
    migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| !applied.contains(&m.version))
        .map(|m| (m.version, m.description.to_string()))
        .collect()
}

fn latest_version(migrator: &Migrator) -> Option<i64> {
    migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
        .max()
}

fn revision_info(migrator: &Migrator, applied: &HashSet<i64>) -> RevisionInfo {
    RevisionInfo {
        current: applied.iter().copied().max(),
        latest: latest_version(migrator),
        pending: pending_versions(migrator, applied).len(),
    }
}

/// Versions recorded in `_sqlx_migrations`. A database without the table has
/// applied nothing; the table is left for the migrator to create.
async fn applied_versions(pool: &PgPool) -> Result<HashSet<i64>, StartupError> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await
            .map_err(query_failed)?;
    if !exists {
        return Ok(HashSet::new());
    }

    let versions: Vec<(i64,)> = sqlx::query_as("SELECT version FROM _sqlx_migrations")
        .fetch_all(pool)
        .await
        .map_err(query_failed)?;
    Ok(versions.into_iter().map(|(version,)| version).collect())
}

#[async_trait]
impl SchemaMigrator for EmbeddedMigrator {
    async fn current_revision(&self) -> Result<RevisionInfo, StartupError> {
        let pool = self.connect().await?;
        let applied = applied_versions(&pool).await;
        pool.close().await;

        Ok(revision_info(&MIGRATOR, &applied?))
    }

    async fn upgrade_to_latest(&self) -> Result<MigrationOutput, StartupError> {
        let pool = self.connect().await?;
        let outcome = async {
            let pending = pending_versions(&MIGRATOR, &applied_versions(&pool).await?);
            MIGRATOR.run(&pool).await?;
            Ok::<_, StartupError>(pending)
        }
        .await;
        pool.close().await;
        let pending = outcome?;

        let log = if pending.is_empty() {
            "no pending migrations".to_string()
        } else {
            pending
                .iter()
                .map(|(version, description)| format!("applied {} {}", version, description))
                .collect::<Vec<_>>()
                .join("\n")
        };
        Ok(MigrationOutput {
            applied: pending.into_iter().map(|(version, _)| version).collect(),
            log,
        })
    }
}

/// Runs `sqlx migrate info` / `sqlx migrate run` as child processes.
///
/// The child gets `DATABASE_URL` and runs in `workdir`; `--source` points it
/// at the migrations directory. Output is captured, never inherited.
#[derive(Debug, Clone)]
pub struct CommandMigrator {
    program: String,
    database_url: String,
    source_dir: PathBuf,
    workdir: PathBuf,
}

impl CommandMigrator {
    pub fn new(
        database_url: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: "sqlx".to_string(),
            database_url: database_url.into(),
            source_dir: source_dir.into(),
            workdir: workdir.into(),
        }
    }

    /// Overrides the executable, `sqlx` by default.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, subcommand: &str) -> Result<Output, StartupError> {
        let output = Command::new(&self.program)
            .args(["migrate", subcommand, "--source"])
            .arg(&self.source_dir)
            .current_dir(&self.workdir)
            .env("DATABASE_URL", &self.database_url)
            .env("NO_COLOR", "1")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                StartupError::Migrator(format!(
                    "failed to invoke `{} migrate {}`: {}",
                    self.program, subcommand, e
                ))
            })?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(StartupError::MigrationFailed {
                status: output.status.to_string(),
                output: captured_output(&output),
            })
        }
    }
}

/// Stderr when the tool wrote any, stdout otherwise.
fn captured_output(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    }
}

/// Parses `sqlx migrate info` lines of the form `<version>/<state> <description>`.
pub fn parse_migrate_info(stdout: &str) -> RevisionInfo {
    let mut info = RevisionInfo::default();
    for line in stdout.lines() {
        let line = ANSI_ESCAPE.replace_all(line.trim(), "");
        let Some((version, rest)) = line.split_once('/') else {
            continue;
        };
        let Ok(version) = version.trim().parse::<i64>() else {
            continue;
        };
        let state = rest.split_whitespace().next().unwrap_or_default();

        info.latest = info.latest.max(Some(version));
        match state {
            "installed" => info.current = info.current.max(Some(version)),
            "pending" => info.pending += 1,
            _ => {}
        }
    }
    info
}

#[async_trait]
impl SchemaMigrator for CommandMigrator {
    async fn current_revision(&self) -> Result<RevisionInfo, StartupError> {
        let output = self.run("info").await?;
        Ok(parse_migrate_info(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn upgrade_to_latest(&self) -> Result<MigrationOutput, StartupError> {
        let output = self.run("run").await?;
        Ok(MigrationOutput {
            applied: Vec::new(),
            log: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        })
    }
}

//! Process bootstrap.
//!
//! [`Startup::run`] walks four phases in order and never goes back:
//!
//! 1. **wait for the database**: probe connectivity until it answers, within a
//!    bounded number of attempts;
//! 2. **check migration state**: log the applied revision (informational only);
//! 3. **apply migrations**: upgrade the schema to the latest revision;
//! 4. **serve**: hand over to the HTTP server until it exits.
//!
//! Only the first phase retries. Any failure before serving is returned as a
//! [`StartupError`] and the process exits with status 1.

pub mod migrator;
pub mod probe;
pub mod retry;
pub mod server;

use std::fmt;
use std::time::Duration;

use crate::config::{Config, MigratorKind};
use crate::error::StartupError;

pub use migrator::{CommandMigrator, EmbeddedMigrator, MigrationOutput, RevisionInfo, SchemaMigrator};
pub use probe::{PostgresProbe, ReadinessProbe};
pub use retry::{retry, Backoff, RetryPolicy, Sleeper, TokioSleeper};
pub use server::{ActixLauncher, ServeOptions, ServerLauncher};

/// Probe errors are truncated to this many characters in progress lines.
const PROBE_ERROR_PREVIEW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitDb,
    CheckMigrationState,
    ApplyMigrations,
    Serve,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::WaitDb => "wait for database",
            Phase::CheckMigrationState => "check migration state",
            Phase::ApplyMigrations => "apply migrations",
            Phase::Serve => "serve",
        })
    }
}

/// Policy knobs of the bootstrap, independent of the collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct StartupSettings {
    pub db_wait: RetryPolicy,
    pub serve: ServeOptions,
}

impl StartupSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            db_wait: RetryPolicy::fixed(config.db_wait_max_attempts, config.db_wait_interval),
            serve: ServeOptions {
                host: config.server_host.clone(),
                port: config.server_port,
                reload: config.server_reload,
            },
        }
    }
}

impl Default for StartupSettings {
    /// 60 attempts two seconds apart, then `0.0.0.0:8000` with reload.
    fn default() -> Self {
        Self {
            db_wait: RetryPolicy::fixed(
                crate::config::DEFAULT_DB_WAIT_MAX_ATTEMPTS,
                Duration::from_secs(crate::config::DEFAULT_DB_WAIT_INTERVAL_SECS),
            ),
            serve: ServeOptions {
                host: crate::config::DEFAULT_SERVER_HOST.to_string(),
                port: crate::config::DEFAULT_SERVER_PORT,
                reload: true,
            },
        }
    }
}

/// The bootstrap sequence over its four collaborators.
pub struct Startup<P, M, L, S> {
    pub probe: P,
    pub migrator: M,
    pub launcher: L,
    pub sleeper: S,
    pub settings: StartupSettings,
}

impl<P, M, L, S> Startup<P, M, L, S>
where
    P: ReadinessProbe,
    M: SchemaMigrator,
    L: ServerLauncher,
    S: Sleeper,
{
    pub async fn run(&self) -> Result<(), StartupError> {
        log::info!("starting application");
        self.wait_for_database().await?;
        self.check_migration_state().await;
        self.apply_migrations().await?;
        self.serve().await
    }

    async fn wait_for_database(&self) -> Result<(), StartupError> {
        let policy = &self.settings.db_wait;
        log::info!("[{}] waiting for the database to accept connections", Phase::WaitDb);

        let outcome = retry(
            policy,
            &self.sleeper,
            |_| self.probe.probe(),
            |attempt, err| {
                log::info!(
                    "[{}] attempt {}/{}: database not ready: {}",
                    Phase::WaitDb,
                    attempt,
                    policy.max_attempts(),
                    preview(&err.to_string())
                );
            },
        )
        .await;

        match outcome {
            Ok(done) => {
                log::info!(
                    "[{}] database available after {} attempt(s)",
                    Phase::WaitDb,
                    done.attempts
                );
                Ok(())
            }
            Err(exhausted) => {
                log::error!(
                    "[{}] timed out after {} attempts",
                    Phase::WaitDb,
                    exhausted.attempts
                );
                Err(StartupError::DatabaseUnavailable {
                    attempts: exhausted.attempts,
                    source: exhausted.last_error,
                })
            }
        }
    }

    /// Logs the schema state. Never fails and never skips the upgrade.
    async fn check_migration_state(&self) {
        log::info!("[{}] querying applied revision", Phase::CheckMigrationState);
        match self.migrator.current_revision().await {
            Ok(info) if info.is_at_head() => {
                log::info!("[{}] schema is up to date ({})", Phase::CheckMigrationState, info)
            }
            Ok(info) => log::info!(
                "[{}] schema needs upgrading ({})",
                Phase::CheckMigrationState,
                info
            ),
            Err(e) => log::warn!(
                "[{}] could not determine revision, continuing: {}",
                Phase::CheckMigrationState,
                e
            ),
        }
    }

    async fn apply_migrations(&self) -> Result<(), StartupError> {
        log::info!("[{}] upgrading schema to latest revision", Phase::ApplyMigrations);
        match self.migrator.upgrade_to_latest().await {
            Ok(output) => {
                log::info!(
                    "[{}] migrations applied ({} new)",
                    Phase::ApplyMigrations,
                    output.applied.len()
                );
                if !output.log.is_empty() {
                    log::info!("[{}] output:\n{}", Phase::ApplyMigrations, output.log);
                }
                Ok(())
            }
            Err(e) => {
                log::error!("[{}] {}", Phase::ApplyMigrations, e);
                Err(e)
            }
        }
    }

    async fn serve(&self) -> Result<(), StartupError> {
        log::info!("[{}] launching HTTP server", Phase::Serve);
        self.launcher.serve(self.settings.serve.clone()).await
    }
}

fn preview(message: &str) -> String {
    if message.chars().count() <= PROBE_ERROR_PREVIEW {
        message.to_string()
    } else {
        let cut: String = message.chars().take(PROBE_ERROR_PREVIEW).collect();
        format!("{}...", cut)
    }
}

/// The migrator selected by configuration.
pub fn migrator_from_config(config: &Config) -> Box<dyn SchemaMigrator> {
    match config.migrator {
        MigratorKind::Embedded => Box::new(EmbeddedMigrator::new(config.database_url.clone())),
        MigratorKind::Cli => Box::new(CommandMigrator::new(
            config.database_url.clone(),
            config.migrations_dir.clone(),
            config.migration_workdir.clone(),
        )),
    }
}

#[async_trait::async_trait]
impl<T: SchemaMigrator + ?Sized> SchemaMigrator for Box<T> {
    async fn current_revision(&self) -> Result<RevisionInfo, StartupError> {
        (**self).current_revision().await
    }

    async fn upgrade_to_latest(&self) -> Result<MigrationOutput, StartupError> {
        (**self).upgrade_to_latest().await
    }
}

/// Wires the production collaborators from configuration.
pub fn from_config(
    config: &Config,
) -> Startup<PostgresProbe, Box<dyn SchemaMigrator>, ActixLauncher, TokioSleeper> {
    Startup {
        probe: PostgresProbe::new(config.database_url.clone()),
        migrator: migrator_from_config(config),
        launcher: ActixLauncher::new(config.database_url.clone(), config.database_max_connections),
        sleeper: TokioSleeper,
        settings: StartupSettings::from_config(config),
    }
}

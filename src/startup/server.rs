use actix_web::HttpServer;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;

use crate::app::build_app;
use crate::error::StartupError;

/// Where and how the HTTP server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    /// Development mode: one worker and no graceful-shutdown wait. The process
    /// never reloads itself; an external watcher (`cargo watch -x run`) restarts it.
    pub reload: bool,
}

/// Starts the HTTP server and resolves when it stops.
#[async_trait(?Send)]
pub trait ServerLauncher {
    async fn serve(&self, options: ServeOptions) -> Result<(), StartupError>;
}

/// Serves [`build_app`] with actix-web over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct ActixLauncher {
    database_url: String,
    max_connections: u32,
}

impl ActixLauncher {
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
        }
    }
}

#[async_trait(?Send)]
impl ServerLauncher for ActixLauncher {
    async fn serve(&self, options: ServeOptions) -> Result<(), StartupError> {
        // the database answered the readiness probe; connect on first use
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_lazy(&self.database_url)
            .map_err(StartupError::Pool)?;

        let mut server = HttpServer::new(move || build_app(pool.clone()));
        if options.reload {
            log::info!("development mode: single worker, immediate shutdown");
            server = server.workers(1).shutdown_timeout(0);
        }

        log::info!(
            "serving on http://{}:{} (docs at /docs)",
            options.host,
            options.port
        );
        server
            .bind((options.host.as_str(), options.port))?
            .run()
            .await?;
        Ok(())
    }
}

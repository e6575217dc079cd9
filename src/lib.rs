#![doc = "The `task_manager` library crate."]
#![doc = ""]
#![doc = "Holds the HTTP application (authentication and task route groups, CORS,"]
#![doc = "API documentation), its domain models and errors, and the startup"]
#![doc = "orchestrator that the `task-manager` binary runs before serving."]
#![recursion_limit = "256"]

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod startup;

pub use app::build_app;
pub use config::Config;
pub use error::{AppError, StartupError};

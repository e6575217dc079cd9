pub mod auth;
pub mod docs;
pub mod health;
pub mod tasks;

use actix_web::web;

/// Prefix of the authentication route group, relative to `/api`.
pub const AUTH_SCOPE: &str = "/auth";
/// Prefix of the task route group, relative to `/api`.
pub const TASKS_SCOPE: &str = "/tasks";

/// Registers the two route groups. Mounted under `/api`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(AUTH_SCOPE)
            .service(auth::login)
            .service(auth::register)
            .service(auth::me),
    )
    .service(
        web::scope(TASKS_SCOPE)
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::update_task_status)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}

/// Documentation endpoints, mounted at the application root.
pub fn docs_config(cfg: &mut web::ServiceConfig) {
    cfg.service(docs::swagger_ui)
        .service(docs::redoc)
        .service(docs::openapi_json);
}

//! Application assembly.
//!
//! [`build_app`] is the single place the HTTP application is put together: API
//! metadata, the `/api` scope with the authentication and task route groups,
//! the documentation endpoints, and the cross-origin policy. `HttpServer`
//! calls it once per worker.

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    error::{JsonPayloadError, QueryPayloadError},
    middleware::Logger,
    web, App, Error, HttpRequest,
};
use sqlx::PgPool;

use crate::{auth::AuthMiddleware, error::AppError, routes};

pub const API_TITLE: &str = "Task Manager API";
pub const API_DESCRIPTION: &str = "API for task management";
pub const API_VERSION: &str = "1.0.0";

/// Origins allowed to make credentialed cross-origin requests.
pub const ALLOWED_ORIGINS: [&str; 1] = ["http://localhost:3000"];

pub const ALLOWED_METHODS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Cross-origin policy: the listed origins and methods, any request header,
/// credentials allowed.
pub fn cors() -> Cors {
    ALLOWED_ORIGINS
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(ALLOWED_METHODS)
        .allow_any_header()
        .supports_credentials()
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    AppError::BadRequest(err.to_string()).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Builds the application around a database pool.
pub fn build_app(
    pool: PgPool,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(pool))
        .app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .wrap(cors())
        .wrap(Logger::default().exclude("/health"))
        .service(routes::health::health)
        .configure(routes::docs_config)
        .service(
            web::scope("/api")
                .wrap(AuthMiddleware)
                .configure(routes::config),
        )
        .default_service(web::to(|| async {
            Err::<actix_web::HttpResponse, _>(AppError::NotFound("Not Found".into()))
        }))
}

use std::process::ExitCode;

use task_manager::{startup, Config, StartupError};

#[actix_web::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", StartupError::from(e));
            return ExitCode::FAILURE;
        }
    };

    match startup::from_config(&config).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(StartupError::Server(e)) => {
            log::error!("server stopped with an error: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("startup aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

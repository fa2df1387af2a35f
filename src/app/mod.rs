mod config;
pub mod coordinator;
pub mod discovery;
mod error;
mod logging;
pub mod onboarding;
mod runtime;
pub mod services;

pub use config::{AppConfig, ScanInterval};
pub use error::AppError;

/// Starts the refresh coordinator and the read API.
pub fn run() -> Result<(), AppError> {
    let dotenv = dotenvy::dotenv();
    logging::init()?;
    report_dotenv(dotenv);

    let config = AppConfig::from_env()?;

    tracing::info!(
        api_url = %config.api_url,
        scan_interval_minutes = config.scan_interval.minutes(),
        replay_file = ?config.replay_file,
        http_bind = %config.http_bind,
        "application bootstrap initialized"
    );

    runtime::run(config)
}

/// Checks the configured account identifier and returns the entry title.
pub fn run_setup() -> Result<String, AppError> {
    let dotenv = dotenvy::dotenv();
    logging::init()?;
    report_dotenv(dotenv);

    let config = AppConfig::from_env()?;
    runtime::run_setup(config)
}

fn report_dotenv(result: Result<std::path::PathBuf, dotenvy::Error>) {
    match result {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!(error = %error, "failed to load environment file"),
    }
}

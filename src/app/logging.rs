use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

const DEFAULT_DIRECTIVES: &str = "info,hyper_util=warn,reqwest=warn,actix_server=warn";

pub fn init() -> Result<(), AppError> {
    fmt()
        .with_env_filter(build_filter(std::env::var("RUST_LOG").ok()))
        .with_target(true)
        .try_init()
        .map_err(AppError::logging_init)
}

fn build_filter(directives: Option<String>) -> EnvFilter {
    directives
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

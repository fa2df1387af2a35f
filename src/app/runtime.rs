use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use tokio_util::sync::CancellationToken;

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::mojdomek_http::{AccountClient, MojDomekHttpClient};
use crate::adapters::replay_file::ReplayFileClient;
use crate::app::config::AppConfig;
use crate::app::coordinator::RefreshCoordinator;
use crate::app::discovery;
use crate::app::error::AppError;
use crate::app::onboarding::onboard;
use crate::app::services::CoordinatorSensorService;
use crate::domain::clock::SystemClock;

pub fn run(config: AppConfig) -> Result<(), AppError> {
    actix_web::rt::System::new().block_on(async move {
        match config.replay_file.clone() {
            Some(path) => {
                let client = ReplayFileClient::from_file(&path).map_err(AppError::runtime)?;
                let coordinator = coordinator_for(&config, client);
                serve(config, coordinator).await
            }
            None => {
                let client = MojDomekHttpClient::new(&config.api_url).map_err(AppError::runtime)?;
                let coordinator = coordinator_for(&config, client);
                serve(config, coordinator).await
            }
        }
    })
}

pub fn run_setup(config: AppConfig) -> Result<String, AppError> {
    actix_web::rt::System::new().block_on(async move {
        let onboarded = match &config.replay_file {
            Some(path) => {
                let client = ReplayFileClient::from_file(path).map_err(AppError::runtime)?;
                onboard(&client, &config.api_id).await?
            }
            None => {
                let client = MojDomekHttpClient::new(&config.api_url).map_err(AppError::runtime)?;
                onboard(&client, &config.api_id).await?
            }
        };

        Ok::<_, AppError>(onboarded.title)
    })
}

fn coordinator_for<C: AccountClient>(
    config: &AppConfig,
    client: C,
) -> Arc<RefreshCoordinator<C, SystemClock>> {
    Arc::new(RefreshCoordinator::new(
        client,
        SystemClock,
        config.api_id.clone(),
        config.scan_interval.as_duration(),
    ))
}

async fn serve<C: AccountClient>(
    config: AppConfig,
    coordinator: Arc<RefreshCoordinator<C, SystemClock>>,
) -> Result<(), AppError> {
    let events = coordinator.subscribe();

    match coordinator.first_refresh().await {
        Ok(snapshot) => tracing::info!(
            locations = snapshot.locations.len(),
            active = snapshot.active,
            "first refresh completed"
        ),
        Err(error) => tracing::warn!(
            error = %error,
            "first refresh failed, serving an empty cache until the next cycle"
        ),
    }

    let api_state = ApiState {
        sensor_queries: CoordinatorSensorService::new(coordinator.handle()),
    };

    tracing::info!(
        bind = %config.http_bind,
        interval_minutes = config.scan_interval.minutes(),
        "http server starting"
    );

    let server = HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST"]),
            )
            .app_data(web::Data::new(api_state.clone()))
            .configure(configure_routes)
    })
    .bind(&config.http_bind)
    .map_err(AppError::runtime)?;

    let shutdown = CancellationToken::new();
    let refresh_loop = actix_web::rt::spawn({
        let coordinator = Arc::clone(&coordinator);
        let shutdown = shutdown.clone();
        async move { coordinator.run(shutdown).await }
    });
    let discovery_task = actix_web::rt::spawn(discovery::follow(events, shutdown.clone()));

    let server_result = server.run().await;

    shutdown.cancel();
    if refresh_loop.await.is_err() {
        return Err(AppError::runtime("refresh loop task panicked"));
    }
    if discovery_task.await.is_err() {
        return Err(AppError::runtime("sensor discovery task panicked"));
    }

    server_result.map_err(AppError::runtime)
}

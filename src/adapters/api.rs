use actix_web::{HttpResponse, Responder, get, post, web};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::app::coordinator::{CoordinatorState, RefreshRequest};
use crate::app::services::{
    CoordinatorSensorService, RefreshCommandHandler, SensorQueryHandler, ServiceError,
};
use crate::domain::sensors::{
    DeviceInfo, LocationAttributes, LocationView, MetricCategory, MetricValue, SensorReading,
};

#[derive(Clone)]
pub struct ApiState {
    pub sensor_queries: CoordinatorSensorService,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SensorResponse {
    pub unique_id: String,
    pub name: String,
    pub location_id: String,
    pub metric: &'static str,
    pub unit: Option<&'static str>,
    pub category: MetricCategory,
    pub value: MetricValue,
}

impl From<SensorReading> for SensorResponse {
    fn from(reading: SensorReading) -> Self {
        Self {
            unique_id: reading.unique_id,
            name: reading.name,
            location_id: reading.location_id,
            metric: reading.metric,
            unit: reading.unit.map(|unit| unit.symbol()),
            category: reading.category,
            value: reading.value,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: String,
    pub sw_version: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributesResponse {
    pub location_id: String,
    pub max_capacity: Option<f64>,
    pub alarm_level: Option<f64>,
    pub direction: Option<String>,
    pub tank_type: Option<String>,
    pub address: Option<String>,
    pub town: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub device: DeviceResponse,
    pub attributes: AttributesResponse,
}

impl From<LocationView> for LocationResponse {
    fn from(view: LocationView) -> Self {
        let DeviceInfo {
            identifier,
            name,
            manufacturer,
            model,
            sw_version,
        } = view.device;
        let LocationAttributes {
            location_id,
            max_capacity,
            alarm_level,
            direction,
            tank_type,
            address,
            town,
        } = view.attributes;

        Self {
            device: DeviceResponse {
                identifier,
                name,
                manufacturer,
                model,
                sw_version,
            },
            attributes: AttributesResponse {
                location_id,
                max_capacity,
                alarm_level,
                direction,
                tank_type,
                address,
                town,
            },
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub name: String,
    pub active: bool,
    pub locations_count: usize,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub state: CoordinatorState,
    pub last_attempt_at: Option<String>,
    pub last_success_at: Option<String>,
    pub last_error: Option<String>,
    pub account: Option<AccountSummary>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(status_endpoint)
        .service(list_sensors_endpoint)
        .service(get_sensor_endpoint)
        .service(list_locations_endpoint)
        .service(refresh_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/status")]
async fn status_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let view = state.sensor_queries.status();

    HttpResponse::Ok().json(StatusResponse {
        state: view.state,
        last_attempt_at: view.last_attempt_at.map(format_timestamp),
        last_success_at: view.last_success_at.map(format_timestamp),
        last_error: view.last_error.map(|error| error.to_string()),
        account: view.snapshot.map(|snapshot| AccountSummary {
            name: snapshot.display_name().trim().to_string(),
            active: snapshot.active,
            locations_count: snapshot.locations.len(),
        }),
    })
}

#[get("/sensors")]
async fn list_sensors_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.sensor_queries.list_sensors() {
        Ok(readings) => {
            let mapped: Vec<SensorResponse> =
                readings.into_iter().map(SensorResponse::from).collect();
            HttpResponse::Ok().json(mapped)
        }
        Err(error) => service_error_response(error),
    }
}

#[get("/sensors/{location_id}/{metric}")]
async fn get_sensor_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (location_id, metric) = path.into_inner();

    match state.sensor_queries.get_sensor(&location_id, &metric) {
        Ok(reading) => HttpResponse::Ok().json(SensorResponse::from(reading)),
        Err(error) => service_error_response(error),
    }
}

#[get("/locations")]
async fn list_locations_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.sensor_queries.list_locations() {
        Ok(views) => {
            let mapped: Vec<LocationResponse> =
                views.into_iter().map(LocationResponse::from).collect();
            HttpResponse::Ok().json(mapped)
        }
        Err(error) => service_error_response(error),
    }
}

#[post("/refresh")]
async fn refresh_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.sensor_queries.request_refresh() {
        RefreshRequest::Accepted => HttpResponse::Accepted().json(serde_json::json!({
            "status": "refresh requested"
        })),
        RefreshRequest::AlreadyInFlight => HttpResponse::Conflict().json(serde_json::json!({
            "error": "refresh already in progress"
        })),
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    let body = serde_json::json!({ "error": error.to_string() });
    match error {
        ServiceError::NoSnapshot => HttpResponse::ServiceUnavailable().json(body),
        ServiceError::UnknownMetric(_) | ServiceError::LocationNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, body::to_bytes, dev::ServiceResponse, http::StatusCode, test, web};

    use crate::adapters::mojdomek_http::{AccountClient, FetchError};
    use crate::app::coordinator::{CoordinatorState, RefreshCoordinator};
    use crate::app::services::CoordinatorSensorService;
    use crate::test_support::{FixedClock, GatedClient, ScriptedClient, sample_account_json};

    use super::{ApiState, configure_routes};

    fn build_coordinator<C: AccountClient>(client: C) -> RefreshCoordinator<C, FixedClock> {
        RefreshCoordinator::new(
            client,
            FixedClock::default(),
            "abc123",
            std::time::Duration::from_secs(15 * 60),
        )
    }

    fn state_for<C: AccountClient>(coordinator: &RefreshCoordinator<C, FixedClock>) -> ApiState {
        ApiState {
            sensor_queries: CoordinatorSensorService::new(coordinator.handle()),
        }
    }

    async fn read_json(resp: ServiceResponse) -> serde_json::Value {
        let body = to_bytes(resp.into_body())
            .await
            .expect("body should be readable");
        serde_json::from_slice(&body).expect("body should be json")
    }

    async fn get(state: ApiState, uri: &str) -> ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri(uri).to_request();
        test::call_service(&app, req).await
    }

    #[actix_web::test]
    async fn health_endpoint_returns_ok() {
        let coordinator = build_coordinator(ScriptedClient::default());
        let resp = get(state_for(&coordinator), "/health").await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn sensors_are_unavailable_before_first_snapshot() {
        let coordinator = build_coordinator(ScriptedClient::default());

        let resp = get(state_for(&coordinator), "/sensors").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = get(state_for(&coordinator), "/locations").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn lists_every_sensor_of_cached_snapshot() {
        let coordinator = build_coordinator(ScriptedClient::new(vec![Ok(sample_account_json())]));
        coordinator
            .first_refresh()
            .await
            .expect("first refresh should succeed");

        let resp = get(state_for(&coordinator), "/sensors").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = read_json(resp).await;
        let items = json.as_array().expect("response should be an array");
        assert_eq!(items.len(), 18);
        assert_eq!(items[0]["uniqueId"], "A1_percent");
        assert_eq!(items[0]["name"], "Szambo Tank Level");
        assert_eq!(items[0]["unit"], "%");
        assert_eq!(items[0]["category"], "tank_level");
        assert_eq!(items[0]["value"], 42.0);
    }

    #[actix_web::test]
    async fn single_sensor_reports_unknown_for_missing_field() {
        let coordinator = build_coordinator(ScriptedClient::new(vec![Ok(sample_account_json())]));
        coordinator
            .first_refresh()
            .await
            .expect("first refresh should succeed");

        let resp = get(state_for(&coordinator), "/sensors/B7/temperature").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = read_json(resp).await;
        assert_eq!(json["uniqueId"], "B7_temperature");
        assert_eq!(json["unit"], "°C");
        assert_eq!(json["value"], "unknown");
    }

    #[actix_web::test]
    async fn unknown_metric_or_location_returns_404() {
        let coordinator = build_coordinator(ScriptedClient::new(vec![Ok(sample_account_json())]));
        coordinator
            .first_refresh()
            .await
            .expect("first refresh should succeed");

        let resp = get(state_for(&coordinator), "/sensors/A1/humidity").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = get(state_for(&coordinator), "/sensors/Z9/percent").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = read_json(resp).await;
        assert_eq!(json["error"], "unknown location: Z9");
    }

    #[actix_web::test]
    async fn locations_expose_device_and_attributes() {
        let coordinator = build_coordinator(ScriptedClient::new(vec![Ok(sample_account_json())]));
        coordinator
            .first_refresh()
            .await
            .expect("first refresh should succeed");

        let resp = get(state_for(&coordinator), "/locations").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = read_json(resp).await;
        assert_eq!(json[0]["device"]["manufacturer"], "MójDomek.eu");
        assert_eq!(json[0]["device"]["swVersion"], "1.4.2");
        assert_eq!(json[0]["attributes"]["maxCapacity"], 10000.0);
        assert_eq!(json[0]["attributes"]["tankType"], "septic");
        assert_eq!(json[1]["attributes"]["town"], "Wieliczka");
        assert_eq!(json[1]["attributes"]["address"], serde_json::Value::Null);
    }

    #[actix_web::test]
    async fn stale_snapshot_is_served_after_failed_refresh() {
        let coordinator = build_coordinator(ScriptedClient::new(vec![
            Ok(sample_account_json()),
            Err(FetchError::Status(500)),
        ]));
        coordinator
            .first_refresh()
            .await
            .expect("first refresh should succeed");
        coordinator.refresh().await;

        let resp = get(state_for(&coordinator), "/status").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = read_json(resp).await;
        assert_eq!(json["state"], "failed");
        assert_eq!(
            json["lastError"],
            "error communicating with API: unexpected HTTP status 500"
        );
        assert_eq!(json["lastSuccessAt"], "2026-10-19T12:00:00.000Z");
        assert_eq!(json["account"]["name"], "Jan Kowalski");
        assert_eq!(json["account"]["locationsCount"], 2);

        let resp = get(state_for(&coordinator), "/sensors/A1/percent").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = read_json(resp).await;
        assert_eq!(json["value"], 42.0);
    }

    #[actix_web::test]
    async fn refresh_request_is_rejected_while_fetch_in_flight() {
        let client = GatedClient::default();
        let coordinator = Arc::new(build_coordinator(client.clone()));
        let mut handle = coordinator.handle();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_for(coordinator.as_ref())))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/refresh").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let in_flight = actix_web::rt::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.refresh().await }
        });
        while handle.current().state != CoordinatorState::Fetching {
            assert!(handle.changed().await, "coordinator should stay alive");
        }

        let req = test::TestRequest::post().uri("/refresh").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        client.release();
        in_flight.await.expect("refresh task should finish");
    }
}

use std::sync::Arc;

use thiserror::Error;

use crate::app::coordinator::{CoordinatorHandle, CoordinatorView, RefreshRequest};
use crate::domain::account::AccountSnapshot;
use crate::domain::sensors::{self, LocationView, SensorReading};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("no account snapshot has been fetched yet")]
    NoSnapshot,
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("unknown location: {0}")]
    LocationNotFound(String),
}

pub trait SensorQueryHandler {
    fn status(&self) -> CoordinatorView;
    fn list_sensors(&self) -> Result<Vec<SensorReading>, ServiceError>;
    fn get_sensor(&self, location_id: &str, metric: &str) -> Result<SensorReading, ServiceError>;
    fn list_locations(&self) -> Result<Vec<LocationView>, ServiceError>;
}

pub trait RefreshCommandHandler {
    fn request_refresh(&self) -> RefreshRequest;
}

/// Serves reads from whatever snapshot the coordinator currently holds.
#[derive(Debug, Clone)]
pub struct CoordinatorSensorService {
    coordinator: CoordinatorHandle,
}

impl CoordinatorSensorService {
    pub fn new(coordinator: CoordinatorHandle) -> Self {
        Self { coordinator }
    }

    fn with_snapshot<T>(
        &self,
        op: impl FnOnce(&AccountSnapshot) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let snapshot: Arc<AccountSnapshot> =
            self.coordinator.snapshot().ok_or(ServiceError::NoSnapshot)?;
        op(&snapshot)
    }
}

impl SensorQueryHandler for CoordinatorSensorService {
    fn status(&self) -> CoordinatorView {
        self.coordinator.current()
    }

    fn list_sensors(&self) -> Result<Vec<SensorReading>, ServiceError> {
        self.with_snapshot(|snapshot| Ok(sensors::project(snapshot)))
    }

    fn get_sensor(&self, location_id: &str, metric: &str) -> Result<SensorReading, ServiceError> {
        if sensors::metric(metric).is_none() {
            return Err(ServiceError::UnknownMetric(metric.to_string()));
        }

        self.with_snapshot(|snapshot| {
            sensors::resolve(snapshot, location_id, metric)
                .ok_or_else(|| ServiceError::LocationNotFound(location_id.to_string()))
        })
    }

    fn list_locations(&self) -> Result<Vec<LocationView>, ServiceError> {
        self.with_snapshot(|snapshot| Ok(sensors::describe_locations(snapshot)))
    }
}

impl RefreshCommandHandler for CoordinatorSensorService {
    fn request_refresh(&self) -> RefreshRequest {
        self.coordinator.request_refresh()
    }
}

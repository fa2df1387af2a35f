use std::collections::HashSet;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::app::coordinator::CoordinatorEvent;
use crate::domain::account::AccountSnapshot;
use crate::domain::sensors::Sensor;

/// Remembers which sensors have already been announced.
#[derive(Debug, Default)]
pub struct SensorDiscovery {
    known: HashSet<String>,
}

impl SensorDiscovery {
    /// Sensors in `snapshot` that no earlier snapshot contained.
    pub fn observe(&mut self, snapshot: &AccountSnapshot) -> Vec<Sensor> {
        Sensor::discover(snapshot)
            .into_iter()
            .filter(|sensor| self.known.insert(sensor.unique_id()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// Consumes coordinator events until `shutdown` fires or the coordinator goes away.
pub async fn follow(
    mut events: broadcast::Receiver<CoordinatorEvent>,
    shutdown: CancellationToken,
) -> SensorDiscovery {
    let mut discovery = SensorDiscovery::default();

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(CoordinatorEvent::Updated(snapshot)) => {
                for sensor in discovery.observe(&snapshot) {
                    let metric = sensor.metric();
                    tracing::info!(
                        unique_id = %sensor.unique_id(),
                        name = sensor.name(),
                        unit = metric.unit.map(|unit| unit.symbol()),
                        category = ?metric.category,
                        value = %sensor.value(&snapshot),
                        "sensor discovered"
                    );
                }
            }
            Ok(CoordinatorEvent::Failed(failure)) => tracing::debug!(
                error = %failure,
                sensors = discovery.len(),
                "sensors keep serving the last snapshot"
            ),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "sensor discovery fell behind coordinator events")
            }
            Err(RecvError::Closed) => break,
        }
    }

    discovery
}

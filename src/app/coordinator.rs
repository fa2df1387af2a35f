use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Notify, broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::adapters::mojdomek_http::{AccountClient, FetchError, REQUEST_TIMEOUT};
use crate::domain::account::AccountSnapshot;
use crate::domain::clock::Clock;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Fetching,
    Ready,
    Failed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("error communicating with API: {0}")]
pub struct UpdateFailed(#[from] pub FetchError);

/// What subscribers of the coordinator see. The snapshot survives failed refreshes.
#[derive(Debug, Clone)]
pub struct CoordinatorView {
    pub state: CoordinatorState,
    pub snapshot: Option<Arc<AccountSnapshot>>,
    pub last_error: Option<UpdateFailed>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl Default for CoordinatorView {
    fn default() -> Self {
        Self {
            state: CoordinatorState::Idle,
            snapshot: None,
            last_error: None,
            last_attempt_at: None,
            last_success_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    Updated(Arc<AccountSnapshot>),
    Failed(UpdateFailed),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    Failed(UpdateFailed),
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    Accepted,
    AlreadyInFlight,
}

pub struct RefreshCoordinator<C, Cl> {
    client: C,
    clock: Cl,
    account_id: String,
    interval: Duration,
    fetch_timeout: Duration,
    view: watch::Sender<CoordinatorView>,
    events: broadcast::Sender<CoordinatorEvent>,
    in_flight: Arc<AtomicBool>,
    refresh_pending: Arc<AtomicBool>,
    refresh_requested: Arc<Notify>,
}

/// Cheap read/request side of the coordinator, shared with the HTTP layer.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    view: watch::Receiver<CoordinatorView>,
    in_flight: Arc<AtomicBool>,
    refresh_pending: Arc<AtomicBool>,
    refresh_requested: Arc<Notify>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C, Cl> RefreshCoordinator<C, Cl>
where
    C: AccountClient,
    Cl: Clock,
{
    pub fn new(client: C, clock: Cl, account_id: impl Into<String>, interval: Duration) -> Self {
        let (view, _) = watch::channel(CoordinatorView::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            client,
            clock,
            account_id: account_id.into(),
            interval,
            fetch_timeout: REQUEST_TIMEOUT,
            view,
            events,
            in_flight: Arc::new(AtomicBool::new(false)),
            refresh_pending: Arc::new(AtomicBool::new(false)),
            refresh_requested: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            view: self.view.subscribe(),
            in_flight: Arc::clone(&self.in_flight),
            refresh_pending: Arc::clone(&self.refresh_pending),
            refresh_requested: Arc::clone(&self.refresh_requested),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Runs the startup fetch; callers wait on it before serving reads.
    pub async fn first_refresh(&self) -> Result<Arc<AccountSnapshot>, UpdateFailed> {
        match self.refresh().await {
            RefreshOutcome::Failed(failure) => Err(failure),
            RefreshOutcome::Updated | RefreshOutcome::Skipped => self
                .view
                .borrow()
                .snapshot
                .clone()
                .ok_or_else(|| UpdateFailed(FetchError::Network("no snapshot cached".to_string()))),
        }
    }

    /// One fetch. Dropped when another fetch is still in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("refresh skipped: fetch already in flight");
            return RefreshOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);
        // Any request accepted before this point is served by this fetch.
        self.refresh_pending.store(false, Ordering::Release);

        let attempted_at = self.clock.now();
        self.view.send_modify(|view| {
            view.state = CoordinatorState::Fetching;
            view.last_attempt_at = Some(attempted_at);
        });

        let result =
            match tokio::time::timeout(self.fetch_timeout, self.client.fetch(&self.account_id))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
            };

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let fetched_at = self.clock.now();
                self.view.send_modify(|view| {
                    view.state = CoordinatorState::Ready;
                    view.snapshot = Some(Arc::clone(&snapshot));
                    view.last_error = None;
                    view.last_success_at = Some(fetched_at);
                });

                tracing::info!(
                    locations = snapshot.locations.len(),
                    active = snapshot.active,
                    "account snapshot refreshed"
                );
                let _ = self.events.send(CoordinatorEvent::Updated(snapshot));

                RefreshOutcome::Updated
            }
            Err(error) => {
                let failure = UpdateFailed(error);
                self.view.send_modify(|view| {
                    view.state = CoordinatorState::Failed;
                    view.last_error = Some(failure.clone());
                });

                tracing::warn!(
                    error = %failure,
                    kind = ?failure.0.kind(),
                    "refresh failed, keeping last snapshot"
                );
                let _ = self.events.send(CoordinatorEvent::Failed(failure.clone()));

                RefreshOutcome::Failed(failure)
            }
        }
    }

    /// Refreshes every `interval` and on explicit requests until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "refresh loop started"
        );

        let mut last_finished = Instant::now();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("refresh loop stopped");
                    break;
                }
                deadline = ticker.tick() => {
                    if deadline < last_finished {
                        tracing::debug!("tick fell due during a fetch, dropped");
                        continue;
                    }
                }
                _ = self.refresh_requested.notified() => {
                    if !self.refresh_pending.swap(false, Ordering::AcqRel) {
                        tracing::debug!("explicit refresh already served");
                        continue;
                    }
                    tracing::debug!("explicit refresh requested");
                }
            }

            self.refresh().await;
            last_finished = Instant::now();
        }
    }
}

impl CoordinatorHandle {
    pub fn current(&self) -> CoordinatorView {
        self.view.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<AccountSnapshot>> {
        self.view.borrow().snapshot.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn request_refresh(&self) -> RefreshRequest {
        if self.is_fetching()
            || self
                .refresh_pending
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return RefreshRequest::AlreadyInFlight;
        }

        self.refresh_requested.notify_one();
        RefreshRequest::Accepted
    }

    pub async fn changed(&mut self) -> bool {
        self.view.changed().await.is_ok()
    }
}

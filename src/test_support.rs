use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::adapters::mojdomek_http::{AccountClient, FetchError};
use crate::domain::account::{AccountSnapshot, parse_account};
use crate::domain::clock::Clock;

pub fn sample_account_json() -> Value {
    json!({
        "active": true,
        "firstname": "Jan",
        "lastname": "Kowalski",
        "locations": [
            {
                "id": "A1",
                "name": "Szambo",
                "mainboard": "MD-2",
                "software": "1.4.2",
                "max": 10000,
                "alarm": 85,
                "direction": "down",
                "tanktype": "septic",
                "address": { "address": "Polna 3", "town": "Kraków" },
                "measurement": {
                    "percent": 42,
                    "cm": 118.5,
                    "temperature": 7.25,
                    "volts": 3.61,
                    "batt_level": 88,
                    "rssi": 61,
                    "nextfull": "2026-11-02 06:00:00",
                    "lastempty": "2026-09-30 10:00:00",
                    "datatime": "2026-10-19T08:15:00+02:00"
                }
            },
            {
                "id": "B7",
                "name": "Deszczówka",
                "max": 5000,
                "address": { "town": "Wieliczka" },
                "measurement": { "percent": 15, "cm": 30 }
            }
        ]
    })
}

pub fn sample_account() -> AccountSnapshot {
    parse_account(&sample_account_json()).expect("sample account should parse")
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0)
                .single()
                .expect("fixed timestamp should be valid"),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Returns queued responses in order; fails with a network error once drained.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<Value, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<Value, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<AccountSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .expect("script lock should be available")
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("script exhausted".to_string())));

        next.and_then(|payload| parse_account(&payload).map_err(FetchError::decode))
    }
}

impl AccountClient for ScriptedClient {
    fn fetch(
        &self,
        _account_id: &str,
    ) -> impl Future<Output = Result<AccountSnapshot, FetchError>> + Send {
        std::future::ready(self.next())
    }
}

/// Never answers.
#[derive(Debug, Default)]
pub struct StallingClient;

impl AccountClient for StallingClient {
    fn fetch(
        &self,
        _account_id: &str,
    ) -> impl Future<Output = Result<AccountSnapshot, FetchError>> + Send {
        std::future::pending()
    }
}

/// Holds every fetch until `release` is called, then answers with the sample account.
#[derive(Debug, Clone, Default)]
pub struct GatedClient {
    gate: Arc<Notify>,
}

impl GatedClient {
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

impl AccountClient for GatedClient {
    fn fetch(
        &self,
        _account_id: &str,
    ) -> impl Future<Output = Result<AccountSnapshot, FetchError>> + Send {
        let gate = Arc::clone(&self.gate);
        async move {
            gate.notified().await;
            Ok(sample_account())
        }
    }
}

/// Answers with the sample account after `delay`.
#[derive(Debug)]
pub struct SlowClient {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowClient {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AccountClient for SlowClient {
    fn fetch(
        &self,
        _account_id: &str,
    ) -> impl Future<Output = Result<AccountSnapshot, FetchError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            Ok(sample_account())
        }
    }
}

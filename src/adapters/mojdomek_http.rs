use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::domain::account::{AccountSnapshot, parse_account};

pub const DEFAULT_API_URL: &str = "https://mojdomek.eu/api/api2.php";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub trait AccountClient: Send + Sync + 'static {
    fn fetch(
        &self,
        account_id: &str,
    ) -> impl Future<Output = Result<AccountSnapshot, FetchError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Transport,
    Protocol,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("network request failed: {0}")]
    Network(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Timeout(_) | Self::Network(_) => FetchErrorKind::Transport,
            Self::Status(_) | Self::Decode(_) => FetchErrorKind::Protocol,
        }
    }

    pub fn decode<E: std::fmt::Display>(error: E) -> Self {
        Self::Decode(error.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("account is not active")]
    Inactive,
    #[error("account has no locations")]
    NoLocations,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Fetches once and accepts the account only if it is active and has locations.
pub async fn check_account<C: AccountClient>(
    client: &C,
    account_id: &str,
) -> Result<AccountSnapshot, ValidationFailure> {
    let snapshot = client.fetch(account_id).await?;

    if !snapshot.active {
        return Err(ValidationFailure::Inactive);
    }
    if snapshot.locations.is_empty() {
        return Err(ValidationFailure::NoLocations);
    }

    Ok(snapshot)
}

pub async fn validate<C: AccountClient>(client: &C, account_id: &str) -> bool {
    match check_account(client, account_id).await {
        Ok(_) => true,
        Err(failure) => {
            tracing::debug!(error = %failure, "account validation failed");
            false
        }
    }
}

#[derive(Debug, Clone)]
pub struct MojDomekHttpClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl MojDomekHttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| FetchError::Network(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url: base_url.into(),
            timeout,
            client,
        })
    }

    fn map_request_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if error.is_decode() {
            FetchError::decode(error)
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

impl AccountClient for MojDomekHttpClient {
    fn fetch(
        &self,
        account_id: &str,
    ) -> impl Future<Output = Result<AccountSnapshot, FetchError>> + Send {
        async move {
            let response = self
                .client
                .get(&self.base_url)
                .query(&[("id", account_id)])
                .send()
                .await
                .map_err(|error| self.map_request_error(error))?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(status = status.as_u16(), "MójDomek API returned an error status");
                return Err(FetchError::Status(status.as_u16()));
            }

            let body = response
                .bytes()
                .await
                .map_err(|error| self.map_request_error(error))?;
            let payload: Value = serde_json::from_slice(&body).map_err(FetchError::decode)?;
            let snapshot = parse_account(&payload).map_err(FetchError::decode)?;

            tracing::debug!(
                active = snapshot.active,
                locations = snapshot.locations.len(),
                "account snapshot fetched"
            );

            Ok(snapshot)
        }
    }
}

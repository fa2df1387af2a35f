use std::time::Duration;

use crate::adapters::mojdomek_http::DEFAULT_API_URL;
use crate::app::AppError;

/// Poll interval in minutes, always within [`ScanInterval::MIN_MINUTES`, `ScanInterval::MAX_MINUTES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanInterval(u32);

impl ScanInterval {
    pub const MIN_MINUTES: u32 = 15;
    pub const MAX_MINUTES: u32 = 1440;
    pub const DEFAULT_MINUTES: u32 = 180;

    pub fn from_minutes(minutes: i64) -> Self {
        let clamped = minutes.clamp(i64::from(Self::MIN_MINUTES), i64::from(Self::MAX_MINUTES));
        Self(u32::try_from(clamped).unwrap_or(Self::DEFAULT_MINUTES))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }
}

impl Default for ScanInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_MINUTES)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_id: String,
    pub api_url: String,
    pub scan_interval: ScanInterval,
    pub replay_file: Option<String>,
    pub http_bind: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_id = non_empty(&lookup, "MOJDOMEK_API_ID")
            .ok_or_else(|| AppError::config("MOJDOMEK_API_ID is required"))?;

        let scan_interval = match lookup("MOJDOMEK_SCAN_INTERVAL_MINUTES") {
            Some(raw) => {
                let minutes = raw.trim().parse::<i64>().map_err(|_| {
                    AppError::config("MOJDOMEK_SCAN_INTERVAL_MINUTES must be a valid number")
                })?;
                let interval = ScanInterval::from_minutes(minutes);
                if i64::from(interval.minutes()) != minutes {
                    tracing::warn!(
                        requested_minutes = minutes,
                        applied_minutes = interval.minutes(),
                        "scan interval clamped"
                    );
                }
                interval
            }
            None => ScanInterval::default(),
        };

        Ok(Self {
            api_id,
            api_url: non_empty(&lookup, "MOJDOMEK_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            scan_interval,
            replay_file: non_empty(&lookup, "MOJDOMEK_REPLAY_FILE"),
            http_bind: non_empty(&lookup, "HTTP_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

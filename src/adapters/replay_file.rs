use std::fs;
use std::future::Future;
use std::sync::Mutex;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::adapters::mojdomek_http::{AccountClient, FetchError, REQUEST_TIMEOUT};
use crate::domain::account::{AccountSnapshot, parse_account};

#[derive(Debug, Clone, Deserialize)]
struct ScriptFile {
    #[serde(default = "default_loop")]
    loop_forever: bool,
    responses: Vec<ScriptEvent>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptEvent {
    ok: Option<Value>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
enum ReplayStep {
    Payload(Value),
    Failure(FetchError),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read replay script: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse replay script: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid replay script: {0}")]
    InvalidScript(String),
}

/// Answers fetches from a JSON script instead of the remote API.
#[derive(Debug)]
pub struct ReplayFileClient {
    steps: Vec<ReplayStep>,
    loop_forever: bool,
    cursor: Mutex<usize>,
}

fn default_loop() -> bool {
    true
}

impl ReplayFileClient {
    pub fn from_file(path: &str) -> Result<Self, ReplayError> {
        let content = fs::read_to_string(path)?;
        let script: ScriptFile = serde_json::from_str(&content)?;

        if script.responses.is_empty() {
            return Err(ReplayError::InvalidScript(
                "script must contain at least one response".to_string(),
            ));
        }

        let steps = script
            .responses
            .into_iter()
            .enumerate()
            .map(|(index, event)| match (event.ok, event.error) {
                (Some(payload), None) => Ok(ReplayStep::Payload(payload)),
                (None, Some(kind)) => map_script_error(&kind).map(ReplayStep::Failure).ok_or_else(|| {
                    ReplayError::InvalidScript(format!(
                        "response {index}: unknown scripted error kind: {kind}"
                    ))
                }),
                _ => Err(ReplayError::InvalidScript(format!(
                    "response {index}: must contain exactly one of: ok or error"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            path,
            responses = steps.len(),
            loop_forever = script.loop_forever,
            "replay script loaded"
        );

        Ok(Self {
            steps,
            loop_forever: script.loop_forever,
            cursor: Mutex::new(0),
        })
    }

    fn next_response(&self) -> Result<AccountSnapshot, FetchError> {
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| FetchError::Network("replay state lock poisoned".to_string()))?;

        if *cursor >= self.steps.len() {
            if self.loop_forever {
                *cursor = 0;
            } else {
                return Err(FetchError::Network("replay script exhausted".to_string()));
            }
        }

        let step = self
            .steps
            .get(*cursor)
            .cloned()
            .ok_or_else(|| FetchError::Network("replay cursor out of bounds".to_string()))?;
        *cursor = cursor.saturating_add(1);

        match step {
            ReplayStep::Payload(payload) => parse_account(&payload).map_err(FetchError::decode),
            ReplayStep::Failure(error) => Err(error),
        }
    }
}

fn map_script_error(kind: &str) -> Option<FetchError> {
    let normalized = kind.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "timeout" => Some(FetchError::Timeout(REQUEST_TIMEOUT)),
        "network_unreachable" | "internet_down" | "connection_refused" => {
            Some(FetchError::Network(normalized))
        }
        "invalid_json" => Some(FetchError::Decode("scripted invalid JSON body".to_string())),
        other => other
            .strip_prefix("http_")
            .and_then(|code| code.parse::<u16>().ok())
            .filter(|code| !(200..300).contains(code))
            .map(FetchError::Status),
    }
}

impl AccountClient for ReplayFileClient {
    fn fetch(
        &self,
        _account_id: &str,
    ) -> impl Future<Output = Result<AccountSnapshot, FetchError>> + Send {
        std::future::ready(self.next_response())
    }
}

use crate::error::SessionError;
use meshcall_core::IceServerConfig;
use meshcall_core::utils::DEFAULT_STUN_ADDR;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for one meeting session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub relay_url: String,
    pub room: String,
    pub display_name: String,
    /// How long `connect` waits for the relay's welcome.
    pub connect_timeout_ms: u64,
    pub ice_servers: Vec<IceServerConfig>,
    pub gestures: Vec<GestureEndpoint>,
    pub backoff: BackoffConfig,
}

impl SessionConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SessionError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| SessionError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://localhost:8000/relay".to_owned(),
            room: "lobby".to_owned(),
            display_name: String::new(),
            connect_timeout_ms: 10_000,
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned()],
                username: None,
                credential: None,
            }],
            gestures: GestureEndpoint::defaults(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// One auxiliary gesture recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEndpoint {
    pub name: String,
    pub url: String,
}

impl GestureEndpoint {
    /// The five recognizers shipped with the meeting app, one port each.
    pub fn defaults() -> Vec<Self> {
        [
            ("mic", 5001),
            ("reaction", 5002),
            ("screenshot", 5003),
            ("recording", 5004),
            ("moment", 5005),
        ]
        .into_iter()
        .map(|(name, port)| Self {
            name: name.to_owned(),
            url: format!("ws://localhost:{port}/gestures"),
        })
        .collect()
    }
}

/// Exponential reconnect backoff for gesture sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
}

impl BackoffConfig {
    /// Delay before reconnect attempt number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let millis = self.initial_ms.saturating_mul(factor).min(self.max_ms);
        Duration::from_millis(millis)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 1000,
            max_ms: 30_000,
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Lifecycle phase of a service or of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Initialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServiceState::Initialized => "initialized",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Stopped => "stopped",
            ServiceState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Point-in-time status of a single service.
///
/// Owned by the service that reports it; `error` is populated only while
/// the state is [`ServiceState::Error`] and cleared by the next successful
/// start or stop transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub state: ServiceState,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub is_configured: bool,
}

impl ServiceStatus {
    pub fn new() -> Self {
        Self {
            state: ServiceState::Initialized,
            error: None,
            metadata: HashMap::new(),
            is_configured: false,
        }
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-wide status returned by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationStatus {
    pub version: String,
    pub state: ServiceState,
    pub services: HashMap<String, ServiceStatus>,
}

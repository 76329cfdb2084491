use crate::config::ServiceConfiguration;
use crate::error::{FrameworkError, Result};
use crate::models::{ServiceState, ServiceStatus};
use async_trait::async_trait;
use axum::Router;
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Business logic behind a service.
///
/// The lifecycle core only ever calls `start` and `stop`; everything else a
/// manager does (connections, background loops, external SDKs) is private to
/// it. A manager that spawns a background task at start must cancel it and
/// await its completion at stop so no orphaned task survives.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn start(&mut self) -> anyhow::Result<()>;

    async fn stop(&mut self) -> anyhow::Result<()>;

    /// Apply service-specific settings from a configuration.
    ///
    /// Mandatory capability of every manager so the registrar never probes
    /// for it; the default implementation accepts anything.
    fn apply_configuration(&mut self, _config: &ServiceConfiguration) -> Result<()> {
        Ok(())
    }
}

/// Recipe for building a [`Service`] instance, keyed into the
/// [`ServiceCatalog`](crate::catalog::ServiceCatalog) by its derived name.
pub trait ServiceBlueprint: Send + Sync {
    /// Type name of the service, e.g. `"MonitoringService"`. Reported by
    /// `GET /services` and used to derive the default registration name.
    fn kind(&self) -> &'static str;

    /// Build a service instance under the given registered name.
    fn build(&self, name: String) -> Service;
}

/// Canonical service name for a kind: lower-cased with any trailing
/// `"service"` suffix stripped (`"MonitoringService"` -> `"monitoring"`).
pub fn default_service_name(kind: &str) -> String {
    let lower = kind.to_lowercase();
    lower
        .strip_suffix("service")
        .filter(|stripped| !stripped.is_empty())
        .unwrap_or(&lower)
        .to_string()
}

/// A named, independently startable and stoppable unit of functionality.
///
/// Owns its status, its optional configuration, and exactly one manager.
/// Lifecycle: `Initialized -> Starting -> Running -> Stopping -> Stopped`,
/// with `Error` reachable from any in-flight phase; `Stopped` and `Error`
/// are re-enterable through `start`.
pub struct Service {
    name: String,
    kind: &'static str,
    requires_configuration: bool,
    status: RwLock<ServiceStatus>,
    config: RwLock<Option<ServiceConfiguration>>,
    manager: Mutex<Box<dyn ServiceManager>>,
    routes: Option<Router>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("requires_configuration", &self.requires_configuration)
            .finish_non_exhaustive()
    }
}

impl Service {
    pub fn new(name: impl Into<String>, kind: &'static str, manager: Box<dyn ServiceManager>) -> Self {
        Self {
            name: name.into(),
            kind,
            requires_configuration: true,
            status: RwLock::new(ServiceStatus::new()),
            config: RwLock::new(None),
            manager: Mutex::new(manager),
            routes: None,
        }
    }

    /// Attach service-specific HTTP routes, mounted when the application
    /// router is built. Paths must be absolute (`/services/{name}/...`).
    pub fn with_routes(mut self, routes: Router) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Allow the service to start without prior configuration.
    pub fn with_requires_configuration(mut self, required: bool) -> Self {
        self.requires_configuration = required;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn requires_configuration(&self) -> bool {
        self.requires_configuration
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> ServiceStatus {
        self.status.read().unwrap().clone()
    }

    pub fn config(&self) -> Option<ServiceConfiguration> {
        self.config.read().unwrap().clone()
    }

    pub fn is_configured(&self) -> bool {
        self.status.read().unwrap().is_configured
    }

    pub fn extra_routes(&self) -> Option<Router> {
        self.routes.clone()
    }

    /// Store a configuration and merge its metadata into the status.
    ///
    /// Never starts the service. Calling twice replaces the stored
    /// configuration; metadata keys merge last-write-wins.
    pub async fn configure(&self, config: ServiceConfiguration) -> Result<()> {
        {
            let mut manager = self.manager.lock().await;
            manager.apply_configuration(&config)?;
        }

        let mut status = self.status.write().unwrap();
        for (key, value) in &config.metadata {
            status.metadata.insert(key.clone(), value.clone());
        }
        status.is_configured = true;
        drop(status);

        *self.config.write().unwrap() = Some(config);
        info!(service = %self.name, "Service configured");
        Ok(())
    }

    /// Start the service: `Starting`, then `Running` on success.
    ///
    /// Fails without touching the state when configuration is required but
    /// missing. A manager failure is recorded in the status (state `Error`,
    /// message in `error`) and propagated to the caller.
    pub async fn start(&self) -> Result<()> {
        if self.requires_configuration && !self.is_configured() {
            return Err(FrameworkError::Configuration {
                name: self.name.clone(),
            });
        }

        info!(service = %self.name, "Starting service");
        {
            let mut status = self.status.write().unwrap();
            status.state = ServiceState::Starting;
            status.error = None;
        }

        let mut manager = self.manager.lock().await;
        match manager.start().await {
            Ok(()) => {
                self.status.write().unwrap().state = ServiceState::Running;
                info!(service = %self.name, "Service running");
                Ok(())
            }
            Err(e) => {
                let message = format!("Failed to start service {}: {e}", self.name);
                self.set_error(&message);
                Err(FrameworkError::Manager(message))
            }
        }
    }

    /// Stop the service: `Stopping`, then `Stopped`.
    ///
    /// Stop is best-effort: a manager failure is recorded as `Error` and
    /// logged but not propagated, so one broken service cannot block an
    /// overall shutdown. The service remains restartable afterwards.
    pub async fn stop(&self) -> Result<()> {
        info!(service = %self.name, "Stopping service");
        self.status.write().unwrap().state = ServiceState::Stopping;

        let mut manager = self.manager.lock().await;
        match manager.stop().await {
            Ok(()) => {
                let mut status = self.status.write().unwrap();
                status.state = ServiceState::Stopped;
                status.error = None;
                info!(service = %self.name, "Service stopped");
            }
            Err(e) => {
                let message = format!("Failed to stop service {}: {e}", self.name);
                self.set_error(&message);
            }
        }
        Ok(())
    }

    /// Record an error: sets `status.error`, forces the state to `Error`,
    /// and emits a log record. Callable by external owners (e.g. an HTTP
    /// handler) independent of start/stop.
    pub fn set_error(&self, message: &str) {
        error!(service = %self.name, error = %message, "Service error");
        let mut status = self.status.write().unwrap();
        status.error = Some(message.to_string());
        status.state = ServiceState::Error;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ProbeManager;
    use super::*;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn probe_service(name: &str) -> (Service, std::sync::Arc<std::sync::atomic::AtomicBool>) {
        let (manager, started, _) = ProbeManager::new();
        let service = Service::new(name, "ProbeService", Box::new(manager))
            .with_requires_configuration(false);
        (service, started)
    }

    #[test]
    fn test_default_service_name() {
        assert_eq!(default_service_name("MonitoringService"), "monitoring");
        assert_eq!(default_service_name("ClockService"), "clock");
        assert_eq!(default_service_name("Worker"), "worker");
        // A bare "Service" keeps its name rather than becoming empty
        assert_eq!(default_service_name("Service"), "service");
    }

    #[test]
    fn test_initial_status() {
        let (service, _) = probe_service("probe");
        let status = service.status();
        assert_eq!(status.state, ServiceState::Initialized);
        assert!(status.error.is_none());
        assert!(status.metadata.is_empty());
        assert!(!status.is_configured);
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let (service, started) = probe_service("probe");

        service.start().await.unwrap();
        assert_eq!(service.status().state, ServiceState::Running);
        assert!(service.status().error.is_none());
        assert!(started.load(Ordering::SeqCst));

        service.stop().await.unwrap();
        assert_eq!(service.status().state, ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_start_requires_configuration() {
        let (manager, started, _) = ProbeManager::new();
        let service = Service::new("probe", "ProbeService", Box::new(manager));

        let err = service.start().await.unwrap_err();
        assert!(matches!(err, FrameworkError::Configuration { .. }));
        // Precondition failure leaves the state untouched
        assert_eq!(service.status().state, ServiceState::Initialized);
        assert!(!started.load(Ordering::SeqCst));

        service.configure(ServiceConfiguration::new()).await.unwrap();
        service.start().await.unwrap();
        assert_eq!(service.status().state, ServiceState::Running);
    }

    #[tokio::test]
    async fn test_configure_merges_metadata_last_write_wins() {
        let (service, _) = probe_service("probe");

        let first = ServiceConfiguration::new()
            .with_metadata("region", json!("east"))
            .with_metadata("zone", json!("a"));
        service.configure(first).await.unwrap();

        let second = ServiceConfiguration::new().with_metadata("region", json!("west"));
        service.configure(second.clone()).await.unwrap();

        let status = service.status();
        assert_eq!(status.metadata["region"], json!("west"));
        assert_eq!(status.metadata["zone"], json!("a"));
        assert!(status.is_configured);
        assert_eq!(service.config(), Some(second));
    }

    #[tokio::test]
    async fn test_start_failure_records_error_and_propagates() {
        let (mut manager, _, _) = ProbeManager::new();
        manager.fail_start = true;
        let service = Service::new("probe", "ProbeService", Box::new(manager))
            .with_requires_configuration(false);

        let err = service.start().await.unwrap_err();
        assert!(matches!(err, FrameworkError::Manager(_)));

        let status = service.status();
        assert_eq!(status.state, ServiceState::Error);
        assert!(status.error.unwrap().contains("probe start failure"));
    }

    #[tokio::test]
    async fn test_stop_failure_is_recorded_but_swallowed() {
        let (mut manager, _, _) = ProbeManager::new();
        manager.fail_stop = true;
        let service = Service::new("probe", "ProbeService", Box::new(manager))
            .with_requires_configuration(false);

        service.start().await.unwrap();
        service.stop().await.unwrap();

        let status = service.status();
        assert_eq!(status.state, ServiceState::Error);
        assert!(status.error.unwrap().contains("probe stop failure"));
    }

    #[tokio::test]
    async fn test_error_cleared_on_next_successful_transition() {
        let (service, _) = probe_service("probe");
        service.set_error("external failure");
        assert_eq!(service.status().state, ServiceState::Error);

        service.start().await.unwrap();
        let status = service.status();
        assert_eq!(status.state, ServiceState::Running);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_set_error() {
        let (service, _) = probe_service("probe");
        service.set_error("disk full");

        let status = service.status();
        assert_eq!(status.state, ServiceState::Error);
        assert_eq!(status.error.as_deref(), Some("disk full"));
    }
}

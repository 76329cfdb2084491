use crate::config::ApplicationConfiguration;
use crate::error::{FrameworkError, Result};
use crate::models::{ServiceState, ServiceStatus};
use crate::service::{default_service_name, Service, ServiceBlueprint};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info};

/// Insertion-ordered registry of services keyed by unique name.
#[derive(Default)]
struct Registry {
    by_name: HashMap<String, Arc<Service>>,
    ordered: Vec<Arc<Service>>,
}

/// The lifecycle core: authoritative registry and orchestrator for all
/// services of one application instance.
///
/// Owns every [`Service`] it registers; external callers only ever read
/// through [`get_service`](Self::get_service) and the snapshot accessors.
/// Bulk operations run sequentially in registration order and isolate
/// per-service failures; single-target operations surface errors to the
/// caller.
pub struct ApplicationManager {
    state: RwLock<ServiceState>,
    registry: RwLock<Registry>,
    config: ApplicationConfiguration,
}

impl ApplicationManager {
    pub fn new(config: ApplicationConfiguration) -> Self {
        Self {
            state: RwLock::new(ServiceState::Stopped),
            registry: RwLock::new(Registry::default()),
            config,
        }
    }

    /// Application-wide state, independent of any individual service.
    pub fn state(&self) -> ServiceState {
        *self.state.read().unwrap()
    }

    pub fn set_state(&self, state: ServiceState) {
        info!(state = %state, "Application state changed");
        *self.state.write().unwrap() = state;
    }

    /// Snapshot of all services in registration order.
    pub fn services(&self) -> Vec<Arc<Service>> {
        self.registry.read().unwrap().ordered.clone()
    }

    /// Status of every registered service, keyed by name.
    pub fn service_statuses(&self) -> HashMap<String, ServiceStatus> {
        self.registry
            .read()
            .unwrap()
            .ordered
            .iter()
            .map(|svc| (svc.name().to_string(), svc.status()))
            .collect()
    }

    /// Name -> kind listing for `GET /services`.
    pub fn service_kinds(&self) -> HashMap<String, String> {
        self.registry
            .read()
            .unwrap()
            .ordered
            .iter()
            .map(|svc| (svc.name().to_string(), svc.kind().to_string()))
            .collect()
    }

    pub fn get_service(&self, name: &str) -> Option<Arc<Service>> {
        self.registry.read().unwrap().by_name.get(name).cloned()
    }

    /// Instantiate and register a service from a blueprint.
    ///
    /// The name defaults to the blueprint kind, lower-cased with the
    /// `"service"` suffix stripped. If the application configuration carries
    /// a section matching the name, the service is configured before it
    /// becomes visible, so callers observing the returned handle already see
    /// `is_configured == true`. Fails with [`FrameworkError::DuplicateService`]
    /// when the name is taken; the registry is left unchanged.
    pub async fn register_service(
        &self,
        blueprint: &dyn ServiceBlueprint,
        name: Option<&str>,
    ) -> Result<Arc<Service>> {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| default_service_name(blueprint.kind()));

        if self.registry.read().unwrap().by_name.contains_key(&name) {
            return Err(FrameworkError::DuplicateService { name });
        }

        let service = Arc::new(blueprint.build(name.clone()));
        if let Some(config) = self.config.services.get(&name) {
            service.configure(config.clone()).await?;
        }

        // Atomic check-and-insert: no suspension point between the duplicate
        // check and the insert, so concurrent registrations of one name
        // cannot both succeed.
        let mut registry = self.registry.write().unwrap();
        if registry.by_name.contains_key(&name) {
            return Err(FrameworkError::DuplicateService { name });
        }
        registry.by_name.insert(name.clone(), service.clone());
        registry.ordered.push(service.clone());
        drop(registry);

        info!(service = %name, kind = blueprint.kind(), "Registered service");
        Ok(service)
    }

    /// Start one service by name. Lookup misses and manager failures both
    /// propagate: the caller explicitly asked for this service.
    pub async fn start_service(&self, name: &str) -> Result<()> {
        let service = self
            .get_service(name)
            .ok_or_else(|| FrameworkError::NotFound {
                name: name.to_string(),
            })?;
        service.start().await
    }

    /// Stop one service by name. The lookup miss propagates; a manager
    /// failure is recorded on the service and swallowed (stop is
    /// best-effort, see [`Service::stop`]).
    pub async fn stop_service(&self, name: &str) -> Result<()> {
        let service = self
            .get_service(name)
            .ok_or_else(|| FrameworkError::NotFound {
                name: name.to_string(),
            })?;
        service.stop().await
    }

    /// Start every service whose configuration has `enabled == true`, in
    /// registration order. Services without a configuration are skipped.
    /// Individual failures are logged and do not stop the iteration.
    pub async fn start_enabled_services(&self) {
        for service in self.services() {
            let enabled = service.config().map(|c| c.enabled).unwrap_or(false);
            if !enabled {
                continue;
            }
            if let Err(e) = service.start().await {
                error!(service = %service.name(), error = %e, "Failed to start service");
            }
        }
    }

    /// Stop every registered service in registration order, regardless of
    /// state or configuration. Individual failures are logged and do not
    /// stop the iteration.
    pub async fn stop_all_services(&self) {
        for service in self.services() {
            if let Err(e) = service.stop().await {
                error!(service = %service.name(), error = %e, "Failed to stop service");
            }
        }
    }
}

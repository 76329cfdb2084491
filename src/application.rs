use crate::api::{create_core_router, AppState};
use crate::config::ApplicationConfiguration;
use crate::error::Result;
use crate::manager::ApplicationManager;
use crate::models::ServiceState;
use crate::service::{Service, ServiceBlueprint};
use anyhow::Context;
use axum::Router;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Composition root: owns the configuration and the lifecycle core, wires
/// registered services into the HTTP app, and drives the host process
/// through its own Starting -> Running -> Stopping -> Stopped states.
pub struct Application {
    config: ApplicationConfiguration,
    manager: Arc<ApplicationManager>,
}

impl Application {
    pub fn new(config: ApplicationConfiguration) -> Self {
        let manager = Arc::new(ApplicationManager::new(config.clone()));
        Self { config, manager }
    }

    pub fn config(&self) -> &ApplicationConfiguration {
        &self.config
    }

    pub fn manager(&self) -> Arc<ApplicationManager> {
        self.manager.clone()
    }

    /// Register a service with the lifecycle core. See
    /// [`ApplicationManager::register_service`].
    pub async fn register_service(
        &self,
        blueprint: &dyn ServiceBlueprint,
        name: Option<&str>,
    ) -> Result<Arc<Service>> {
        self.manager.register_service(blueprint, name).await
    }

    /// Build the full HTTP router: core lifecycle routes plus every
    /// registered service's extra routes. Services registered after this
    /// point still get the uniform lifecycle endpoints (those match by path
    /// parameter) but not their extra routes.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            manager: self.manager.clone(),
            version: self.config.version.clone(),
        };

        let mut router = create_core_router(state);
        for service in self.manager.services() {
            if let Some(extra) = service.extra_routes() {
                router = router.merge(extra);
            }
        }
        router.layer(TraceLayer::new_for_http())
    }

    /// Serve the HTTP app until a shutdown signal arrives.
    ///
    /// Starts enabled services before accepting traffic and stops all
    /// services after the listener drains, tracking the application state
    /// across the whole span.
    pub async fn serve(&self) -> anyhow::Result<()> {
        self.manager.set_state(ServiceState::Starting);
        info!(
            host = %self.config.host,
            port = self.config.port,
            environment = %self.config.environment,
            "Starting application"
        );

        self.manager.start_enabled_services().await;

        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .with_context(|| {
                format!("Failed to bind {}:{}", self.config.host, self.config.port)
            })?;
        self.manager.set_state(ServiceState::Running);

        let result = axum::serve(listener, self.build_router())
            .with_graceful_shutdown(wait_for_shutdown())
            .await;

        self.manager.set_state(ServiceState::Stopping);
        info!("Stopping application");
        self.manager.stop_all_services().await;
        self.manager.set_state(ServiceState::Stopped);

        result.context("HTTP server error")
    }
}

/// Resolve when the process receives Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

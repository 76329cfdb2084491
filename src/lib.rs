pub mod api;
pub mod application;
pub mod catalog;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod service;
pub mod services;

pub use application::Application;
pub use catalog::ServiceCatalog;
pub use config::{ApplicationConfiguration, ServiceConfiguration};
pub use error::{FrameworkError, Result};
pub use manager::ApplicationManager;
pub use models::{ApplicationStatus, ServiceState, ServiceStatus};
pub use service::{Service, ServiceBlueprint, ServiceManager};

// Re-export the built-in services for convenience
pub use services::{ClockService, MonitoringService};

//! Host resource monitoring service.
//!
//! The manager samples CPU and memory usage on a fixed interval in a
//! background task and publishes the latest sample for the
//! `GET /services/{name}/metrics` route.

use crate::config::ServiceConfiguration;
use crate::error::Result;
use crate::service::{Service, ServiceBlueprint, ServiceManager};
use async_trait::async_trait;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use sysinfo::System;
use tokio::task::JoinHandle;
use tracing::debug;

/// Latest metrics sample, shared between the collection task and the router.
pub type MetricsHandle = Arc<RwLock<HashMap<String, f64>>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Seconds between samples
    pub interval: f64,
    pub collect_cpu: bool,
    pub collect_memory: bool,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            interval: 10.0,
            collect_cpu: true,
            collect_memory: true,
        }
    }
}

pub struct MonitoringManager {
    settings: MonitoringSettings,
    metrics: MetricsHandle,
    task: Option<JoinHandle<()>>,
}

impl MonitoringManager {
    pub fn new(metrics: MetricsHandle) -> Self {
        Self {
            settings: MonitoringSettings::default(),
            metrics,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

#[async_trait]
impl ServiceManager for MonitoringManager {
    async fn start(&mut self) -> anyhow::Result<()> {
        if self.task.is_some() {
            return Ok(());
        }

        let settings = self.settings.clone();
        let metrics = self.metrics.clone();
        self.task = Some(tokio::spawn(async move {
            let mut sys = System::new();
            let period = Duration::from_secs_f64(settings.interval.max(0.05));
            let mut ticker = tokio::time::interval(period);

            loop {
                ticker.tick().await;

                let mut sample = HashMap::new();
                if settings.collect_cpu {
                    sys.refresh_cpu();
                    let cpus = sys.cpus();
                    if !cpus.is_empty() {
                        let cpu_usage = cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>()
                            / cpus.len() as f32;
                        sample.insert("cpu_percent".to_string(), f64::from(cpu_usage));
                    }
                }
                if settings.collect_memory {
                    sys.refresh_memory();
                    let total = sys.total_memory();
                    let used = sys.used_memory();
                    sample.insert("memory_used_bytes".to_string(), used as f64);
                    sample.insert("memory_total_bytes".to_string(), total as f64);
                    if total > 0 {
                        sample.insert(
                            "memory_percent".to_string(),
                            (used as f64 / total as f64) * 100.0,
                        );
                    }
                }

                debug!(samples = sample.len(), "Collected system metrics");
                metrics.write().unwrap().extend(sample);
            }
        }));
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            // Swallow the cancellation error; the task has no other way out
            let _ = task.await;
        }
        Ok(())
    }

    fn apply_configuration(&mut self, config: &ServiceConfiguration) -> Result<()> {
        self.settings = config.parse_extra()?;
        Ok(())
    }
}

/// Blueprint for the monitoring service.
pub struct MonitoringService;

impl ServiceBlueprint for MonitoringService {
    fn kind(&self) -> &'static str {
        "MonitoringService"
    }

    fn build(&self, name: String) -> Service {
        let metrics: MetricsHandle = Arc::new(RwLock::new(HashMap::new()));
        let routes = Router::new()
            .route(&format!("/services/{name}/metrics"), get(get_metrics))
            .with_state(metrics.clone());

        Service::new(name, self.kind(), Box::new(MonitoringManager::new(metrics)))
            .with_routes(routes)
    }
}

async fn get_metrics(State(metrics): State<MetricsHandle>) -> Json<HashMap<String, f64>> {
    Json(metrics.read().unwrap().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_defaults() {
        let settings = MonitoringSettings::default();
        assert_eq!(settings.interval, 10.0);
        assert!(settings.collect_cpu);
        assert!(settings.collect_memory);
    }

    #[test]
    fn test_apply_configuration_parses_extra_fields() {
        let metrics: MetricsHandle = Arc::new(RwLock::new(HashMap::new()));
        let mut manager = MonitoringManager::new(metrics);

        let config = ServiceConfiguration::new()
            .with_extra("interval", json!(0.5))
            .with_extra("collect_cpu", json!(false));
        manager.apply_configuration(&config).unwrap();

        assert_eq!(manager.settings.interval, 0.5);
        assert!(!manager.settings.collect_cpu);
        assert!(manager.settings.collect_memory);
    }

    #[tokio::test]
    async fn test_background_task_collects_and_stops() {
        let metrics: MetricsHandle = Arc::new(RwLock::new(HashMap::new()));
        let mut manager = MonitoringManager::new(metrics.clone());
        manager.settings.interval = 0.05;

        manager.start().await.unwrap();
        assert!(manager.is_running());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(metrics.read().unwrap().contains_key("memory_used_bytes"));

        manager.stop().await.unwrap();
        assert!(!manager.is_running());

        // Repeated stop is a no-op
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_running() {
        let metrics: MetricsHandle = Arc::new(RwLock::new(HashMap::new()));
        let mut manager = MonitoringManager::new(metrics);
        manager.settings.interval = 0.05;

        manager.start().await.unwrap();
        manager.start().await.unwrap();
        assert!(manager.is_running());
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_blueprint_builds_named_service() {
        let service = MonitoringService.build("monitoring".to_string());
        assert_eq!(service.name(), "monitoring");
        assert_eq!(service.kind(), "MonitoringService");
        assert!(service.extra_routes().is_some());
        assert!(service.requires_configuration());
    }
}

//! Wall-clock tick service.
//!
//! Runs a tick loop at a configurable cadence, tracking the tick count and
//! the last tick timestamp. Useful as a heartbeat and as the smallest
//! possible example of a service with a background task.

use crate::config::ServiceConfiguration;
use crate::error::Result;
use crate::service::{Service, ServiceBlueprint, ServiceManager};
use async_trait::async_trait;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    /// Seconds between ticks
    pub tick_size: f64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self { tick_size: 1.0 }
    }
}

/// Tick counter shared between the loop and the router.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClockTicks {
    pub tick_count: u64,
    pub last_tick: Option<DateTime<Utc>>,
    pub tick_size: f64,
}

pub type TicksHandle = Arc<RwLock<ClockTicks>>;

pub struct ClockManager {
    settings: ClockSettings,
    ticks: TicksHandle,
    task: Option<JoinHandle<()>>,
}

impl ClockManager {
    pub fn new(ticks: TicksHandle) -> Self {
        Self {
            settings: ClockSettings::default(),
            ticks,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

#[async_trait]
impl ServiceManager for ClockManager {
    async fn start(&mut self) -> anyhow::Result<()> {
        if self.task.is_some() {
            return Ok(());
        }

        let tick_size = self.settings.tick_size.max(0.01);
        let ticks = self.ticks.clone();
        {
            let mut state = ticks.write().unwrap();
            state.tick_size = tick_size;
        }

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs_f64(tick_size));
            // Consume the immediate first tick so the count starts at zero
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let mut state = ticks.write().unwrap();
                state.tick_count += 1;
                state.last_tick = Some(Utc::now());
                trace!(tick = state.tick_count, "Clock tick");
            }
        }));
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        Ok(())
    }

    fn apply_configuration(&mut self, config: &ServiceConfiguration) -> Result<()> {
        self.settings = config.parse_extra()?;
        Ok(())
    }
}

/// Blueprint for the clock service. Runs fine without configuration, so it
/// does not require one.
pub struct ClockService;

impl ServiceBlueprint for ClockService {
    fn kind(&self) -> &'static str {
        "ClockService"
    }

    fn build(&self, name: String) -> Service {
        let ticks: TicksHandle = Arc::new(RwLock::new(ClockTicks::default()));
        let routes = Router::new()
            .route(&format!("/services/{name}/ticks"), get(get_ticks))
            .with_state(ticks.clone());

        Service::new(name, self.kind(), Box::new(ClockManager::new(ticks)))
            .with_routes(routes)
            .with_requires_configuration(false)
    }
}

async fn get_ticks(State(ticks): State<TicksHandle>) -> Json<ClockTicks> {
    Json(ticks.read().unwrap().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_defaults() {
        assert_eq!(ClockSettings::default().tick_size, 1.0);
    }

    #[test]
    fn test_apply_configuration() {
        let ticks: TicksHandle = Arc::new(RwLock::new(ClockTicks::default()));
        let mut manager = ClockManager::new(ticks);

        let config = ServiceConfiguration::new().with_extra("tick_size", json!(0.25));
        manager.apply_configuration(&config).unwrap();
        assert_eq!(manager.settings.tick_size, 0.25);
    }

    #[tokio::test]
    async fn test_tick_loop_advances_and_stops() {
        let ticks: TicksHandle = Arc::new(RwLock::new(ClockTicks::default()));
        let mut manager = ClockManager::new(ticks.clone());
        manager.settings.tick_size = 0.02;

        manager.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        manager.stop().await.unwrap();
        assert!(!manager.is_running());

        let state = ticks.read().unwrap().clone();
        assert!(state.tick_count >= 1);
        assert!(state.last_tick.is_some());

        // No ticks after stop
        let frozen = state.tick_count;
        drop(state);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(ticks.read().unwrap().tick_count, frozen);
    }

    #[tokio::test]
    async fn test_blueprint_does_not_require_configuration() {
        let service = ClockService.build("clock".to_string());
        assert!(!service.requires_configuration());
        assert!(service.extra_routes().is_some());

        // Starts unconfigured with default settings
        service.start().await.unwrap();
        service.stop().await.unwrap();
    }
}

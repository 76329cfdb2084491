//! Services shipped with the framework.

pub mod clock;
pub mod monitoring;

pub use clock::ClockService;
pub use monitoring::MonitoringService;

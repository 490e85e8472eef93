//! Deployment orchestration: the slot arbiter (C4), the deployment
//! strategies (C5), the deploy engine (C6), and the log relay (C8).

pub mod error;
pub mod log_relay;
pub mod orchestrator;
pub mod slot_arbiter;
pub mod strategy;
pub mod tracing_layer;

pub use error::{OrchestratorError, Result};
pub use log_relay::LogRelay;
pub use orchestrator::{
    DeployImageRequest, DeployServiceByNameRequest, DeploySourceRequest, Orchestrator,
};
pub use tracing_layer::{DeployLayer, InMemoryLogRecorder, LogRecorder};

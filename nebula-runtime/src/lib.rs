//! Container runtime abstraction consumed by deployment strategies and the
//! log relay. §6 "Container runtime capability set".
//!
//! Grounded on the teacher's bollard usage in its project state machine:
//! the same create/start/stop/inspect/logs calls, generalized behind a
//! trait so strategies and tests don't depend on a live Docker daemon.

pub mod docker;
pub mod error;
pub mod types;

use async_trait::async_trait;
use tokio_stream::Stream;
use std::pin::Pin;

pub use error::{Result, RuntimeError};
pub use types::*;

pub type LogStreamFuture = Pin<Box<dyn Stream<Item = Result<LogChunk>> + Send>>;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull_image(&self, image: &str, auth: Option<&RegistryAuth>) -> Result<()>;

    async fn build_image(&self, context_dir: &str, image_name: &str) -> Result<BuildOutput>;

    async fn create_container(&self, config: &ContainerConfig) -> Result<String>;

    async fn start_container(&self, id: &str) -> Result<()>;

    async fn stop_container(&self, id: &str, timeout_secs: u64) -> Result<()>;

    async fn restart_container(&self, id: &str, timeout_secs: u64) -> Result<()>;

    async fn remove_container(&self, id: &str, force: bool) -> Result<()>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspect>;

    async fn container_logs(&self, id: &str, options: LogOptions) -> Result<LogStreamFuture>;

    async fn create_network(&self, name: &str, opts: &NetworkOpts) -> Result<()>;

    async fn create_volume(&self, name: &str, opts: &VolumeOpts) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

//! The deployment strategy contract (C5): the single extension point for
//! deployment modes. §4.3.

use async_trait::async_trait;

use crate::error::Result;
use crate::strategy::types::{DeploymentResult, DeploymentSpec, HealthResult, Mode, PrepareResult};

#[async_trait]
pub trait DeploymentStrategy: Send + Sync {
    fn mode(&self) -> Mode;

    async fn validate(&self, spec: &DeploymentSpec) -> Result<()>;

    /// Pull/clone/build. Idempotent on an unchanged image reference.
    async fn prepare(&self, spec: &DeploymentSpec) -> Result<PrepareResult>;

    async fn deploy(&self, spec: &DeploymentSpec, prepared: &PrepareResult) -> Result<DeploymentResult>;

    async fn health_check(&self, spec: &DeploymentSpec, result: &DeploymentResult) -> Result<HealthResult>;

    /// Graceful, bounded by timeout.
    async fn stop(&self, container_ids: &[String]) -> Result<()>;

    /// Remove, ignoring not-found.
    async fn destroy(&self, container_ids: &[String]) -> Result<()>;
}

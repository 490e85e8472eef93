//! The `image` strategy: pulls a pre-built image (or uses one produced by a
//! builder) and launches exactly one container. §4.3.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nebula_runtime::{ContainerConfig, ContainerRuntime, PortBinding, Protocol, RunState};

use crate::error::{OrchestratorError, Result};
use crate::strategy::labels::{container_name, managed_labels};
use crate::strategy::trait_def::DeploymentStrategy;
use crate::strategy::types::{DeploymentResult, DeploymentSpec, HealthResult, Mode, PrepareResult};

/// Default health-check warm-up bound, also used as the database warm-up
/// default (§4.3 calls the latter out explicitly as tunable via the same
/// `health_check_attempts`/`health_check_interval_secs` spec fields).
pub const DEFAULT_HEALTH_CHECK_ATTEMPTS: u32 = 30;
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 2;

pub struct ImageStrategy {
    runtime: Arc<dyn ContainerRuntime>,
    http: reqwest::Client,
}

impl ImageStrategy {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DeploymentStrategy for ImageStrategy {
    fn mode(&self) -> Mode {
        Mode::Image
    }

    async fn validate(&self, spec: &DeploymentSpec) -> Result<()> {
        let image = spec
            .image
            .as_deref()
            .ok_or_else(|| OrchestratorError::Validation("image strategy requires `image`".into()))?;
        if image.is_empty() {
            return Err(OrchestratorError::Validation("`image` must not be empty".into()));
        }
        match spec.port {
            Some(p) if p > 0 => {}
            _ => {
                return Err(OrchestratorError::Validation(
                    "image strategy requires `port` > 0".into(),
                ))
            }
        }
        Ok(())
    }

    async fn prepare(&self, spec: &DeploymentSpec) -> Result<PrepareResult> {
        let image = spec.image.clone().expect("validated by `validate`");
        self.runtime
            .pull_image(&image, spec.registry_auth.as_ref())
            .await?;
        Ok(PrepareResult {
            image_ref: Some(image),
            build_dir: None,
            build_log: String::new(),
        })
    }

    async fn deploy(&self, spec: &DeploymentSpec, prepared: &PrepareResult) -> Result<DeploymentResult> {
        let image = prepared
            .image_ref
            .clone()
            .expect("prepare always sets image_ref for the image strategy");
        let port = spec.port.expect("validated by `validate`");
        let name = container_name(&spec.service_name, spec.slot);
        let labels = managed_labels(&spec.project_name, &spec.service_name, spec.service_id, spec.slot);

        let mut config = ContainerConfig::new(&name, &image);
        config.env = spec.env.clone();
        config.labels = labels;
        config.port_bindings = vec![PortBinding {
            container_port: port,
            host_port: 0,
            protocol: Protocol::Tcp,
        }];
        if let Some(cmd) = &spec.start_command {
            config.command = Some(cmd.split_whitespace().map(str::to_string).collect());
        }

        let container_id = self.runtime.create_container(&config).await?;
        self.runtime.start_container(&container_id).await?;

        let inspect = self.runtime.inspect_container(&container_id).await?;
        let host_port = inspect
            .ports
            .iter()
            .find(|b| b.container_port == port)
            .map(|b| b.host_port)
            .unwrap_or(port);

        let mut host_ports = HashMap::new();
        host_ports.insert(name, host_port);

        Ok(DeploymentResult {
            container_ids: vec![container_id],
            host_ports,
            primary_port: host_port,
            version: uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
        })
    }

    async fn health_check(&self, spec: &DeploymentSpec, result: &DeploymentResult) -> Result<HealthResult> {
        let container_id = result
            .container_ids
            .first()
            .expect("image strategy always creates one container");
        let inspect = self.runtime.inspect_container(container_id).await?;

        if inspect.state != RunState::Running {
            return Ok(HealthResult { healthy: false });
        }

        if spec.skip_http_check {
            return Ok(HealthResult { healthy: true });
        }

        let url = format!("http://localhost:{}/", result.primary_port);
        let healthy = self
            .http
            .get(&url)
            .send()
            .await
            .map(|r| r.status().is_success() || r.status().is_redirection())
            .unwrap_or(false);
        Ok(HealthResult { healthy })
    }

    async fn stop(&self, container_ids: &[String]) -> Result<()> {
        for id in container_ids {
            self.runtime.stop_container(id, 10).await?;
        }
        Ok(())
    }

    async fn destroy(&self, container_ids: &[String]) -> Result<()> {
        for id in container_ids {
            self.runtime.remove_container(id, true).await?;
        }
        Ok(())
    }
}

//! The `compose` strategy: a multi-service document, topologically sorted
//! by `depends_on`, each service becoming one container on a private
//! project-scoped network. §4.3.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use nebula_runtime::{ContainerConfig, ContainerRuntime, NetworkOpts, PortBinding, Protocol};
use serde::Deserialize;

use crate::error::{OrchestratorError, Result};
use crate::strategy::labels::{container_name, managed_labels, network_name};
use crate::strategy::trait_def::DeploymentStrategy;
use crate::strategy::types::{DeploymentResult, DeploymentSpec, HealthResult, Mode, PrepareResult};

#[derive(Debug, Deserialize)]
struct ComposeDocument {
    services: HashMap<String, ComposeServiceDef>,
}

#[derive(Debug, Deserialize)]
struct ComposeServiceDef {
    image: String,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    environment: HashMap<String, String>,
    port: Option<u16>,
}

/// Names that get the host port exposure when no explicit `port` is set
/// and the service isn't simply the topologically first one. §4.3.
const EXPOSED_SERVICE_NAMES: &[&str] = &["web", "app"];

fn parse(document: &str) -> Result<ComposeDocument> {
    serde_yaml::from_str(document)
        .map_err(|e| OrchestratorError::Validation(format!("invalid compose document: {e}")))
}

/// Kahn's algorithm; a remaining in-degree after processing all nodes
/// means a `depends_on` cycle.
fn topological_order(doc: &ComposeDocument) -> Result<Vec<String>> {
    for def in doc.services.values() {
        for dep in &def.depends_on {
            if !doc.services.contains_key(dep) {
                return Err(OrchestratorError::Validation(format!(
                    "depends_on references unknown service {dep}"
                )));
            }
        }
    }

    let in_degree: HashMap<&str, usize> = doc
        .services
        .iter()
        .map(|(name, def)| (name.as_str(), def.depends_on.len()))
        .collect();

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(name, _)| *name)
        .collect();
    ready.sort(); // deterministic order among equally-ready services

    let mut order = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(name) = ready.pop() {
        if !visited.insert(name) {
            continue;
        }
        order.push(name.to_string());

        let mut newly_ready = Vec::new();
        for (candidate, def) in &doc.services {
            if visited.contains(candidate.as_str()) {
                continue;
            }
            if def.depends_on.iter().all(|d| visited.contains(d.as_str())) {
                newly_ready.push(candidate.as_str());
            }
        }
        newly_ready.sort();
        ready.extend(newly_ready);
        ready.sort();
        ready.dedup();
    }

    if order.len() != doc.services.len() {
        return Err(OrchestratorError::Validation(
            "depends_on graph contains a cycle".into(),
        ));
    }
    Ok(order)
}

pub struct ComposeStrategy {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ComposeStrategy {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl DeploymentStrategy for ComposeStrategy {
    fn mode(&self) -> Mode {
        Mode::Compose
    }

    async fn validate(&self, spec: &DeploymentSpec) -> Result<()> {
        let document = spec
            .compose_document
            .as_deref()
            .ok_or_else(|| OrchestratorError::Validation("compose strategy requires a document".into()))?;
        let doc = parse(document)?;
        topological_order(&doc)?;
        Ok(())
    }

    async fn prepare(&self, spec: &DeploymentSpec) -> Result<PrepareResult> {
        let document = spec.compose_document.as_deref().unwrap_or_default();
        let doc = parse(document)?;
        for def in doc.services.values() {
            self.runtime.pull_image(&def.image, None).await?;
        }
        Ok(PrepareResult {
            image_ref: None,
            build_dir: None,
            build_log: format!("pulled {} compose service images", doc.services.len()),
        })
    }

    async fn deploy(&self, spec: &DeploymentSpec, _prepared: &PrepareResult) -> Result<DeploymentResult> {
        let document = spec.compose_document.as_deref().unwrap_or_default();
        let doc = parse(document)?;
        let order = topological_order(&doc)?;

        let network = network_name(&spec.project_name, spec.slot);
        self.runtime
            .create_network(&network, &NetworkOpts::default())
            .await?;

        let mut created = Vec::new();
        let mut host_ports = HashMap::new();
        let mut primary_port = 0;

        for (index, service_name) in order.iter().enumerate() {
            let def = &doc.services[service_name];
            let name = container_name(service_name, spec.slot);
            let mut env = spec.env.clone();
            env.extend(def.environment.clone());

            let mut config = ContainerConfig::new(&name, &def.image);
            config.env = env;
            config.labels =
                managed_labels(&spec.project_name, service_name, spec.service_id, spec.slot);
            config.networks = vec![network.clone()];

            let exposes = def.port.is_some()
                || EXPOSED_SERVICE_NAMES.contains(&service_name.as_str())
                || index == 0;

            if let Some(port) = def.port.filter(|_| exposes) {
                config.port_bindings = vec![PortBinding {
                    container_port: port,
                    host_port: 0,
                    protocol: Protocol::Tcp,
                }];
            }

            let container_id = match self.runtime.create_container(&config).await {
                Ok(id) => id,
                Err(err) => {
                    let _ = self.destroy(&created).await;
                    return Err(err.into());
                }
            };
            if let Err(err) = self.runtime.start_container(&container_id).await {
                // §4.3: roll back everything created so far in this deployment,
                // including the container that just failed to start.
                created.push(container_id);
                let _ = self.destroy(&created).await;
                return Err(err.into());
            }

            if exposes && def.port.is_some() {
                let inspect = self.runtime.inspect_container(&container_id).await?;
                let port = def.port.unwrap();
                let host_port = inspect
                    .ports
                    .iter()
                    .find(|b| b.container_port == port)
                    .map(|b| b.host_port)
                    .unwrap_or(port);
                host_ports.insert(name, host_port);
                if primary_port == 0 {
                    primary_port = host_port;
                }
            }

            created.push(container_id);
        }

        Ok(DeploymentResult {
            container_ids: created,
            host_ports,
            primary_port,
            version: uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
        })
    }

    async fn health_check(&self, spec: &DeploymentSpec, result: &DeploymentResult) -> Result<HealthResult> {
        for id in &result.container_ids {
            let inspect = self.runtime.inspect_container(id).await?;
            if inspect.state != nebula_runtime::RunState::Running {
                return Ok(HealthResult { healthy: false });
            }
        }
        if spec.skip_http_check || result.primary_port == 0 {
            return Ok(HealthResult { healthy: true });
        }
        let url = format!("http://localhost:{}/", result.primary_port);
        let healthy = reqwest::get(&url)
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

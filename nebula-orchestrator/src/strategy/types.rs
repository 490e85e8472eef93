//! Deployment strategy contract types. §4.3.

use std::collections::HashMap;

use nebula_core::{ProjectId, ServiceId, Slot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Image,
    Source,
    Compose,
}

#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    pub project_id: ProjectId,
    pub project_name: String,
    pub service_id: ServiceId,
    pub service_name: String,
    pub image: Option<String>,
    pub git_repo: Option<String>,
    pub git_branch: Option<String>,
    pub compose_document: Option<String>,
    /// Already layered project env ← service env ← request env, later wins.
    pub env: HashMap<String, String>,
    pub slot: Slot,
    pub port: Option<u16>,
    pub start_command: Option<String>,
    pub skip_http_check: bool,
    pub health_check_attempts: Option<u32>,
    pub health_check_interval_secs: Option<u64>,
    pub registry_auth: Option<nebula_runtime::RegistryAuth>,
}

#[derive(Debug, Clone, Default)]
pub struct PrepareResult {
    pub image_ref: Option<String>,
    pub build_dir: Option<String>,
    pub build_log: String,
}

#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub container_ids: Vec<String>,
    pub host_ports: HashMap<String, u16>,
    pub primary_port: u16,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthResult {
    pub healthy: bool,
}

/// Merge environment layers: project ← service ← request, later wins. §4.3.
pub fn merge_env(
    project: &HashMap<String, String>,
    service: &HashMap<String, String>,
    request: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut merged = project.clone();
    merged.extend(service.clone());
    merged.extend(request.clone());
    merged
}

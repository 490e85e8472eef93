//! Container entity. §3.

use serde::{Deserialize, Serialize};

use crate::ids::{ContainerId, DeploymentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Created,
    Running,
    Stopped,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub deployment_id: DeploymentId,
    /// Assigned by the container runtime, not ours to generate.
    pub runtime_id: String,
    pub name: String,
    pub status: ContainerStatus,
    pub host_port: Option<u16>,
}

impl Container {
    pub fn new(
        deployment_id: DeploymentId,
        runtime_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: ContainerId::new(),
            deployment_id,
            runtime_id: runtime_id.into(),
            name: name.into(),
            status: ContainerStatus::Created,
            host_port: None,
        }
    }
}

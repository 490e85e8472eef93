//! Service entity. §3.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, ServiceId};
use crate::status::{BuilderKind, ServiceKind, ServiceStatus};

/// The synthesized service name legacy (service-less) deploy calls are
/// bound to. §4.4 step 2.
pub const LEGACY_SERVICE_NAME: &str = "main";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub project_id: ProjectId,
    /// Unique within the project.
    pub name: String,
    pub kind: ServiceKind,
    /// `None` for a `database` kind service with no associated build.
    pub builder: Option<BuilderKind>,
    pub repo_url: Option<String>,
    pub repo_branch: Option<String>,
    pub repo_subdirectory: Option<String>,
    pub image: Option<String>,
    pub database_kind: Option<String>,
    pub database_version: Option<String>,
    pub port: Option<u16>,
    pub start_command: Option<String>,
    pub env: HashMap<String, String>,
    pub replicas: u32,
    pub status: ServiceStatus,
}

impl Service {
    pub fn new(project_id: ProjectId, name: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            id: ServiceId::new(),
            project_id,
            name: name.into(),
            kind,
            builder: None,
            repo_url: None,
            repo_branch: None,
            repo_subdirectory: None,
            image: None,
            database_kind: None,
            database_version: None,
            port: None,
            start_command: None,
            env: HashMap::new(),
            replicas: 1,
            status: ServiceStatus::Stopped,
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(self.kind, ServiceKind::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_service_defaults_to_one_replica_and_stopped() {
        let svc = Service::new(ProjectId::new(), "api", ServiceKind::Web);
        assert_eq!(svc.replicas, 1);
        assert_eq!(svc.status, ServiceStatus::Stopped);
        assert!(!svc.is_database());
    }
}

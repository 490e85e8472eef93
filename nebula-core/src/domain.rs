//! Domain and legacy Route entities. §3.

use serde::{Deserialize, Serialize};

use crate::ids::{DomainId, ProjectId, ServiceId};
use crate::status::Slot;

/// A DNS name routed to a service. At most one row per `domain` string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub project_id: ProjectId,
    pub service_id: ServiceId,
    pub domain: String,
    pub path_prefix: String,
    pub active_slot: Slot,
    pub ssl: bool,
}

impl Domain {
    pub fn new(project_id: ProjectId, service_id: ServiceId, domain: impl Into<String>) -> Self {
        Self {
            id: DomainId::new(),
            project_id,
            service_id,
            domain: domain.into(),
            path_prefix: "/".to_string(),
            active_slot: Slot::Blue,
            ssl: false,
        }
    }
}

/// Legacy per-project active-slot pointer, used by the slot arbiter and the
/// orchestrator when a project carries no explicit [`Domain`] rows. §4.6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub project_id: ProjectId,
    pub active_slot: Slot,
}

impl Route {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            active_slot: Slot::Blue,
        }
    }
}

//! Event bus wire shape. §4.1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DeploymentId, ProjectId, ServiceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DeploymentStatus,
    ServiceStatus,
    LogLine,
}

/// One JSON object per event, matching the wire format consumed by
/// downstream streaming endpoints. §6 "Event stream wire format".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub kind: EventKind,
    pub project_id: ProjectId,
    pub service_id: Option<ServiceId>,
    pub deployment_id: Option<DeploymentId>,
    /// Status string or log text, depending on `kind`.
    pub payload: String,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(kind: EventKind, project_id: ProjectId, payload: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            project_id,
            service_id: None,
            deployment_id: None,
            payload: payload.into(),
            error: None,
            timestamp: now,
        }
    }

    pub fn with_service(mut self, service_id: ServiceId) -> Self {
        self.service_id = Some(service_id);
        self
    }

    pub fn with_deployment(mut self, deployment_id: DeploymentId) -> Self {
        self.deployment_id = Some(deployment_id);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Matches a subscription's `project_filter` against an event's
/// `project_id`. An empty filter means match-all. §4.1.
pub fn matches_filter(event: &StatusEvent, project_filter: Option<ProjectId>) -> bool {
    match project_filter {
        None => true,
        Some(filter) => filter == event.project_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_filter_matches_all() {
        let now = Utc.timestamp_opt(0, 0).unwrap();
        let event = StatusEvent::new(EventKind::DeploymentStatus, ProjectId::new(), "running", now);
        assert!(matches_filter(&event, None));
    }

    #[test]
    fn filter_matches_only_same_project() {
        let now = Utc.timestamp_opt(0, 0).unwrap();
        let project = ProjectId::new();
        let event = StatusEvent::new(EventKind::DeploymentStatus, project, "running", now);
        assert!(matches_filter(&event, Some(project)));
        assert!(!matches_filter(&event, Some(ProjectId::new())));
    }
}

//! Deployment entity and its timestamp/terminal-status invariants. §3, §4.5.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};
use crate::ids::{DeploymentId, ProjectId, ServiceId};
use crate::status::{DeploymentStatus, Slot, Transition};

/// A frozen copy of the source configuration and environment a deployment
/// was launched with, taken at creation time so later edits to the Service
/// row never retroactively change a past deployment's record. §3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    pub image: Option<String>,
    pub repo_url: Option<String>,
    pub repo_branch: Option<String>,
    pub repo_subdirectory: Option<String>,
    pub compose_document: Option<String>,
    pub env: HashMap<String, String>,
    pub port: Option<u16>,
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub project_id: ProjectId,
    pub service_id: ServiceId,
    /// Monotonic, e.g. `v1706450000`.
    pub version: String,
    pub slot: Slot,
    pub status: DeploymentStatus,
    pub snapshot: DeploymentSnapshot,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub logs: Option<String>,
}

impl Deployment {
    pub fn new(
        project_id: ProjectId,
        service_id: ServiceId,
        slot: Slot,
        snapshot: DeploymentSnapshot,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DeploymentId::new(),
            project_id,
            service_id,
            version: version_string(created_at),
            slot,
            status: DeploymentStatus::Pending,
            snapshot,
            error_message: None,
            created_at,
            started_at: None,
            finished_at: None,
            logs: None,
        }
    }

    /// Advance `status` via `transition`, maintaining the `started_at` /
    /// `finished_at` invariants from §3: the former is set on the first
    /// transition out of `pending`, the latter exactly once, on reaching a
    /// terminal status.
    pub fn apply(
        &mut self,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<DeploymentStatus, Error> {
        let next = self.status.apply(transition)?;

        if self.status == DeploymentStatus::Pending && self.started_at.is_none() {
            self.started_at = Some(now);
        }

        // `running -> stopped` (supersession) is a legal edge between two
        // terminal statuses; `finished_at` was already stamped when this
        // deployment first reached `running`; see struct doc.
        if next.is_terminal() && self.finished_at.is_none() {
            self.finished_at = Some(now);
        }

        self.status = next;
        Ok(next)
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), Error> {
        self.error_message = Some(message.into());
        let transition = match self.status {
            DeploymentStatus::Preparing => Transition::PrepareFailed,
            DeploymentStatus::Deploying => Transition::DeployFailed,
            other => {
                return Err(Error::custom(
                    ErrorKind::Internal,
                    format!("cannot fail a deployment in status {other}"),
                ))
            }
        };
        self.apply(transition, now)?;
        Ok(())
    }
}

fn version_string(created_at: DateTime<Utc>) -> String {
    format!("v{}", created_at.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn version_is_epoch_prefixed() {
        let d = Deployment::new(
            ProjectId::new(),
            ServiceId::new(),
            Slot::Blue,
            DeploymentSnapshot::default(),
            at(1_700_000_000),
        );
        assert_eq!(d.version, "v1700000000");
    }

    #[test]
    fn started_at_set_on_first_transition_out_of_pending() {
        let mut d = Deployment::new(
            ProjectId::new(),
            ServiceId::new(),
            Slot::Blue,
            DeploymentSnapshot::default(),
            at(0),
        );
        assert!(d.started_at.is_none());
        d.apply(Transition::PipelineStarted, at(5)).unwrap();
        assert_eq!(d.started_at, Some(at(5)));
    }

    #[test]
    fn finished_at_set_exactly_once_on_terminal_transition() {
        let mut d = Deployment::new(
            ProjectId::new(),
            ServiceId::new(),
            Slot::Blue,
            DeploymentSnapshot::default(),
            at(0),
        );
        d.apply(Transition::PipelineStarted, at(1)).unwrap();
        d.apply(Transition::PrepareSucceeded, at(2)).unwrap();
        d.apply(Transition::DeploySucceeded, at(3)).unwrap();
        assert_eq!(d.finished_at, Some(at(3)));
        assert_eq!(d.status, DeploymentStatus::Running);

        // superseded later: status moves on to stopped, but finished_at does
        // not move — it was already stamped when `running` was reached.
        d.apply(Transition::Superseded, at(4)).unwrap();
        assert_eq!(d.status, DeploymentStatus::Stopped);
        assert_eq!(d.finished_at, Some(at(3)));

        // stopped has no outgoing transitions
        assert!(d.apply(Transition::Superseded, at(5)).is_err());
    }

    #[test]
    fn fail_transitions_from_preparing_and_deploying() {
        let mut d = Deployment::new(
            ProjectId::new(),
            ServiceId::new(),
            Slot::Blue,
            DeploymentSnapshot::default(),
            at(0),
        );
        d.apply(Transition::PipelineStarted, at(1)).unwrap();
        d.fail("build failed", at(2)).unwrap();
        assert_eq!(d.status, DeploymentStatus::Failed);
        assert_eq!(d.error_message.as_deref(), Some("build failed"));
        assert_eq!(d.finished_at, Some(at(2)));
    }
}

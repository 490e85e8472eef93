//! Slot arbiter (C4). §4.6.

use nebula_core::{DeploymentStatus, ServiceId, Slot};
use nebula_dal::DeploymentRepository;

use crate::error::Result;

/// Target the opposite slot of the service's most recent `running`
/// deployment, or `blue` if none exists.
pub async fn target_slot(
    deployments: &dyn DeploymentRepository,
    service_id: ServiceId,
) -> Result<Slot> {
    let history = deployments.list_by_service_id(service_id).await?;
    let latest_running = history
        .iter()
        .find(|d| d.status == DeploymentStatus::Running);

    Ok(match latest_running {
        Some(d) => d.slot.opposite(),
        None => Slot::Blue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nebula_core::{Deployment, DeploymentSnapshot, ProjectId};
    use nebula_dal::SqliteDal;

    async fn dal() -> SqliteDal {
        SqliteDal::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn no_deployments_targets_blue() {
        let dal = dal().await;
        let slot = target_slot(&dal, ServiceId::new()).await.unwrap();
        assert_eq!(slot, Slot::Blue);
    }

    #[tokio::test]
    async fn targets_opposite_of_latest_running() {
        let dal = dal().await;
        let service_id = ServiceId::new();
        let project_id = ProjectId::new();

        let mut running = Deployment::new(
            project_id,
            service_id,
            Slot::Blue,
            DeploymentSnapshot::default(),
            chrono::Utc.timestamp_opt(0, 0).unwrap(),
        );
        running.status = DeploymentStatus::Running;
        DeploymentRepository::create(&dal, &running).await.unwrap();

        let slot = target_slot(&dal, service_id).await.unwrap();
        assert_eq!(slot, Slot::Green);
    }

    #[tokio::test]
    async fn no_running_row_targets_blue_even_with_history() {
        let dal = dal().await;
        let service_id = ServiceId::new();
        let project_id = ProjectId::new();

        let mut failed = Deployment::new(
            project_id,
            service_id,
            Slot::Green,
            DeploymentSnapshot::default(),
            chrono::Utc.timestamp_opt(0, 0).unwrap(),
        );
        failed.status = DeploymentStatus::Failed;
        DeploymentRepository::create(&dal, &failed).await.unwrap();

        let slot = target_slot(&dal, service_id).await.unwrap();
        assert_eq!(slot, Slot::Blue);
    }
}

//! Repository contracts (C9). One per entity in §3, sharing the standard
//! `Create / Get / Update / Delete / List` shape plus the `GetBy*` and
//! `ListBy*` access patterns the orchestrator needs. §6.
//!
//! `GetBy*` returns `Ok(None)` (not an error) when no row matches.

use async_trait::async_trait;
use nebula_core::{
    Container, ContainerId, Deployment, DeploymentId, Domain, DomainId, Project, ProjectId,
    Route, Service, ServiceId, Slot,
};

use crate::error::Result;

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> Result<()>;
    async fn get(&self, id: ProjectId) -> Result<Option<Project>>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Project>>;
    async fn update(&self, project: &Project) -> Result<()>;
    async fn delete(&self, id: ProjectId) -> Result<()>;
    async fn list(&self) -> Result<Vec<Project>>;
}

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn create(&self, service: &Service) -> Result<()>;
    async fn get(&self, id: ServiceId) -> Result<Option<Service>>;
    async fn get_by_project_id_and_name(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Option<Service>>;
    async fn update(&self, service: &Service) -> Result<()>;
    async fn delete(&self, id: ServiceId) -> Result<()>;
    async fn list_by_project_id(&self, project_id: ProjectId) -> Result<Vec<Service>>;
}

#[async_trait]
pub trait DeploymentRepository: Send + Sync {
    async fn create(&self, deployment: &Deployment) -> Result<()>;
    async fn get(&self, id: DeploymentId) -> Result<Option<Deployment>>;
    async fn update(&self, deployment: &Deployment) -> Result<()>;
    async fn delete(&self, id: DeploymentId) -> Result<()>;
    async fn list_by_service_id(&self, service_id: ServiceId) -> Result<Vec<Deployment>>;
    /// Most recent deployment created for `service_id` in `slot`, by
    /// creation time descending. Used by the slot arbiter (§4.6) and by
    /// the orchestrator to find the deployment to supersede.
    async fn get_by_service_id_and_slot(
        &self,
        service_id: ServiceId,
        slot: Slot,
    ) -> Result<Option<Deployment>>;
}

#[async_trait]
pub trait ContainerRepository: Send + Sync {
    async fn create(&self, container: &Container) -> Result<()>;
    async fn get(&self, id: ContainerId) -> Result<Option<Container>>;
    async fn update(&self, container: &Container) -> Result<()>;
    async fn delete(&self, id: ContainerId) -> Result<()>;
    async fn list_by_deployment_id(&self, deployment_id: DeploymentId) -> Result<Vec<Container>>;
}

#[async_trait]
pub trait DomainRepository: Send + Sync {
    async fn create(&self, domain: &Domain) -> Result<()>;
    async fn get(&self, id: DomainId) -> Result<Option<Domain>>;
    async fn get_by_domain(&self, domain: &str) -> Result<Option<Domain>>;
    async fn update(&self, domain: &Domain) -> Result<()>;
    async fn delete(&self, id: DomainId) -> Result<()>;
    async fn list_by_project_id(&self, project_id: ProjectId) -> Result<Vec<Domain>>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn upsert(&self, route: &Route) -> Result<()>;
    async fn get(&self, project_id: ProjectId) -> Result<Option<Route>>;
    async fn delete(&self, project_id: ProjectId) -> Result<()>;
}

//! The deploy engine (C6): resolves a request to a strategy, runs
//! `Validate` synchronously, then drives `Prepare`/`Deploy`/`HealthCheck`
//! in a detached background task so the caller never blocks on a build.
//! §4.4.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nebula_core::{
    BuilderKind, Container, ContainerStatus, Deployment, DeploymentId, DeploymentSnapshot,
    DeploymentStatus, EventKind, Project, Route, Service, ServiceId, ServiceKind, StatusEvent,
    Transition,
};
use nebula_dal::{
    ContainerRepository, DeploymentRepository, DomainRepository, ProjectRepository,
    RouteRepository, ServiceRepository,
};
use nebula_events::EventBus;
use nebula_proxy::{ProxyClient, Route as ProxyRoute, Upstream};
use tracing::{error, info, instrument, warn};

use crate::error::{OrchestratorError, Result};
use crate::slot_arbiter;
use crate::strategy::{
    merge_env, DeploymentResult, DeploymentSpec, DeploymentStrategy, ImageStrategy, Mode,
    SourceStrategy, DEFAULT_HEALTH_CHECK_ATTEMPTS, DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
};
use crate::tracing_layer::InMemoryLogRecorder;

#[derive(Debug, Clone, Default)]
pub struct DeployImageRequest {
    pub project_name: String,
    pub service_name: Option<String>,
    pub image: String,
    pub port: u16,
    pub env: HashMap<String, String>,
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeploySourceRequest {
    pub project_name: String,
    pub service_name: Option<String>,
    pub git_repo: String,
    pub git_branch: String,
    pub port: Option<u16>,
    pub env: HashMap<String, String>,
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeployServiceByNameRequest {
    pub project_name: String,
    pub service_name: String,
    pub env: HashMap<String, String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    projects: Arc<dyn ProjectRepository>,
    services: Arc<dyn ServiceRepository>,
    deployments: Arc<dyn DeploymentRepository>,
    containers: Arc<dyn ContainerRepository>,
    domains: Arc<dyn DomainRepository>,
    routes: Arc<dyn RouteRepository>,
    image: Arc<ImageStrategy>,
    source: Arc<SourceStrategy>,
    compose: Arc<dyn DeploymentStrategy>,
    proxy: Arc<dyn ProxyClient>,
    events: EventBus,
    log_recorder: Arc<InMemoryLogRecorder>,
    /// Operator-configured health-check ceiling/interval, §11; `None`
    /// leaves each strategy's own default (§4.3) untouched.
    health_check_attempts: Option<u32>,
    health_check_interval_secs: Option<u64>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        services: Arc<dyn ServiceRepository>,
        deployments: Arc<dyn DeploymentRepository>,
        containers: Arc<dyn ContainerRepository>,
        domains: Arc<dyn DomainRepository>,
        routes: Arc<dyn RouteRepository>,
        image: Arc<ImageStrategy>,
        source: Arc<SourceStrategy>,
        compose: Arc<dyn DeploymentStrategy>,
        proxy: Arc<dyn ProxyClient>,
        events: EventBus,
        log_recorder: Arc<InMemoryLogRecorder>,
    ) -> Self {
        Self {
            projects,
            services,
            deployments,
            containers,
            domains,
            routes,
            image,
            source,
            compose,
            proxy,
            events,
            log_recorder,
            health_check_attempts: None,
            health_check_interval_secs: None,
        }
    }

    /// Overrides the default health-check attempts/interval every
    /// subsequent deployment is spec'd with. §11.
    pub fn with_health_check_defaults(mut self, attempts: u32, interval_secs: u64) -> Self {
        self.health_check_attempts = Some(attempts);
        self.health_check_interval_secs = Some(interval_secs);
        self
    }

    fn strategy_for(&self, mode: Mode) -> Arc<dyn DeploymentStrategy> {
        match mode {
            Mode::Image => self.image.clone() as Arc<dyn DeploymentStrategy>,
            Mode::Source => self.source.clone() as Arc<dyn DeploymentStrategy>,
            Mode::Compose => self.compose.clone(),
        }
    }

    async fn resolve_project(&self, project_name: &str) -> Result<Project> {
        self.projects
            .get_by_name(project_name)
            .await?
            .ok_or_else(|| OrchestratorError::ProjectNotFound(project_name.to_string()))
    }

    /// Finds the named service, or synthesizes and persists the legacy
    /// `main` web service when no name is given. §4.4 step 2.
    async fn resolve_or_create_service(
        &self,
        project: &Project,
        service_name: Option<&str>,
    ) -> Result<Service> {
        let name = service_name.unwrap_or(nebula_core::service::LEGACY_SERVICE_NAME);
        if let Some(service) = self
            .services
            .get_by_project_id_and_name(project.id, name)
            .await?
        {
            return Ok(service);
        }
        let service = Service::new(project.id, name, ServiceKind::Web);
        ServiceRepository::create(self.services.as_ref(), &service).await?;
        Ok(service)
    }

    pub async fn get_deployment(&self, deployment_id: DeploymentId) -> Result<Deployment> {
        self.deployments
            .get(deployment_id)
            .await?
            .ok_or_else(|| OrchestratorError::DeploymentNotFound(deployment_id.to_string()))
    }

    pub async fn list_deployments(&self, service_id: ServiceId) -> Result<Vec<Deployment>> {
        Ok(self.deployments.list_by_service_id(service_id).await?)
    }

    pub async fn deploy_image(&self, request: DeployImageRequest) -> Result<Deployment> {
        let project = self.resolve_project(&request.project_name).await?;
        let mut service = self
            .resolve_or_create_service(&project, request.service_name.as_deref())
            .await?;

        service.builder = Some(BuilderKind::PreBuiltImage);
        service.image = Some(request.image.clone());
        service.port = Some(request.port);
        service.start_command = request.start_command.clone();
        ServiceRepository::update(self.services.as_ref(), &service).await?;

        let snapshot = DeploymentSnapshot {
            image: Some(request.image),
            port: Some(request.port),
            start_command: request.start_command,
            env: request.env.clone(),
            ..Default::default()
        };

        self.start_deployment(project, service, Mode::Image, snapshot, request.env)
            .await
    }

    pub async fn deploy_source(&self, request: DeploySourceRequest) -> Result<Deployment> {
        let project = self.resolve_project(&request.project_name).await?;
        let mut service = self
            .resolve_or_create_service(&project, request.service_name.as_deref())
            .await?;

        service.repo_url = Some(request.git_repo.clone());
        service.repo_branch = Some(request.git_branch.clone());
        service.port = request.port;
        service.start_command = request.start_command.clone();
        ServiceRepository::update(self.services.as_ref(), &service).await?;

        let snapshot = DeploymentSnapshot {
            repo_url: Some(request.git_repo),
            repo_branch: Some(request.git_branch),
            port: request.port,
            start_command: request.start_command,
            env: request.env.clone(),
            ..Default::default()
        };

        self.start_deployment(project, service, Mode::Source, snapshot, request.env)
            .await
    }

    /// Re-deploys a persisted service using whatever configuration (image
    /// or repo) it was last saved with. §4.4 step 1.
    pub async fn deploy_service_by_name(&self, request: DeployServiceByNameRequest) -> Result<Deployment> {
        let project = self.resolve_project(&request.project_name).await?;
        let service = self
            .services
            .get_by_project_id_and_name(project.id, &request.service_name)
            .await?
            .ok_or_else(|| OrchestratorError::ServiceNotFound(request.service_name.clone()))?;

        let mode = if service.image.is_some() {
            Mode::Image
        } else if service.repo_url.is_some() {
            Mode::Source
        } else {
            return Err(OrchestratorError::Validation(
                "service has neither an image nor a repository configured".into(),
            ));
        };

        let snapshot = DeploymentSnapshot {
            image: service.image.clone(),
            repo_url: service.repo_url.clone(),
            repo_branch: service.repo_branch.clone(),
            repo_subdirectory: service.repo_subdirectory.clone(),
            port: service.port,
            start_command: service.start_command.clone(),
            env: request.env.clone(),
            ..Default::default()
        };

        self.start_deployment(project, service, mode, snapshot, request.env)
            .await
    }

    async fn start_deployment(
        &self,
        project: Project,
        service: Service,
        mode: Mode,
        snapshot: DeploymentSnapshot,
        request_env: HashMap<String, String>,
    ) -> Result<Deployment> {
        let strategy = self.strategy_for(mode);
        let slot = slot_arbiter::target_slot(self.deployments.as_ref(), service.id).await?;
        let env = merge_env(&project.env, &service.env, &request_env);

        let spec = DeploymentSpec {
            project_id: project.id,
            project_name: project.name.clone(),
            service_id: service.id,
            service_name: service.name.clone(),
            image: snapshot.image.clone(),
            git_repo: snapshot.repo_url.clone(),
            git_branch: snapshot.repo_branch.clone(),
            compose_document: snapshot.compose_document.clone(),
            env,
            slot,
            port: snapshot.port,
            start_command: snapshot.start_command.clone(),
            skip_http_check: service.is_database(),
            health_check_attempts: self.health_check_attempts,
            health_check_interval_secs: self.health_check_interval_secs,
            registry_auth: None,
        };

        strategy.validate(&spec).await?;

        let mut deployment = Deployment::new(project.id, service.id, slot, snapshot, Utc::now());
        DeploymentRepository::create(self.deployments.as_ref(), &deployment).await?;
        info!(deployment_id = %deployment.id, service = %service.name, slot = %slot, "deployment queued");

        let orchestrator = self.clone();
        let deployment_id = deployment.id;
        tokio::spawn(async move {
            orchestrator.run_pipeline(deployment_id, spec, strategy).await;
        });

        Ok(deployment)
    }

    /// Runs `Prepare` → `Deploy` → `HealthCheck`, persisting status
    /// transitions and container rows as it goes, decoupled from the
    /// caller's request lifetime. §4.4 steps 5-10.
    ///
    /// Instrumented so every `tracing` call this future makes (including
    /// ones made by the strategy it drives) is captured by
    /// [`crate::tracing_layer::DeployLayer`] against this deployment id.
    #[instrument(skip_all, fields(deployment_id = %deployment_id))]
    async fn run_pipeline(
        &self,
        deployment_id: DeploymentId,
        spec: DeploymentSpec,
        strategy: Arc<dyn DeploymentStrategy>,
    ) {
        if let Err(err) = self
            .run_pipeline_inner(deployment_id, &spec, strategy.as_ref())
            .await
        {
            error!(%deployment_id, error = %err, "deployment pipeline failed");
            self.mark_failed(deployment_id, err.to_string()).await;
            self.publish_status(&spec, Some(deployment_id), "failed", Some(err.to_string()))
                .await;
        }
    }

    /// Drives `prepare`/`deploy`/`health_check` while the deployment is
    /// still in a failable status (`preparing`/`deploying`). A failure here
    /// propagates to the caller, which records it via [`Deployment::fail`];
    /// a failure once the deployment has already reached `running` (in
    /// [`Self::finish_success`]) is handled separately and does not revert
    /// the deployment to `failed` — §4.5 has no such edge.
    async fn run_pipeline_inner(
        &self,
        deployment_id: DeploymentId,
        spec: &DeploymentSpec,
        strategy: &dyn DeploymentStrategy,
    ) -> Result<()> {
        self.transition(deployment_id, Transition::PipelineStarted).await?;

        let prepared = strategy.prepare(spec).await?;
        self.transition(deployment_id, Transition::PrepareSucceeded).await?;

        let deploy_result = strategy.deploy(spec, &prepared).await?;
        self.persist_containers(deployment_id, &deploy_result).await?;

        if !self.wait_for_health(spec, strategy, &deploy_result).await? {
            let _ = strategy.destroy(&deploy_result.container_ids).await;
            return Err(OrchestratorError::Validation(
                "deployment did not become healthy within the configured attempts".into(),
            ));
        }

        self.transition(deployment_id, Transition::DeploySucceeded).await?;
        if let Err(err) = self.finish_success(deployment_id, spec, &deploy_result).await {
            warn!(%deployment_id, error = %err, "post-deploy traffic switch failed for a running deployment");
        }
        Ok(())
    }

    async fn wait_for_health(
        &self,
        spec: &DeploymentSpec,
        strategy: &dyn DeploymentStrategy,
        result: &DeploymentResult,
    ) -> Result<bool> {
        let attempts = spec.health_check_attempts.unwrap_or(DEFAULT_HEALTH_CHECK_ATTEMPTS);
        let interval = Duration::from_secs(
            spec.health_check_interval_secs.unwrap_or(DEFAULT_HEALTH_CHECK_INTERVAL_SECS),
        );

        for attempt in 1..=attempts.max(1) {
            let health = strategy.health_check(spec, result).await?;
            if health.healthy {
                return Ok(true);
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Ok(false)
    }

    async fn persist_containers(&self, deployment_id: DeploymentId, result: &DeploymentResult) -> Result<()> {
        for container_id in &result.container_ids {
            let host_port = result.host_ports.values().next().copied();
            let mut container = Container::new(deployment_id, container_id.clone(), container_id.clone());
            container.status = ContainerStatus::Running;
            container.host_port = host_port;
            ContainerRepository::create(self.containers.as_ref(), &container).await?;
        }
        Ok(())
    }

    async fn finish_success(
        &self,
        deployment_id: DeploymentId,
        spec: &DeploymentSpec,
        result: &DeploymentResult,
    ) -> Result<()> {
        self.route_traffic(spec, result).await?;
        self.publish_status(spec, Some(deployment_id), "running", None).await;
        self.supersede_opposite_slot(spec).await?;
        Ok(())
    }

    /// Points the project's route (and any domain rows bound to the
    /// service) at the slot that just went healthy. §4.6, §4.7.
    async fn route_traffic(&self, spec: &DeploymentSpec, result: &DeploymentResult) -> Result<()> {
        let mut route = self
            .routes
            .get(spec.project_id)
            .await?
            .unwrap_or_else(|| Route::new(spec.project_id));
        route.active_slot = spec.slot;
        self.routes.upsert(&route).await?;

        let domains = self.domains.list_by_project_id(spec.project_id).await?;
        for mut domain in domains.into_iter().filter(|d| d.service_id == spec.service_id) {
            domain.active_slot = spec.slot;
            DomainRepository::update(self.domains.as_ref(), &domain).await?;

            let upstream = Upstream {
                host: "localhost".to_string(),
                port: result.primary_port,
            };
            self.proxy
                .add_route(ProxyRoute::new(domain.domain.clone(), upstream, spec.slot))
                .await
                .map_err(|e| OrchestratorError::Validation(format!("proxy route update failed: {e}")))?;
            self.proxy
                .switch_traffic(&domain.domain, spec.slot)
                .await
                .map_err(|e| OrchestratorError::Validation(format!("proxy switch failed: {e}")))?;
        }
        Ok(())
    }

    /// Stops the previous deployment in the opposite slot for this service,
    /// once the new one is confirmed healthy. §4.5, §4.6.
    async fn supersede_opposite_slot(&self, spec: &DeploymentSpec) -> Result<()> {
        let opposite = spec.slot.opposite();
        let candidate = self
            .deployments
            .get_by_service_id_and_slot(spec.service_id, opposite)
            .await?;

        let Some(mut previous) = candidate else {
            return Ok(());
        };
        if previous.status != DeploymentStatus::Running {
            return Ok(());
        }

        let containers = self.containers.list_by_deployment_id(previous.id).await?;
        let container_ids: Vec<String> = containers.iter().map(|c| c.runtime_id.clone()).collect();
        let strategy = self.strategy_for(Mode::Image); // only `image_ref`-independent ops are used
        if let Err(err) = strategy.stop(&container_ids).await {
            warn!(deployment_id = %previous.id, error = %err, "failed to stop superseded deployment's containers");
        }

        previous.apply(Transition::Superseded, Utc::now())?;
        previous.logs = self.log_recorder.take(previous.id).or(previous.logs.take());
        DeploymentRepository::update(self.deployments.as_ref(), &previous).await?;
        Ok(())
    }

    async fn transition(&self, deployment_id: DeploymentId, transition: Transition) -> Result<()> {
        let mut deployment = self.get_deployment(deployment_id).await?;
        deployment.apply(transition, Utc::now())?;
        DeploymentRepository::update(self.deployments.as_ref(), &deployment).await?;
        Ok(())
    }

    async fn mark_failed(&self, deployment_id: DeploymentId, message: String) {
        if let Ok(mut deployment) = self.get_deployment(deployment_id).await {
            let _ = deployment.fail(message, Utc::now());
            deployment.logs = self.log_recorder.take(deployment_id);
            let _ = DeploymentRepository::update(self.deployments.as_ref(), &deployment).await;
        }
    }

    async fn publish_status(
        &self,
        spec: &DeploymentSpec,
        deployment_id: Option<DeploymentId>,
        payload: &str,
        error: Option<String>,
    ) {
        let mut event = StatusEvent::new(EventKind::DeploymentStatus, spec.project_id, payload, Utc::now())
            .with_service(spec.service_id);
        if let Some(deployment_id) = deployment_id {
            event = event.with_deployment(deployment_id);
        }
        if let Some(error) = error {
            event = event.with_error(error);
        }
        self.events.publish(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nebula_builder::BuilderRegistry;
    use nebula_core::{Project, Service, ServiceKind, Slot};
    use nebula_dal::SqliteDal;
    use nebula_proxy::InMemoryProxyClient;
    use nebula_runtime::{
        BuildOutput, ContainerConfig, ContainerInspect, LogStreamFuture, NetworkOpts, RegistryAuth,
        Result as RuntimeResult, RunState, VolumeOpts,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always creates successfully and reports the container as running and
    /// healthy, without touching a real daemon or network.
    struct HealthyRuntime {
        next_id: AtomicUsize,
    }

    impl HealthyRuntime {
        fn new() -> Self {
            Self { next_id: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ContainerRuntime for HealthyRuntime {
        async fn pull_image(&self, _image: &str, _auth: Option<&RegistryAuth>) -> RuntimeResult<()> {
            Ok(())
        }
        async fn build_image(&self, _context_dir: &str, _image_name: &str) -> RuntimeResult<BuildOutput> {
            unimplemented!()
        }
        async fn create_container(&self, _config: &ContainerConfig) -> RuntimeResult<String> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(format!("container-{id}"))
        }
        async fn start_container(&self, _id: &str) -> RuntimeResult<()> {
            Ok(())
        }
        async fn stop_container(&self, _id: &str, _timeout_secs: u64) -> RuntimeResult<()> {
            Ok(())
        }
        async fn restart_container(&self, _id: &str, _timeout_secs: u64) -> RuntimeResult<()> {
            Ok(())
        }
        async fn remove_container(&self, _id: &str, _force: bool) -> RuntimeResult<()> {
            Ok(())
        }
        async fn inspect_container(&self, _id: &str) -> RuntimeResult<ContainerInspect> {
            Ok(ContainerInspect {
                state: RunState::Running,
                healthy: Some(true),
                ports: vec![],
                labels: Default::default(),
            })
        }
        async fn container_logs(&self, _id: &str, _options: nebula_runtime::LogOptions) -> RuntimeResult<LogStreamFuture> {
            Ok(Box::pin(tokio_stream::iter(vec![])))
        }
        async fn create_network(&self, _name: &str, _opts: &NetworkOpts) -> RuntimeResult<()> {
            Ok(())
        }
        async fn create_volume(&self, _name: &str, _opts: &VolumeOpts) -> RuntimeResult<()> {
            Ok(())
        }
        async fn ping(&self) -> RuntimeResult<()> {
            Ok(())
        }
    }

    async fn test_orchestrator() -> (Orchestrator, Arc<SqliteDal>) {
        let dal = Arc::new(SqliteDal::connect("sqlite::memory:").await.unwrap());
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(HealthyRuntime::new());
        let image = Arc::new(ImageStrategy::new(runtime.clone()));
        let source = Arc::new(SourceStrategy::new(
            runtime.clone(),
            Arc::new(BuilderRegistry::new()),
            std::env::temp_dir(),
        ));
        let compose: Arc<dyn DeploymentStrategy> = Arc::new(crate::strategy::ComposeStrategy::new(runtime));
        let proxy: Arc<dyn ProxyClient> = Arc::new(InMemoryProxyClient::new());

        let orchestrator = Orchestrator::new(
            dal.clone(),
            dal.clone(),
            dal.clone(),
            dal.clone(),
            dal.clone(),
            dal.clone(),
            image,
            source,
            compose,
            proxy,
            EventBus::new(),
            Arc::new(InMemoryLogRecorder::new()),
        );
        (orchestrator, dal)
    }

    /// Polls until the deployment leaves its non-terminal statuses or the
    /// attempt budget is exhausted, since the pipeline runs detached.
    async fn wait_for_terminal(orchestrator: &Orchestrator, id: DeploymentId) -> Deployment {
        for _ in 0..200 {
            let deployment = orchestrator.get_deployment(id).await.unwrap();
            if deployment.status.is_terminal() {
                return deployment;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("deployment {id} did not reach a terminal status in time");
    }

    #[tokio::test]
    async fn deploy_service_by_name_reaches_running_and_switches_proxy_route() {
        let (orchestrator, dal) = test_orchestrator().await;

        let project = Project::new("acme", "Acme");
        ProjectRepository::create(dal.as_ref(), &project).await.unwrap();

        let mut service = Service::new(project.id, "postgres", ServiceKind::Database);
        service.image = Some("postgres:16".to_string());
        service.port = Some(5432);
        ServiceRepository::create(dal.as_ref(), &service).await.unwrap();

        let domain = nebula_core::Domain::new(project.id, service.id, "db.acme.example");
        DomainRepository::create(dal.as_ref(), &domain).await.unwrap();

        let deployment = orchestrator
            .deploy_service_by_name(DeployServiceByNameRequest {
                project_name: "acme".to_string(),
                service_name: "postgres".to_string(),
                env: HashMap::new(),
            })
            .await
            .unwrap();
        assert_eq!(deployment.status, DeploymentStatus::Pending);

        let finished = wait_for_terminal(&orchestrator, deployment.id).await;
        assert_eq!(finished.status, DeploymentStatus::Running);
        assert!(finished.error_message.is_none());

        let containers = ContainerRepository::list_by_deployment_id(dal.as_ref(), deployment.id)
            .await
            .unwrap();
        assert_eq!(containers.len(), 1);

        let route = RouteRepository::get(dal.as_ref(), project.id).await.unwrap().unwrap();
        assert_eq!(route.active_slot, finished.slot);

        let updated_domain = DomainRepository::get_by_domain(dal.as_ref(), "db.acme.example")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated_domain.active_slot, finished.slot);
    }

    #[tokio::test]
    async fn redeploying_supersedes_the_previous_running_deployment() {
        let (orchestrator, dal) = test_orchestrator().await;

        let project = Project::new("acme", "Acme");
        ProjectRepository::create(dal.as_ref(), &project).await.unwrap();

        let mut service = Service::new(project.id, "postgres", ServiceKind::Database);
        service.image = Some("postgres:16".to_string());
        service.port = Some(5432);
        ServiceRepository::create(dal.as_ref(), &service).await.unwrap();

        let request = DeployServiceByNameRequest {
            project_name: "acme".to_string(),
            service_name: "postgres".to_string(),
            env: HashMap::new(),
        };

        let first = orchestrator.deploy_service_by_name(request.clone()).await.unwrap();
        let first = wait_for_terminal(&orchestrator, first.id).await;
        assert_eq!(first.status, DeploymentStatus::Running);

        let second = orchestrator.deploy_service_by_name(request).await.unwrap();
        assert_ne!(second.slot, first.slot, "the slot arbiter should alternate slots");
        let second = wait_for_terminal(&orchestrator, second.id).await;
        assert_eq!(second.status, DeploymentStatus::Running);

        let superseded = orchestrator.get_deployment(first.id).await.unwrap();
        assert_eq!(superseded.status, DeploymentStatus::Stopped);
    }

    #[tokio::test]
    async fn validation_failure_does_not_persist_a_deployment_row() {
        let (orchestrator, dal) = test_orchestrator().await;

        let project = Project::new("acme", "Acme");
        ProjectRepository::create(dal.as_ref(), &project).await.unwrap();

        let result = orchestrator
            .deploy_image(DeployImageRequest {
                project_name: "acme".to_string(),
                service_name: None,
                image: String::new(),
                port: 8080,
                env: HashMap::new(),
                start_command: None,
            })
            .await;
        assert!(result.is_err());

        let service = dal
            .get_by_project_id_and_name(project.id, nebula_core::service::LEGACY_SERVICE_NAME)
            .await
            .unwrap()
            .unwrap();
        let deployments = orchestrator.list_deployments(service.id).await.unwrap();
        assert!(deployments.is_empty());
    }

    #[tokio::test]
    async fn deploying_an_unknown_project_fails_with_not_found() {
        let (orchestrator, _dal) = test_orchestrator().await;

        let result = orchestrator
            .deploy_image(DeployImageRequest {
                project_name: "does-not-exist".to_string(),
                service_name: None,
                image: "nginx".to_string(),
                port: 80,
                env: HashMap::new(),
                start_command: None,
            })
            .await;

        assert!(matches!(result, Err(OrchestratorError::ProjectNotFound(_))));
    }
}

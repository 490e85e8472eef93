mod args;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use nebula_builder::{BuilderRegistry, DockerfileBuilder, PreBuiltImageBuilder, SourceGeneratorBuilder};
use nebula_core::{DeploymentId, Project};
use nebula_dal::{ProjectRepository, SqliteDal};
use nebula_events::EventBus;
use nebula_orchestrator::strategy::{ComposeStrategy, DeploymentStrategy, ImageStrategy, SourceStrategy};
use nebula_orchestrator::tracing_layer::InMemoryLogRecorder;
use nebula_orchestrator::{
    DeployImageRequest, DeployServiceByNameRequest, DeploySourceRequest, LogRelay, Orchestrator,
};
use nebula_proxy::{HttpProxyClient, ProxyClient};
use nebula_runtime::docker::DockerRuntime;
use nebula_runtime::ContainerRuntime;
use tracing::info;

use args::{Args, Command};

/// The deploy pipeline runs detached from the request that started it
/// (§4.4 "background tasks vs. request context"), so a one-shot CLI
/// invocation has to poll for the final status before the process exits,
/// or the spawned task would be dropped mid-flight along with the runtime.
async fn await_terminal_status(
    orchestrator: &Orchestrator,
    deployment_id: DeploymentId,
) -> Result<nebula_core::Deployment> {
    loop {
        let deployment = orchestrator.get_deployment(deployment_id).await?;
        if deployment.status.is_terminal() {
            return Ok(deployment);
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_recorder = Arc::new(InMemoryLogRecorder::new());
    let fmt_layer = fmt::layer();
    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info")).unwrap();
    tracing_subscriber::registry()
        .with(nebula_orchestrator::DeployLayer::new(log_recorder.clone()))
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    info!(database_url = %args.database_url, proxy_url = %args.proxy_url, "starting nebula-cli");

    let dal = Arc::new(
        SqliteDal::connect(&args.database_url)
            .await
            .context("failed to connect to the database")?,
    );
    let runtime: Arc<dyn ContainerRuntime> =
        Arc::new(DockerRuntime::connect().context("failed to connect to the container runtime")?);

    let builders = Arc::new(BuilderRegistry::new());
    builders.register(Arc::new(DockerfileBuilder::new(runtime.clone()))).await;
    builders.register(Arc::new(SourceGeneratorBuilder::new(runtime.clone()))).await;
    builders.register(Arc::new(PreBuiltImageBuilder::new(runtime.clone(), None))).await;

    let image = Arc::new(ImageStrategy::new(runtime.clone()));
    let source = Arc::new(SourceStrategy::new(runtime.clone(), builders, &args.data_root));
    let compose: Arc<dyn DeploymentStrategy> = Arc::new(ComposeStrategy::new(runtime.clone()));
    let proxy: Arc<dyn ProxyClient> = Arc::new(HttpProxyClient::new(args.proxy_url.clone()));
    let events = EventBus::new();

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
        events.clone(),
        log_recorder,
    )
    .with_health_check_defaults(args.health_check_attempts, args.health_check_interval_secs);

    match args.command {
        Command::CreateProject { name, display_name } => {
            let display_name = if display_name.is_empty() { name.clone() } else { display_name };
            let project = Project::new(name, display_name);
            ProjectRepository::create(dal.as_ref(), &project).await?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        Command::DeployImage { project, image, service, port, start_command } => {
            let deployment = orchestrator
                .deploy_image(DeployImageRequest {
                    project_name: project,
                    service_name: service,
                    image,
                    port,
                    env: Default::default(),
                    start_command,
                })
                .await?;
            let deployment = await_terminal_status(&orchestrator, deployment.id).await?;
            println!("{}", serde_json::to_string_pretty(&deployment)?);
        }
        Command::DeploySource { project, git_repo, git_branch, service, port } => {
            let deployment = orchestrator
                .deploy_source(DeploySourceRequest {
                    project_name: project,
                    service_name: service,
                    git_repo,
                    git_branch,
                    port,
                    env: Default::default(),
                    start_command: None,
                })
                .await?;
            let deployment = await_terminal_status(&orchestrator, deployment.id).await?;
            println!("{}", serde_json::to_string_pretty(&deployment)?);
        }
        Command::DeployService { project, service } => {
            let deployment = orchestrator
                .deploy_service_by_name(DeployServiceByNameRequest {
                    project_name: project,
                    service_name: service,
                    env: Default::default(),
                })
                .await?;
            let deployment = await_terminal_status(&orchestrator, deployment.id).await?;
            println!("{}", serde_json::to_string_pretty(&deployment)?);
        }
        Command::Status { deployment_id } => {
            let id = DeploymentId::from_str(&deployment_id).context("invalid deployment id")?;
            let deployment = orchestrator.get_deployment(id).await?;
            println!("{}", serde_json::to_string_pretty(&deployment)?);
        }
        Command::Logs { deployment_id, follow, tail } => {
            let id = DeploymentId::from_str(&deployment_id).context("invalid deployment id")?;
            let mut subscriber = events.subscribe("nebula-cli", None).await;
            let relay = LogRelay::new(dal.clone(), dal.clone(), runtime.clone(), events);
            let handle = tokio::spawn(async move { relay.relay(id, follow, tail).await });
            while let Some(event) = subscriber.receiver.recv().await {
                println!("{}", event.payload);
            }
            handle.await??;
        }
    }

    Ok(())
}

//! Log relay (C8): streams a deployment's container output as `message`
//! events, falling back to the captured build/run log when no container
//! row exists yet (or ever existed, for a deployment that failed before
//! `deploy`). §4.8.

use std::sync::Arc;

use chrono::Utc;
use nebula_core::{DeploymentId, EventKind, StatusEvent};
use nebula_dal::{ContainerRepository, DeploymentRepository};
use nebula_events::EventBus;
use nebula_runtime::{ContainerRuntime, LogOptions};
use tokio_stream::StreamExt;

use crate::error::{OrchestratorError, Result};

const CAPTURED_LOG_START_MARKER: &str = "--- captured log ---";
const CAPTURED_LOG_END_MARKER: &str = "--- end of captured log ---";

pub struct LogRelay {
    containers: Arc<dyn ContainerRepository>,
    deployments: Arc<dyn DeploymentRepository>,
    runtime: Arc<dyn ContainerRuntime>,
    events: EventBus,
}

impl LogRelay {
    pub fn new(
        containers: Arc<dyn ContainerRepository>,
        deployments: Arc<dyn DeploymentRepository>,
        runtime: Arc<dyn ContainerRuntime>,
        events: EventBus,
    ) -> Self {
        Self {
            containers,
            deployments,
            runtime,
            events,
        }
    }

    /// Streams log lines for `deployment_id` onto the event bus until the
    /// source is exhausted (`follow: false`) or the caller stops polling
    /// (`follow: true` ends only when the runtime's stream ends, e.g. on
    /// client disconnect closing the subscription's channel).
    pub async fn relay(&self, deployment_id: DeploymentId, follow: bool, tail: Option<u32>) -> Result<()> {
        let deployment = self
            .deployments
            .get(deployment_id)
            .await?
            .ok_or_else(|| OrchestratorError::DeploymentNotFound(deployment_id.to_string()))?;

        let containers = self.containers.list_by_deployment_id(deployment_id).await?;
        let Some(container) = containers.first() else {
            self.emit_captured_logs(deployment_id, deployment.project_id, deployment.logs.as_deref())
                .await;
            return Ok(());
        };

        let options = LogOptions {
            follow,
            tail,
            stdout: true,
            stderr: true,
            timestamps: false,
        };
        let mut stream = self.runtime.container_logs(&container.runtime_id, options).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            self.emit_line(deployment_id, deployment.project_id, chunk.message).await;
        }
        Ok(())
    }

    async fn emit_captured_logs(&self, deployment_id: DeploymentId, project_id: nebula_core::ProjectId, logs: Option<&str>) {
        let Some(logs) = logs.filter(|l| !l.is_empty()) else {
            self.emit_line(deployment_id, project_id, "no logs available".to_string()).await;
            return;
        };

        self.emit_line(deployment_id, project_id, CAPTURED_LOG_START_MARKER.to_string())
            .await;
        for line in logs.lines() {
            self.emit_line(deployment_id, project_id, line.to_string()).await;
        }
        self.emit_line(deployment_id, project_id, CAPTURED_LOG_END_MARKER.to_string())
            .await;
    }

    async fn emit_line(&self, deployment_id: DeploymentId, project_id: nebula_core::ProjectId, line: String) {
        let event = StatusEvent::new(EventKind::LogLine, project_id, line, Utc::now())
            .with_deployment(deployment_id);
        self.events.publish(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nebula_core::{Deployment, DeploymentSnapshot, ProjectId, ServiceId, Slot};
    use nebula_dal::SqliteDal;
    use nebula_runtime::{
        BuildOutput, ContainerConfig, ContainerInspect, LogChunk, LogStream, LogStreamFuture,
        NetworkOpts, RegistryAuth, Result as RuntimeResult, RunState, VolumeOpts,
    };

    struct FixedLogRuntime;

    #[async_trait]
    impl ContainerRuntime for FixedLogRuntime {
        async fn pull_image(&self, _image: &str, _auth: Option<&RegistryAuth>) -> RuntimeResult<()> {
            Ok(())
        }
        async fn build_image(&self, _context_dir: &str, _image_name: &str) -> RuntimeResult<BuildOutput> {
            unimplemented!()
        }
        async fn create_container(&self, _config: &ContainerConfig) -> RuntimeResult<String> {
            unimplemented!()
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
        async fn container_logs(&self, _id: &str, _options: LogOptions) -> RuntimeResult<LogStreamFuture> {
            let lines = vec![
                Ok(LogChunk { stream: LogStream::StdOut, message: "booting".to_string() }),
                Ok(LogChunk { stream: LogStream::StdOut, message: "ready".to_string() }),
            ];
            Ok(Box::pin(tokio_stream::iter(lines)))
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

    async fn dal() -> Arc<SqliteDal> {
        Arc::new(SqliteDal::connect("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn falls_back_to_captured_logs_with_no_containers() {
        let dal = dal().await;
        let mut deployment = Deployment::new(
            ProjectId::new(),
            ServiceId::new(),
            Slot::Blue,
            DeploymentSnapshot::default(),
            Utc::now(),
        );
        deployment.logs = Some("line one\nline two".to_string());
        DeploymentRepository::create(dal.as_ref(), &deployment).await.unwrap();

        let events = EventBus::new();
        let mut sub = events.subscribe("test", None).await;
        let relay = LogRelay::new(dal.clone(), dal.clone(), Arc::new(FixedLogRuntime), events);

        relay.relay(deployment.id, false, None).await.unwrap();

        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.payload, CAPTURED_LOG_START_MARKER);
        let second = sub.receiver.recv().await.unwrap();
        assert_eq!(second.payload, "line one");
    }

    #[tokio::test]
    async fn no_logs_and_no_containers_emits_one_line() {
        let dal = dal().await;
        let deployment = Deployment::new(
            ProjectId::new(),
            ServiceId::new(),
            Slot::Blue,
            DeploymentSnapshot::default(),
            Utc::now(),
        );
        DeploymentRepository::create(dal.as_ref(), &deployment).await.unwrap();

        let events = EventBus::new();
        let mut sub = events.subscribe("test", None).await;
        let relay = LogRelay::new(dal.clone(), dal.clone(), Arc::new(FixedLogRuntime), events);

        relay.relay(deployment.id, false, None).await.unwrap();

        let only = sub.receiver.recv().await.unwrap();
        assert_eq!(only.payload, "no logs available");
        assert!(sub.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn streams_container_logs_when_a_container_exists() {
        let dal = dal().await;
        let deployment = Deployment::new(
            ProjectId::new(),
            ServiceId::new(),
            Slot::Blue,
            DeploymentSnapshot::default(),
            Utc::now(),
        );
        DeploymentRepository::create(dal.as_ref(), &deployment).await.unwrap();
        let container = nebula_core::Container::new(deployment.id, "runtime-1", "nebula-api-blue");
        ContainerRepository::create(dal.as_ref(), &container).await.unwrap();

        let events = EventBus::new();
        let mut sub = events.subscribe("test", None).await;
        let relay = LogRelay::new(dal.clone(), dal.clone(), Arc::new(FixedLogRuntime), events);

        relay.relay(deployment.id, false, None).await.unwrap();

        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.payload, "booting");
        let second = sub.receiver.recv().await.unwrap();
        assert_eq!(second.payload, "ready");
    }
}

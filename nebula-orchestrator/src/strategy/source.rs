//! The `source` strategy: clones a git repository, builds it (dockerfile or
//! source-generator), and deploys the resulting image exactly as the image
//! strategy would. §4.3.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use nebula_builder::{BuildContext, BuilderRegistry};
use nebula_runtime::ContainerRuntime;
use tokio::process::Command;

use crate::error::{OrchestratorError, Result};
use crate::strategy::image::ImageStrategy;
use crate::strategy::trait_def::DeploymentStrategy;
use crate::strategy::types::{DeploymentResult, DeploymentSpec, HealthResult, Mode, PrepareResult};

/// Number of build directories retained per service; older ones are
/// removed by mtime. §4.3, §5.
const RETAINED_BUILD_DIRS: usize = 3;

pub struct SourceStrategy {
    builders: Arc<BuilderRegistry>,
    data_root: PathBuf,
    image: ImageStrategy,
}

impl SourceStrategy {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        builders: Arc<BuilderRegistry>,
        data_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            builders,
            data_root: data_root.into(),
            image: ImageStrategy::new(runtime),
        }
    }

    fn service_build_root(&self, service_name: &str) -> PathBuf {
        self.data_root.join("builds").join(service_name)
    }

    async fn clone_repo(&self, spec: &DeploymentSpec, build_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(build_dir).await.map_err(|e| {
            OrchestratorError::Validation(format!("could not create build dir: {e}"))
        })?;

        let repo = spec
            .git_repo
            .as_deref()
            .ok_or_else(|| OrchestratorError::Validation("source strategy requires `git_repo`".into()))?;
        let branch = spec
            .git_branch
            .as_deref()
            .ok_or_else(|| OrchestratorError::Validation("source strategy requires `git_branch`".into()))?;

        let status = Command::new("git")
            .args(["clone", "--depth", "1", "--branch", branch, repo])
            .arg(build_dir)
            .status()
            .await
            .map_err(|e| OrchestratorError::Validation(format!("git clone failed to start: {e}")))?;

        if !status.success() {
            return Err(OrchestratorError::Validation(format!(
                "git clone of {repo}@{branch} exited with {status}"
            )));
        }
        Ok(())
    }

    /// Remove all but the `RETAINED_BUILD_DIRS` most recent build
    /// directories for this service, oldest by mtime first. §4.3, §5.
    async fn gc_old_builds(&self, service_name: &str) -> Result<()> {
        let root = self.service_build_root(service_name);
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await.ok().flatten() {
            if let Ok(metadata) = entry.metadata().await {
                if metadata.is_dir() {
                    if let Ok(modified) = metadata.modified() {
                        dirs.push((entry.path(), modified));
                    }
                }
            }
        }

        dirs.sort_by_key(|(_, modified)| *modified);
        if dirs.len() > RETAINED_BUILD_DIRS {
            for (path, _) in &dirs[..dirs.len() - RETAINED_BUILD_DIRS] {
                let _ = tokio::fs::remove_dir_all(path).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DeploymentStrategy for SourceStrategy {
    fn mode(&self) -> Mode {
        Mode::Source
    }

    async fn validate(&self, spec: &DeploymentSpec) -> Result<()> {
        if spec.git_repo.as_deref().unwrap_or_default().is_empty() {
            return Err(OrchestratorError::Validation("`git_repo` is required".into()));
        }
        if spec.git_branch.as_deref().unwrap_or_default().is_empty() {
            return Err(OrchestratorError::Validation("`git_branch` is required".into()));
        }
        Ok(())
    }

    async fn prepare(&self, spec: &DeploymentSpec) -> Result<PrepareResult> {
        let build_id = uuid::Uuid::new_v4();
        let build_dir = self.service_build_root(&spec.service_name).join(build_id.to_string());

        self.clone_repo(spec, &build_dir).await?;

        let source_dir = build_dir.to_string_lossy().to_string();
        let builder = if Path::new(&source_dir).join("Dockerfile").exists() {
            self.builders.get("dockerfile").await?
        } else {
            self.builders.auto_detect(&source_dir).await?
        };

        let ctx = BuildContext {
            project_id: spec.project_id,
            service_id: spec.service_id,
            source_dir: source_dir.clone(),
            subdirectory: None,
            builder_name: Some(builder.name().to_string()),
            port_hint: spec.port,
            start_command: spec.start_command.clone(),
            build_args: Default::default(),
            image_name: format!("nebula/{}", spec.service_name),
            image_tag: build_id.simple().to_string(),
        };

        let build_result = builder.build(&ctx).await?;
        self.gc_old_builds(&spec.service_name).await?;

        Ok(PrepareResult {
            image_ref: Some(format!("{}:{}", build_result.image_name, build_result.image_tag)),
            build_dir: Some(source_dir),
            build_log: build_result.build_log,
        })
    }

    async fn deploy(&self, spec: &DeploymentSpec, prepared: &PrepareResult) -> Result<DeploymentResult> {
        self.image.deploy(spec, prepared).await
    }

    async fn health_check(&self, spec: &DeploymentSpec, result: &DeploymentResult) -> Result<HealthResult> {
        self.image.health_check(spec, result).await
    }

    async fn stop(&self, container_ids: &[String]) -> Result<()> {
        self.image.stop(container_ids).await
    }

    async fn destroy(&self, container_ids: &[String]) -> Result<()> {
        self.image.destroy(container_ids).await
    }
}

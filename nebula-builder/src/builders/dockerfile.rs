//! The `dockerfile` builder: runs the native image builder directly against
//! an existing `Dockerfile`. §4.2.

use async_trait::async_trait;
use nebula_runtime::ContainerRuntime;
use std::sync::Arc;

use crate::error::Result;
use crate::registry::Builder;
use crate::types::{BuildContext, BuildResult, DetectResult};

pub struct DockerfileBuilder {
    runtime: Arc<dyn ContainerRuntime>,
}

impl DockerfileBuilder {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl Builder for DockerfileBuilder {
    fn name(&self) -> &str {
        "dockerfile"
    }

    async fn detect(&self, source_dir: &str) -> Result<DetectResult> {
        let path = std::path::Path::new(source_dir).join("Dockerfile");
        Ok(if tokio::fs::metadata(&path).await.is_ok() {
            DetectResult::matched(100)
        } else {
            DetectResult::NO_MATCH
        })
    }

    async fn build(&self, ctx: &BuildContext) -> Result<BuildResult> {
        let image_ref = format!("{}:{}", ctx.image_name, ctx.image_tag);
        let output = self
            .runtime
            .build_image(&ctx.effective_source_dir(), &image_ref)
            .await?;

        Ok(BuildResult {
            image_id: output.image_id,
            image_name: ctx.image_name.clone(),
            image_tag: ctx.image_tag.clone(),
            build_log: output.logs,
            port: ctx.port_hint,
        })
    }
}

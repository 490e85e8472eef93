//! The `pre-built-image` builder: never auto-detects (§4.2); reachable only
//! by explicit selection. Performs an authenticated registry pull instead
//! of invoking a build.

use async_trait::async_trait;
use nebula_runtime::{ContainerRuntime, RegistryAuth};
use std::sync::Arc;

use crate::error::Result;
use crate::registry::Builder;
use crate::types::{BuildContext, BuildResult, DetectResult};

pub struct PreBuiltImageBuilder {
    runtime: Arc<dyn ContainerRuntime>,
    auth: Option<RegistryAuth>,
}

impl PreBuiltImageBuilder {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, auth: Option<RegistryAuth>) -> Self {
        Self { runtime, auth }
    }
}

#[async_trait]
impl Builder for PreBuiltImageBuilder {
    fn name(&self) -> &str {
        "pre-built-image"
    }

    async fn detect(&self, _source_dir: &str) -> Result<DetectResult> {
        Ok(DetectResult::NO_MATCH)
    }

    async fn build(&self, ctx: &BuildContext) -> Result<BuildResult> {
        let image_ref = format!("{}:{}", ctx.image_name, ctx.image_tag);
        self.runtime
            .pull_image(&image_ref, self.auth.as_ref())
            .await?;

        Ok(BuildResult {
            image_id: image_ref.clone(),
            image_name: ctx.image_name.clone(),
            image_tag: ctx.image_tag.clone(),
            build_log: format!("pulled {image_ref}"),
            port: ctx.port_hint,
        })
    }
}

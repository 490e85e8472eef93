//! The `source-generator` builder: synthesizes a minimal Dockerfile from a
//! recognized language manifest when the source tree carries no Dockerfile
//! of its own. §4.2.
//!
//! Template rendering grounded on the teacher's standalone `builder` crate
//! (`RustDockerfile` / `render_rust_dockerfile`), generalized from one
//! language to the manifest table below.

use askama::Template;
use async_trait::async_trait;
use nebula_runtime::ContainerRuntime;
use std::sync::Arc;

use crate::error::Result;
use crate::registry::Builder;
use crate::types::{BuildContext, BuildResult, DetectResult};

/// Ordered language-manifest detection list. §4.2. First match wins.
const MANIFESTS: &[(&str, &str, u16)] = &[
    ("package.json", "node:20-slim", 3000),
    ("requirements.txt", "python:3.12-slim", 8000),
    ("go.mod", "golang:1.22", 8080),
    ("Gemfile", "ruby:3.3-slim", 3000),
    ("Cargo.toml", "rust:1.77-slim", 8080),
    ("pom.xml", "eclipse-temurin:21-jre", 8080),
    ("build.gradle", "eclipse-temurin:21-jre", 8080),
    ("composer.json", "php:8.3-cli", 8080),
    ("mix.exs", "elixir:1.16-slim", 8080),
    ("index.html", "nginx:alpine", 8080),
];

const PROCFILE: &str = "Procfile";
const BASE_SCORE: u8 = 50;
const PROCFILE_SCORE: u8 = 70;

#[derive(Template)]
#[template(path = "generated.Dockerfile.jinja2", escape = "none")]
struct GeneratedDockerfile<'a> {
    base_image: &'a str,
    install_command: Option<&'a str>,
    port: u16,
    start_command: String,
}

pub struct SourceGeneratorBuilder {
    runtime: Arc<dyn ContainerRuntime>,
}

impl SourceGeneratorBuilder {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    async fn matched_manifest(source_dir: &str) -> Option<(&'static str, &'static str, u16)> {
        for (manifest, base_image, port) in MANIFESTS {
            let path = std::path::Path::new(source_dir).join(manifest);
            if tokio::fs::metadata(&path).await.is_ok() {
                return Some((manifest, base_image, *port));
            }
        }
        None
    }
}

fn shell_quote(args: &[&str]) -> String {
    args.iter()
        .map(|a| format!("\"{a}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Builder for SourceGeneratorBuilder {
    fn name(&self) -> &str {
        "source-generator"
    }

    async fn detect(&self, source_dir: &str) -> Result<DetectResult> {
        let Some(_) = Self::matched_manifest(source_dir).await else {
            return Ok(DetectResult::NO_MATCH);
        };

        let has_procfile =
            tokio::fs::metadata(std::path::Path::new(source_dir).join(PROCFILE))
                .await
                .is_ok();
        let score = if has_procfile {
            PROCFILE_SCORE
        } else {
            BASE_SCORE
        };
        Ok(DetectResult::matched(score))
    }

    async fn build(&self, ctx: &BuildContext) -> Result<BuildResult> {
        let source_dir = ctx.effective_source_dir();
        let (_, base_image, default_port) = Self::matched_manifest(&source_dir)
            .await
            .unwrap_or(("", "alpine:3.19", 8080));

        let port = ctx.port_hint.unwrap_or(default_port);
        let start_command = ctx
            .start_command
            .clone()
            .unwrap_or_else(|| default_start_command(&source_dir));

        let rendered = GeneratedDockerfile {
            base_image,
            install_command: None,
            port,
            start_command: shell_quote(&start_command.split_whitespace().collect::<Vec<_>>()),
        }
        .render()?;

        tokio::fs::write(
            std::path::Path::new(&source_dir).join("Dockerfile"),
            rendered,
        )
        .await?;

        let image_ref = format!("{}:{}", ctx.image_name, ctx.image_tag);
        let output = self.runtime.build_image(&source_dir, &image_ref).await?;

        Ok(BuildResult {
            image_id: output.image_id,
            image_name: ctx.image_name.clone(),
            image_tag: ctx.image_tag.clone(),
            build_log: output.logs,
            port: Some(port),
        })
    }
}

fn default_start_command(source_dir: &str) -> String {
    let root = std::path::Path::new(source_dir);
    if root.join("package.json").exists() {
        "npm start".to_string()
    } else if root.join("requirements.txt").exists() {
        "python app.py".to_string()
    } else if root.join("go.mod").exists() {
        "./app".to_string()
    } else {
        "/bin/sh -c run".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_core::{ProjectId, ServiceId};
    use std::sync::Arc;

    fn ctx(source_dir: String) -> BuildContext {
        BuildContext {
            project_id: ProjectId::new(),
            service_id: ServiceId::new(),
            source_dir,
            subdirectory: None,
            builder_name: Some("source-generator".into()),
            port_hint: None,
            start_command: None,
            build_args: Default::default(),
            image_name: "app".into(),
            image_tag: "v1".into(),
        }
    }

    struct NoopRuntime;

    #[async_trait]
    impl ContainerRuntime for NoopRuntime {
        async fn pull_image(
            &self,
            _image: &str,
            _auth: Option<&nebula_runtime::RegistryAuth>,
        ) -> nebula_runtime::Result<()> {
            Ok(())
        }
        async fn build_image(
            &self,
            _context_dir: &str,
            _image_name: &str,
        ) -> nebula_runtime::Result<nebula_runtime::BuildOutput> {
            Ok(nebula_runtime::BuildOutput {
                image_id: "sha256:deadbeef".into(),
                logs: "built".into(),
            })
        }
        async fn create_container(
            &self,
            _config: &nebula_runtime::ContainerConfig,
        ) -> nebula_runtime::Result<String> {
            unimplemented!()
        }
        async fn start_container(&self, _id: &str) -> nebula_runtime::Result<()> {
            unimplemented!()
        }
        async fn stop_container(&self, _id: &str, _timeout_secs: u64) -> nebula_runtime::Result<()> {
            unimplemented!()
        }
        async fn restart_container(
            &self,
            _id: &str,
            _timeout_secs: u64,
        ) -> nebula_runtime::Result<()> {
            unimplemented!()
        }
        async fn remove_container(&self, _id: &str, _force: bool) -> nebula_runtime::Result<()> {
            unimplemented!()
        }
        async fn inspect_container(
            &self,
            _id: &str,
        ) -> nebula_runtime::Result<nebula_runtime::ContainerInspect> {
            unimplemented!()
        }
        async fn container_logs(
            &self,
            _id: &str,
            _options: nebula_runtime::LogOptions,
        ) -> nebula_runtime::Result<nebula_runtime::LogStreamFuture> {
            unimplemented!()
        }
        async fn create_network(
            &self,
            _name: &str,
            _opts: &nebula_runtime::NetworkOpts,
        ) -> nebula_runtime::Result<()> {
            unimplemented!()
        }
        async fn create_volume(
            &self,
            _name: &str,
            _opts: &nebula_runtime::VolumeOpts,
        ) -> nebula_runtime::Result<()> {
            unimplemented!()
        }
        async fn ping(&self) -> nebula_runtime::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn detects_node_manifest_at_base_score() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        let builder = SourceGeneratorBuilder::new(Arc::new(NoopRuntime));
        let detected = builder
            .detect(dir.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(detected, DetectResult::matched(50));
    }

    #[tokio::test]
    async fn procfile_bumps_score_to_seventy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join("Procfile"), "web: npm start").unwrap();

        let builder = SourceGeneratorBuilder::new(Arc::new(NoopRuntime));
        let detected = builder
            .detect(dir.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(detected, DetectResult::matched(70));
    }

    #[tokio::test]
    async fn no_manifest_present_does_not_match() {
        let dir = tempfile::tempdir().unwrap();
        let builder = SourceGeneratorBuilder::new(Arc::new(NoopRuntime));
        let detected = builder
            .detect(dir.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(detected, DetectResult::NO_MATCH);
    }

    #[tokio::test]
    async fn build_renders_dockerfile_and_reports_default_port() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module app\n").unwrap();

        let builder = SourceGeneratorBuilder::new(Arc::new(NoopRuntime));
        let result = builder
            .build(&ctx(dir.path().to_str().unwrap().to_string()))
            .await
            .unwrap();

        assert_eq!(result.port, Some(8080));
        assert!(dir.path().join("Dockerfile").exists());
    }
}

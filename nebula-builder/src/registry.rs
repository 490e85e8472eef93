//! Builder registry (C2): registration, scored auto-detection, dispatch.
//!
//! Grounded on the teacher's `TaskRouter` (`gateway/src/worker.rs`) for the
//! `RwLock`-guarded name-keyed map shape, generalized from routing tasks to
//! routing builds.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{BuilderError, Result};
use crate::types::{BuildContext, BuildResult, DetectResult};

#[async_trait]
pub trait Builder: Send + Sync {
    fn name(&self) -> &str;
    async fn detect(&self, source_dir: &str) -> Result<DetectResult>;
    async fn build(&self, ctx: &BuildContext) -> Result<BuildResult>;
}

/// Tie-break order when two builders report the same score: earlier wins.
/// §4.2 table order (dockerfile, source-generator, pre-built-image).
const PRIORITY_ORDER: &[&str] = &["dockerfile", "source-generator", "pre-built-image"];

fn priority_rank(name: &str) -> usize {
    PRIORITY_ORDER
        .iter()
        .position(|n| *n == name)
        .unwrap_or(PRIORITY_ORDER.len())
}

#[derive(Default, Clone)]
pub struct BuilderRegistry {
    builders: Arc<RwLock<HashMap<String, Arc<dyn Builder>>>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additive, keyed by name; last writer wins. §4.2.
    pub async fn register(&self, builder: Arc<dyn Builder>) {
        self.builders
            .write()
            .await
            .insert(builder.name().to_string(), builder);
    }

    pub async fn get(&self, name: &str) -> Result<Arc<dyn Builder>> {
        self.builders
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| BuilderError::NotFound(name.to_string()))
    }

    /// §4.2 `AutoDetect`: highest strictly-winning score among builders
    /// that return `can_build`; ties broken by [`PRIORITY_ORDER`].
    pub async fn auto_detect(&self, source_dir: &str) -> Result<Arc<dyn Builder>> {
        let builders = self.builders.read().await;
        let mut best: Option<(Arc<dyn Builder>, u8)> = None;

        for builder in builders.values() {
            let detected = builder.detect(source_dir).await?;
            if !detected.can_build {
                continue;
            }
            best = match best {
                None => Some((builder.clone(), detected.score)),
                Some((current, current_score)) => {
                    if detected.score > current_score
                        || (detected.score == current_score
                            && priority_rank(builder.name()) < priority_rank(current.name()))
                    {
                        Some((builder.clone(), detected.score))
                    } else {
                        Some((current, current_score))
                    }
                }
            };
        }

        best.map(|(builder, _)| builder)
            .ok_or_else(|| BuilderError::NoBuilder(source_dir.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuildContext;

    struct FixedBuilder {
        name: &'static str,
        detect: DetectResult,
    }

    #[async_trait]
    impl Builder for FixedBuilder {
        fn name(&self) -> &str {
            self.name
        }

        async fn detect(&self, _source_dir: &str) -> Result<DetectResult> {
            Ok(self.detect)
        }

        async fn build(&self, _ctx: &BuildContext) -> Result<BuildResult> {
            unimplemented!("not exercised by registry tests")
        }
    }

    #[tokio::test]
    async fn auto_detect_picks_strictly_highest_score() {
        let registry = BuilderRegistry::new();
        registry
            .register(Arc::new(FixedBuilder {
                name: "dockerfile",
                detect: DetectResult::matched(100),
            }))
            .await;
        registry
            .register(Arc::new(FixedBuilder {
                name: "source-generator",
                detect: DetectResult::matched(60),
            }))
            .await;

        let picked = registry.auto_detect("/tmp/src").await.unwrap();
        assert_eq!(picked.name(), "dockerfile");
    }

    #[tokio::test]
    async fn ties_break_by_priority_table() {
        let registry = BuilderRegistry::new();
        registry
            .register(Arc::new(FixedBuilder {
                name: "source-generator",
                detect: DetectResult::matched(70),
            }))
            .await;
        registry
            .register(Arc::new(FixedBuilder {
                name: "pre-built-image",
                detect: DetectResult::matched(70),
            }))
            .await;

        let picked = registry.auto_detect("/tmp/src").await.unwrap();
        assert_eq!(picked.name(), "source-generator");
    }

    #[tokio::test]
    async fn no_match_yields_no_builder_error() {
        let registry = BuilderRegistry::new();
        registry
            .register(Arc::new(FixedBuilder {
                name: "pre-built-image",
                detect: DetectResult::NO_MATCH,
            }))
            .await;

        let err = registry.auto_detect("/tmp/src").await.unwrap_err();
        assert!(matches!(err, BuilderError::NoBuilder(_)));
    }

    #[tokio::test]
    async fn get_unknown_name_is_not_found() {
        let registry = BuilderRegistry::new();
        let err = registry.get("missing").await.unwrap_err();
        assert!(matches!(err, BuilderError::NotFound(_)));
    }

    #[tokio::test]
    async fn register_is_last_writer_wins() {
        let registry = BuilderRegistry::new();
        registry
            .register(Arc::new(FixedBuilder {
                name: "dockerfile",
                detect: DetectResult::matched(100),
            }))
            .await;
        registry
            .register(Arc::new(FixedBuilder {
                name: "dockerfile",
                detect: DetectResult::matched(42),
            }))
            .await;

        let builder = registry.get("dockerfile").await.unwrap();
        let detected = builder.detect("/tmp").await.unwrap();
        assert_eq!(detected.score, 42);
    }
}

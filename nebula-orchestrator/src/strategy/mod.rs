//! Deployment strategies (C5): image, source, and compose, behind a single
//! `DeploymentStrategy` contract. §4.3.

mod compose;
mod image;
mod labels;
mod source;
mod trait_def;
mod types;

pub use compose::ComposeStrategy;
pub use image::{ImageStrategy, DEFAULT_HEALTH_CHECK_ATTEMPTS, DEFAULT_HEALTH_CHECK_INTERVAL_SECS};
pub use labels::{container_name, db_volume_name, managed_labels, network_name};
pub use source::SourceStrategy;
pub use trait_def::DeploymentStrategy;
pub use types::{merge_env, DeploymentResult, DeploymentSpec, HealthResult, Mode, PrepareResult};

//! Builder registry and builders (C2/C3): auto-detection and dispatch to
//! the builder that turns a source tree or image reference into a runnable
//! image.

pub mod builders;
pub mod error;
pub mod registry;
pub mod types;

pub use builders::{DockerfileBuilder, PreBuiltImageBuilder, SourceGeneratorBuilder};
pub use error::{BuilderError, Result};
pub use registry::{Builder, BuilderRegistry};
pub use types::{BuildContext, BuildResult, DetectResult};

//! Repository contracts and the sqlx/SQLite persistence layer (C9). §3, §6.

pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::{DalError, Result};
pub use sqlite::SqliteDal;
pub use traits::{
    ContainerRepository, DeploymentRepository, DomainRepository, ProjectRepository,
    RouteRepository, ServiceRepository,
};

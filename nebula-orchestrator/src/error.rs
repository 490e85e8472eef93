use nebula_core::{Error, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("deployment not found: {0}")]
    DeploymentNotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Builder(#[from] nebula_builder::BuilderError),

    #[error(transparent)]
    Runtime(#[from] nebula_runtime::RuntimeError),

    #[error(transparent)]
    Proxy(#[from] nebula_proxy::ProxyError),

    #[error(transparent)]
    Dal(#[from] nebula_dal::DalError),

    #[error(transparent)]
    Core(#[from] nebula_core::Error),
}

impl From<OrchestratorError> for Error {
    fn from(err: OrchestratorError) -> Self {
        match &err {
            OrchestratorError::ProjectNotFound(_)
            | OrchestratorError::ServiceNotFound(_)
            | OrchestratorError::DeploymentNotFound(_) => Error::source(ErrorKind::NotFound, err),
            OrchestratorError::Validation(_) => Error::source(ErrorKind::Validation, err),
            _ => Error::source(ErrorKind::Deployment, err),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

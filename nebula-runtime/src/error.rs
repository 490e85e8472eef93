//! Runtime-specific error enum, converted into [`nebula_core::Error`] at the
//! crate boundary. §10 ambient error-handling convention.

use nebula_core::{Error, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("docker engine error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("container {0} not found")]
    ContainerNotFound(String),

    #[error("image {0} not found")]
    ImageNotFound(String),

    #[error("container operation timed out")]
    Timeout,
}

impl From<RuntimeError> for Error {
    fn from(err: RuntimeError) -> Self {
        Error::source(ErrorKind::Container, err)
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

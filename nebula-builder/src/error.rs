use nebula_core::{Error, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("no builder registered with name {0}")]
    NotFound(String),

    #[error("no registered builder can build source tree at {0}")]
    NoBuilder(String),

    #[error("build failed: {message}")]
    BuildFailed { message: String, log: String },

    #[error("runtime error: {0}")]
    Runtime(#[from] nebula_runtime::RuntimeError),

    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<BuilderError> for Error {
    fn from(err: BuilderError) -> Self {
        match err {
            BuilderError::NotFound(_) => Error::source(ErrorKind::NotFound, err),
            BuilderError::NoBuilder(_) => Error::source(ErrorKind::NotFound, err),
            _ => Error::source(ErrorKind::Deployment, err),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuilderError>;

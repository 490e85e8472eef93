use nebula_core::{Error, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum DalError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("unique constraint violated: {0}")]
    AlreadyExists(String),

    #[error("row not found: {0}")]
    NotFound(String),
}

impl From<DalError> for Error {
    fn from(err: DalError) -> Self {
        match &err {
            DalError::AlreadyExists(_) => Error::source(ErrorKind::Conflict, err),
            DalError::NotFound(_) => Error::source(ErrorKind::NotFound, err),
            _ => Error::source(ErrorKind::Internal, err),
        }
    }
}

pub type Result<T> = std::result::Result<T, DalError>;

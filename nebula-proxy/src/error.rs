use nebula_core::{Error, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("proxy admin api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("proxy returned an error status: {0}")]
    Status(reqwest::StatusCode),
}

impl From<ProxyError> for Error {
    fn from(err: ProxyError) -> Self {
        Error::source(ErrorKind::Proxy, err)
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

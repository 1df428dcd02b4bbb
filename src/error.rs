use thiserror::Error;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Inference service failure: {0}")]
    Upstream(String),

    #[error("Route {0} not found")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        GatewayError::Upstream(message.into())
    }
}

impl From<curl::Error> for GatewayError {
    fn from(err: curl::Error) -> Self {
        GatewayError::Upstream(err.to_string())
    }
}

impl From<curl::FormError> for GatewayError {
    fn from(err: curl::FormError) -> Self {
        GatewayError::Upstream(format!("building multipart form: {}", err))
    }
}

impl From<zip::result::ZipError> for GatewayError {
    fn from(err: zip::result::ZipError) -> Self {
        GatewayError::Upstream(format!("reading result archive: {}", err))
    }
}

impl From<mongodb::error::Error> for GatewayError {
    fn from(err: mongodb::error::Error) -> Self {
        GatewayError::Storage(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for GatewayError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        GatewayError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        GatewayError::Config(err.to_string())
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameworkError {
    #[error("Service {name} must be configured before it can start")]
    Configuration { name: String },

    #[error("Service {name} already registered")]
    DuplicateService { name: String },

    #[error("Service {name} not found")]
    NotFound { name: String },

    #[error("{0}")]
    Manager(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameworkError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CtxError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("bundle not found: {0}")]
    BundleNotFound(String),

    #[error("bundle file '{file}' holds a bundle named '{name}'")]
    NameMismatch { file: String, name: String },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CtxError>;

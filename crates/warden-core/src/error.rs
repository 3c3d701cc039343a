use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("capture error: {0}")]
    Capture(String),

    #[error("rcon error: {0}")]
    Rcon(String),

    #[error("notify error: {0}")]
    Notify(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WardenResult<T> = Result<T, WardenError>;

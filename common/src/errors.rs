use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid search category: {0}")]
    InvalidCategory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

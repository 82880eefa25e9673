use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextToSqlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data access error: {0}")]
    DataAccess(String),

    #[error("completion endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("completion transport error: {0}")]
    Transport(String),

    #[error("no completion choices returned")]
    EmptyCompletion,

    #[error("malformed completion response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("validation unavailable: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

impl From<tokio_postgres::Error> for TextToSqlError {
    fn from(e: tokio_postgres::Error) -> Self {
        TextToSqlError::DataAccess(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for TextToSqlError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        TextToSqlError::DataAccess(format!("pool error: {}", e))
    }
}

impl From<reqwest::Error> for TextToSqlError {
    fn from(e: reqwest::Error) -> Self {
        TextToSqlError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TextToSqlError>;

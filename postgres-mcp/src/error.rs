use thiserror::Error;

/// failures a resource or tool reports back as text instead of a protocol error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Database connection not available")]
    Unavailable,

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Error: Only SELECT queries are allowed for security reasons")]
    NotSelect,

    #[error("Error: Multiple statements are not allowed")]
    MultipleStatements,

    #[error("Error executing query: {0}")]
    Execution(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// the server's own message for a postgres error, without the client-side prefix
pub fn pg_message(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    }
}

impl From<tokio_postgres::Error> for ToolError {
    fn from(e: tokio_postgres::Error) -> Self {
        ToolError::Database(pg_message(&e))
    }
}

impl From<deadpool_postgres::PoolError> for ToolError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        ToolError::Database(format!("pool error: {}", e))
    }
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;

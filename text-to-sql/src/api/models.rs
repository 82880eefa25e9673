use serde::{Deserialize, Serialize};

fn default_validate() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub db_name: Option<String>,
    #[serde(default = "default_validate")]
    pub validate: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefinementRequest {
    pub query: String,
    pub original_sql: String,
    pub feedback: String,
    #[serde(default)]
    pub db_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub db_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub invalidated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: String,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

pub mod error;
pub mod config;
pub mod schema;
pub mod db;
pub mod llm;
pub mod agent;
pub mod pipeline;
pub mod tracing;

pub use error::{Result, TextToSqlError};

use crate::agent::executor::complete_prompt;
use crate::agent::parser::extract_json_object;
use crate::agent::prompt::build_validation_prompt;
use crate::error::{Result, TextToSqlError};
use crate::llm::client::ChatCompletion;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ValidationVerdict {
    /// verdict recorded when the validator itself could not answer
    pub fn unavailable(reason: &TextToSqlError) -> Self {
        let reason = match reason {
            TextToSqlError::Validation(inner) => TextToSqlError::Validation(inner.clone()),
            other => TextToSqlError::Validation(other.to_string()),
        };
        Self {
            is_valid: false,
            issues: vec![reason.to_string()],
            suggestions: None,
        }
    }
}

#[async_trait]
pub trait SqlValidator: Send + Sync {
    async fn validate(&self, sql: &str, schema_context: &str) -> Result<ValidationVerdict>;
}

/// asks the model to review the sql against the schema context
pub struct LlmValidator {
    client: Arc<dyn ChatCompletion>,
    model: String,
}

impl LlmValidator {
    pub fn new(client: Arc<dyn ChatCompletion>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SqlValidator for LlmValidator {
    #[tracing::instrument(skip_all, fields(sql_len = sql.len()))]
    async fn validate(&self, sql: &str, schema_context: &str) -> Result<ValidationVerdict> {
        tracing::debug!("validating sql with {}", self.model);
        let reply = complete_prompt(
            self.client.as_ref(),
            &self.model,
            build_validation_prompt(sql, schema_context),
        )
        .await?;

        parse_verdict(&reply)
    }
}

pub fn parse_verdict(reply: &str) -> Result<ValidationVerdict> {
    let object = extract_json_object(reply).ok_or_else(|| {
        TextToSqlError::Validation("validator reply contained no json object".to_string())
    })?;

    serde_json::from_str(object)
        .map_err(|e| TextToSqlError::Validation(format!("unparsable validator reply: {}", e)))
}

/// run the validator, folding any failure into an invalid verdict
pub async fn validate_or_degrade(
    validator: &dyn SqlValidator,
    sql: &str,
    schema_context: &str,
) -> ValidationVerdict {
    match validator.validate(sql, schema_context).await {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!("sql validation unavailable: {}", e);
            ValidationVerdict::unavailable(&e)
        }
    }
}

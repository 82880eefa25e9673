use crate::agent::executor::generate_sql;
use crate::agent::validator::{validate_or_degrade, SqlValidator, ValidationVerdict};
use crate::db::cache::SchemaCache;
use crate::error::Result;
use crate::llm::client::ChatCompletion;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub query: String,
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationVerdict>,
    pub validation_failed: bool,
}

/// question in, sql out, using the cached schema as context
pub struct SqlGenerator {
    cache: Arc<SchemaCache>,
    client: Arc<dyn ChatCompletion>,
    validator: Arc<dyn SqlValidator>,
    model: String,
}

impl SqlGenerator {
    pub fn new(
        cache: Arc<SchemaCache>,
        client: Arc<dyn ChatCompletion>,
        validator: Arc<dyn SqlValidator>,
    ) -> Self {
        let model = client.default_model().to_string();
        Self {
            cache,
            client,
            validator,
            model,
        }
    }

    #[tracing::instrument(skip(self, question), fields(db_name = db_name.unwrap_or("default")))]
    pub async fn generate(
        &self,
        question: &str,
        db_name: Option<&str>,
        validate: bool,
    ) -> Result<GenerationResult> {
        let context = self.cache.get_context(db_name).await?;
        let sql = generate_sql(self.client.as_ref(), &self.model, question, &context).await?;

        let mut result = GenerationResult {
            query: question.to_string(),
            sql,
            validation: None,
            validation_failed: false,
        };

        if validate {
            tracing::debug!("validating sql: {}", result.sql);
            let verdict = validate_or_degrade(self.validator.as_ref(), &result.sql, &context).await;
            if !verdict.is_valid {
                tracing::warn!("sql validation failed: {:?}", verdict.issues);
                result.validation_failed = true;
            }
            result.validation = Some(verdict);
        }

        Ok(result)
    }
}

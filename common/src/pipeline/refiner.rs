use crate::agent::executor::refine_sql;
use crate::agent::validator::{validate_or_degrade, SqlValidator, ValidationVerdict};
use crate::db::cache::SchemaCache;
use crate::error::Result;
use crate::llm::client::ChatCompletion;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementResult {
    pub query: String,
    pub original_sql: String,
    pub refined_sql: String,
    pub changes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationVerdict>,
    pub validation_failed: bool,
}

pub struct QueryRefiner {
    cache: Arc<SchemaCache>,
    client: Arc<dyn ChatCompletion>,
    validator: Arc<dyn SqlValidator>,
    model: String,
}

impl QueryRefiner {
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

    /// rewrite `original_sql` according to `feedback`; the result is always validated
    #[tracing::instrument(
        skip(self, question, original_sql, feedback),
        fields(db_name = db_name.unwrap_or("default"), feedback_len = feedback.len())
    )]
    pub async fn refine(
        &self,
        question: &str,
        original_sql: &str,
        feedback: &str,
        db_name: Option<&str>,
    ) -> Result<RefinementResult> {
        let context = self.cache.get_context(db_name).await?;

        let (refined_sql, changes) = refine_sql(
            self.client.as_ref(),
            &self.model,
            question,
            original_sql,
            feedback,
            &context,
        )
        .await?;

        let verdict = validate_or_degrade(self.validator.as_ref(), &refined_sql, &context).await;
        let validation_failed = !verdict.is_valid;
        if validation_failed {
            tracing::warn!("refined sql failed validation: {:?}", verdict.issues);
        }

        Ok(RefinementResult {
            query: question.to_string(),
            original_sql: original_sql.to_string(),
            refined_sql,
            changes,
            validation: Some(verdict),
            validation_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::executor::stub::StubCompletion;
    use crate::agent::parser::NO_CHANGE_SUMMARY;
    use crate::agent::validator::stub::StubValidator;
    use crate::error::TextToSqlError;
    use crate::pipeline::generator::stub::ShopSchema;
    use std::time::Duration;

    fn refiner(fail_schema: bool, client: Arc<StubCompletion>, validator: StubValidator) -> QueryRefiner {
        let cache = Arc::new(SchemaCache::new(
            Arc::new(ShopSchema { fail: fail_schema }),
            Duration::from_secs(3600),
        ));
        QueryRefiner::new(cache, client, Arc::new(validator))
    }

    #[tokio::test]
    async fn test_refine_returns_sql_changes_and_verdict() {
        let client = Arc::new(StubCompletion::replying(
            "```sql\nSELECT c.name, COUNT(o.id) FROM customers c JOIN orders o ON o.customer_id = c.id GROUP BY c.name\n```\n\
             Changes:\n- joined orders to count per customer",
        ));
        let refiner = refiner(false, client.clone(), StubValidator::valid());

        let result = refiner
            .refine(
                "orders per customer",
                "SELECT * FROM customers",
                "count the orders for each customer",
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.original_sql, "SELECT * FROM customers");
        assert!(result.refined_sql.starts_with("SELECT c.name, COUNT(o.id)"));
        assert_eq!(result.changes, "- joined orders to count per customer");
        assert!(!result.validation_failed);
        assert!(result.validation.is_some());

        let prompt = &client.last_request().unwrap().messages[1].content;
        assert!(prompt.contains("SELECT * FROM customers"));
        assert!(prompt.contains("count the orders for each customer"));
    }

    #[tokio::test]
    async fn test_refine_without_summary_uses_default_changes() {
        let client = Arc::new(StubCompletion::replying("SELECT id FROM customers"));
        let refiner = refiner(false, client, StubValidator::valid());

        let result = refiner
            .refine("q", "SELECT * FROM customers", "only ids", Some("shop"))
            .await
            .unwrap();

        assert_eq!(result.refined_sql, "SELECT id FROM customers");
        assert_eq!(result.changes, NO_CHANGE_SUMMARY);
    }

    #[tokio::test]
    async fn test_refine_always_validates() {
        let client = Arc::new(StubCompletion::replying("SELECT * FROM customer"));
        let refiner = refiner(false, client, StubValidator::invalid("unknown table customer"));

        let result = refiner.refine("q", "SELECT 1", "fix it", None).await.unwrap();

        assert!(result.validation_failed);
        assert_eq!(
            result.validation.unwrap().issues,
            vec!["unknown table customer".to_string()]
        );
    }

    #[tokio::test]
    async fn test_refine_degrades_validator_failure() {
        let client = Arc::new(StubCompletion::replying("SELECT 1"));
        let refiner = refiner(false, client, StubValidator::Failing("down".to_string()));

        let result = refiner.refine("q", "SELECT 2", "use 1", None).await.unwrap();

        assert!(result.validation_failed);
        assert!(result.validation.unwrap().issues[0].contains("down"));
    }

    #[tokio::test]
    async fn test_refine_schema_failure_propagates() {
        let client = Arc::new(StubCompletion::replying("SELECT 1"));
        let refiner = refiner(true, client, StubValidator::valid());

        let result = refiner.refine("q", "SELECT 2", "use 1", None).await;
        assert!(matches!(result, Err(TextToSqlError::DataAccess(_))));
    }
}

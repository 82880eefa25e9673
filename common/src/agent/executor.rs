use crate::agent::parser::{extract_changes, extract_sql};
use crate::agent::prompt::{build_generation_prompt, build_refinement_prompt};
use crate::error::{Result, TextToSqlError};
use crate::llm::client::ChatCompletion;
use crate::llm::model::{CompletionRequest, Message};

/// raw text of the first choice for a system/user prompt pair at temperature 0
pub async fn complete_prompt(
    client: &dyn ChatCompletion,
    model: &str,
    (system, user): (String, String),
) -> Result<String> {
    let request = CompletionRequest::new(vec![Message::system(system), Message::user(user)], model);
    let response = client.complete(request).await?;

    response
        .first_content()
        .map(str::to_string)
        .ok_or(TextToSqlError::EmptyCompletion)
}

#[tracing::instrument(skip(client, question, schema_context), fields(llm.model = model, context_len = schema_context.len()))]
pub async fn generate_sql(
    client: &dyn ChatCompletion,
    model: &str,
    question: &str,
    schema_context: &str,
) -> Result<String> {
    tracing::info!("generating sql for question: {}", question);

    let reply = complete_prompt(
        client,
        model,
        build_generation_prompt(question, schema_context),
    )
    .await?;

    let sql = extract_sql(&reply);
    tracing::debug!("extracted {} chars of sql", sql.len());

    Ok(sql)
}

/// refined sql plus the model's own summary of what changed
#[tracing::instrument(skip_all, fields(llm.model = model))]
pub async fn refine_sql(
    client: &dyn ChatCompletion,
    model: &str,
    question: &str,
    original_sql: &str,
    feedback: &str,
    schema_context: &str,
) -> Result<(String, String)> {
    tracing::info!("refining sql for question: {}", question);

    let reply = complete_prompt(
        client,
        model,
        build_refinement_prompt(question, original_sql, feedback, schema_context),
    )
    .await?;

    Ok((extract_sql(&reply), extract_changes(&reply)))
}

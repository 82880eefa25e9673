pub const GENERATION_SYSTEM_PROMPT: &str = "\
You are a PostgreSQL expert that converts natural language questions into accurate SQL queries.
Your task is to analyze the database schema provided and generate an appropriate SQL query that answers the user's question.

Guidelines:
1. Generate valid PostgreSQL syntax only
2. Use proper table aliases when joining multiple tables
3. Include comments to explain complex parts
4. Structure and format the query for readability
5. Use appropriate JOINs based on the foreign key relationships
6. Consider performance by using efficient query patterns
7. Return only the SQL query, enclosed in ```sql code blocks

Pay careful attention to the schema, including table names, column names, and relationships.";

pub const REFINEMENT_SYSTEM_PROMPT: &str = "\
You are a PostgreSQL expert that improves existing SQL queries based on user feedback.
You are given the database schema, the original question, the previous SQL query and feedback about it.

Guidelines:
1. Generate valid PostgreSQL syntax only
2. Address every point raised in the feedback
3. Keep the parts of the original query that the feedback does not mention
4. Use appropriate JOINs based on the foreign key relationships
5. Return the refined SQL query enclosed in ```sql code blocks
6. After the code block, add a section starting with \"Changes:\" that briefly lists what you changed";

pub const VALIDATION_SYSTEM_PROMPT: &str = "\
You are a PostgreSQL reviewer. You check whether a SQL query is valid for the given database schema.
Check that every referenced table and column exists, that joins follow the foreign keys, and that the syntax is valid PostgreSQL.

Respond with a single JSON object and nothing else, in exactly this shape:
{\"is_valid\": true or false, \"issues\": [\"...\"], \"suggestions\": [\"...\"]}";

pub fn build_generation_prompt(question: &str, schema_context: &str) -> (String, String) {
    let user = format!(
        "Database Schema:\n{}\n\nUser Question:\n{}\n\n\
         Please generate a PostgreSQL query that answers this question.",
        schema_context, question
    );

    (GENERATION_SYSTEM_PROMPT.to_string(), user)
}

pub fn build_refinement_prompt(
    question: &str,
    original_sql: &str,
    feedback: &str,
    schema_context: &str,
) -> (String, String) {
    let user = format!(
        "Database Schema:\n{}\n\nUser Question:\n{}\n\n\
         Original SQL:\n```sql\n{}\n```\n\nFeedback:\n{}\n\n\
         Please generate a refined PostgreSQL query that addresses the feedback, \
         followed by a \"Changes:\" section.",
        schema_context,
        question,
        original_sql.trim(),
        feedback
    );

    (REFINEMENT_SYSTEM_PROMPT.to_string(), user)
}

pub fn build_validation_prompt(sql: &str, schema_context: &str) -> (String, String) {
    let user = format!(
        "Database Schema:\n{}\n\nSQL Query:\n```sql\n{}\n```\n\n\
         Validate this query against the schema and respond with the JSON object only.",
        schema_context,
        sql.trim()
    );

    (VALIDATION_SYSTEM_PROMPT.to_string(), user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_generation_prompt_layout() {
        let (system, user) =
            build_generation_prompt("how many customers are there", "DATABASE SCHEMA:");

        assert!(system.contains("```sql"));
        assert!(system.contains("PostgreSQL"));
        assert_eq!(
            user,
            "Database Schema:\nDATABASE SCHEMA:\n\nUser Question:\nhow many customers are there\n\n\
             Please generate a PostgreSQL query that answers this question."
        );
    }

    #[test]
    fn test_build_generation_prompt_is_deterministic() {
        let a = build_generation_prompt("q", "ctx");
        let b = build_generation_prompt("q", "ctx");
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_refinement_prompt_includes_sql_and_feedback() {
        let (system, user) = build_refinement_prompt(
            "list customers",
            "SELECT * FROM customers;\n",
            "only active ones",
            "ctx",
        );

        assert!(system.contains("Changes:"));
        assert!(user.contains("```sql\nSELECT * FROM customers;\n```"));
        assert!(user.contains("Feedback:\nonly active ones"));
        assert!(user.contains("User Question:\nlist customers"));
    }

    #[test]
    fn test_build_validation_prompt_requests_json() {
        let (system, user) = build_validation_prompt("SELECT 1", "ctx");

        assert!(system.contains("\"is_valid\""));
        assert!(user.contains("SQL Query:\n```sql\nSELECT 1\n```"));
    }
}

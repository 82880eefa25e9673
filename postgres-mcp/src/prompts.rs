use serde_json::{json, Map, Value};

struct PromptSpec {
    name: &'static str,
    description: &'static str,
    arguments: &'static [(&'static str, &'static str)],
}

const PROMPTS: &[PromptSpec] = &[
    PromptSpec {
        name: "basic_query_template",
        description: "Generate a basic SELECT query template for a specific table",
        arguments: &[("table_name", "Name of the table to query")],
    },
    PromptSpec {
        name: "join_tables_template",
        description: "Generate a template for joining two tables",
        arguments: &[
            ("table1", "First table to join"),
            ("table2", "Second table to join"),
        ],
    },
    PromptSpec {
        name: "data_analysis_template",
        description: "Generate a template for data analysis on a specific table",
        arguments: &[("table_name", "Name of the table to analyze")],
    },
    PromptSpec {
        name: "query_optimization_template",
        description: "Generate a template for optimizing a SQL query",
        arguments: &[("query", "The SQL query to optimize")],
    },
    PromptSpec {
        name: "database_exploration_workflow",
        description: "Generate a workflow for systematically exploring a new database",
        arguments: &[],
    },
];

pub fn list() -> Value {
    let prompts: Vec<Value> = PROMPTS
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "description": p.description,
                "arguments": p.arguments.iter().map(|(name, description)| json!({
                    "name": name,
                    "description": description,
                    "required": true
                })).collect::<Vec<_>>()
            })
        })
        .collect();

    json!({ "prompts": prompts })
}

fn basic_query_template(table_name: &str) -> String {
    format!(
        "Generate a SELECT query for the '{table}' table.

Sample:
```sql
SELECT * FROM {table} LIMIT 10;
```

Please modify this query to select specific columns, add WHERE conditions,
or include any other SQL features needed to answer my question.",
        table = table_name
    )
}

fn join_tables_template(table1: &str, table2: &str) -> String {
    format!(
        "I need help creating a SQL query that joins the '{t1}' and '{t2}' tables.

Please generate a query that:
1. Properly joins these tables based on their relationship
2. Selects relevant columns from both tables
3. Includes appropriate filtering conditions if needed
4. Is formatted for readability

Example structure:
```sql
SELECT t1.column1, t1.column2, t2.column1
FROM {t1} t1
JOIN {t2} t2 ON t1.id = t2.{t1}_id
WHERE t1.column1 = 'value'
LIMIT 100;
```",
        t1 = table1,
        t2 = table2
    )
}

fn data_analysis_template(table_name: &str) -> String {
    format!(
        "Help me perform data analysis on the '{table}' table.

I'd like to explore:
1. Basic statistics (counts, averages, mins, maxes)
2. Distributions of key columns
3. Potential patterns or anomalies
4. Grouping data in meaningful ways

Please suggest SQL queries for these analyses, explaining what each one shows and how to interpret the results.

Example for basic statistics:
```sql
SELECT
  COUNT(*) as total_records,
  AVG(numeric_column) as average_value,
  MIN(date_column) as earliest_date,
  MAX(date_column) as latest_date
FROM {table};
```",
        table = table_name
    )
}

fn query_optimization_template(query: &str) -> String {
    format!(
        "I need help optimizing this SQL query:

```sql
{query}
```

Please analyze this query and suggest optimizations for:
1. Performance improvements
2. Better readability
3. Following SQL best practices
4. Potential issues or edge cases

Provide an optimized version of the query with explanations for each change made.",
        query = query
    )
}

const DATABASE_EXPLORATION_WORKFLOW: &str = "I want to explore and understand this database systematically.

Please guide me through a step-by-step process to:

1. First understand the overall database structure
   - What tables exist?
   - How are they related?
   - What's the purpose of each table?

2. Then explore specific tables of interest
   - What columns and data types are in these tables?
   - What are example values?
   - Are there any constraints or indexes?

3. Finally, help me create queries to answer questions about the data
   - How to retrieve specific information?
   - How to aggregate and analyze data?
   - What insights might be available?

Please ask me questions to guide this exploration and help me understand the database thoroughly.";

/// render a prompt to its text; `Err` carries a params error message
pub fn render(name: &str, arguments: &Map<String, Value>) -> Result<String, String> {
    let arg = |key: &str| -> Result<&str, String> {
        arguments
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| format!("missing required argument: {}", key))
    };

    match name {
        "basic_query_template" => Ok(basic_query_template(arg("table_name")?)),
        "join_tables_template" => Ok(join_tables_template(arg("table1")?, arg("table2")?)),
        "data_analysis_template" => Ok(data_analysis_template(arg("table_name")?)),
        "query_optimization_template" => Ok(query_optimization_template(arg("query")?)),
        "database_exploration_workflow" => Ok(DATABASE_EXPLORATION_WORKFLOW.to_string()),
        other => Err(format!("Unknown prompt: {}", other)),
    }
}

/// `prompts/get` result: the rendered text as a single user message
pub fn get(name: &str, arguments: &Map<String, Value>) -> Result<Value, String> {
    let text = render(name, arguments)?;
    let description = PROMPTS
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.description)
        .unwrap_or_default();

    Ok(json!({
        "description": description,
        "messages": [
            {
                "role": "user",
                "content": {"type": "text", "text": text}
            }
        ]
    }))
}

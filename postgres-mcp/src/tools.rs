use crate::context::{ensure_table, require, DbContext};
use crate::error::{pg_message, ToolError, ToolResult};
use crate::render::{
    quote_ident, render_query_results, render_relationships, render_table_stats, ColumnStats,
    Reference,
};
use serde_json::{json, Value};
use tokio_postgres::SimpleQueryMessage;

const OUTGOING_REFERENCES_QUERY: &str = "
    SELECT
        rel_kcu.table_name::text AS foreign_table,
        rel_kcu.column_name::text AS foreign_column,
        kcu.column_name::text AS local_column
    FROM information_schema.table_constraints tco
    JOIN information_schema.key_column_usage kcu
        ON tco.constraint_schema = kcu.constraint_schema
        AND tco.constraint_name = kcu.constraint_name
    JOIN information_schema.referential_constraints rco
        ON tco.constraint_schema = rco.constraint_schema
        AND tco.constraint_name = rco.constraint_name
    JOIN information_schema.key_column_usage rel_kcu
        ON rco.unique_constraint_schema = rel_kcu.constraint_schema
        AND rco.unique_constraint_name = rel_kcu.constraint_name
        AND kcu.ordinal_position = rel_kcu.ordinal_position
    WHERE tco.constraint_type = 'FOREIGN KEY'
        AND kcu.table_name::text = $1
    ORDER BY kcu.column_name";

const INCOMING_REFERENCES_QUERY: &str = "
    SELECT
        kcu.table_name::text AS foreign_table,
        kcu.column_name::text AS foreign_column,
        rel_kcu.column_name::text AS local_column
    FROM information_schema.table_constraints tco
    JOIN information_schema.key_column_usage kcu
        ON tco.constraint_schema = kcu.constraint_schema
        AND tco.constraint_name = kcu.constraint_name
    JOIN information_schema.referential_constraints rco
        ON tco.constraint_schema = rco.constraint_schema
        AND tco.constraint_name = rco.constraint_name
    JOIN information_schema.key_column_usage rel_kcu
        ON rco.unique_constraint_schema = rel_kcu.constraint_schema
        AND rco.unique_constraint_name = rel_kcu.constraint_name
        AND kcu.ordinal_position = rel_kcu.ordinal_position
    WHERE tco.constraint_type = 'FOREIGN KEY'
        AND rel_kcu.table_name::text = $1
    ORDER BY kcu.table_name, kcu.column_name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    RunSqlQuery { query: String },
    GetTableStats { table_name: String },
    FindRelatedTables { table_name: String },
}

impl Tool {
    /// resolve a `tools/call` name plus arguments; `Err` carries a params error message
    pub fn from_call(name: &str, arguments: &serde_json::Map<String, Value>) -> Result<Self, String> {
        let arg = |key: &str| -> Result<String, String> {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("missing required argument: {}", key))
        };

        match name {
            "run_sql_query" => Ok(Self::RunSqlQuery { query: arg("query")? }),
            "get_table_stats" => Ok(Self::GetTableStats {
                table_name: arg("table_name")?,
            }),
            "find_related_tables" => Ok(Self::FindRelatedTables {
                table_name: arg("table_name")?,
            }),
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}

fn string_schema(key: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            key: {"type": "string", "description": description}
        },
        "required": [key]
    })
}

pub fn list() -> Value {
    json!({
        "tools": [
            {
                "name": "run_sql_query",
                "description": "Run a read-only SQL query against the PostgreSQL database",
                "inputSchema": string_schema("query", "SQL query to execute (must be SELECT only)")
            },
            {
                "name": "get_table_stats",
                "description": "Get statistics about a specific table: row count, size and per-column null and distinct counts",
                "inputSchema": string_schema("table_name", "Name of the table to analyze")
            },
            {
                "name": "find_related_tables",
                "description": "Find tables related to the specified table through foreign keys",
                "inputSchema": string_schema("table_name", "Name of the table to find relationships for")
            }
        ]
    })
}

pub async fn call(db: Option<&DbContext>, tool: &Tool) -> ToolResult<String> {
    let db = require(db)?;
    match tool {
        Tool::RunSqlQuery { query } => run_sql_query(db, query).await,
        Tool::GetTableStats { table_name } => get_table_stats(db, table_name).await,
        Tool::FindRelatedTables { table_name } => find_related_tables(db, table_name).await,
    }
}

/// trimmed query if it is a single select statement
pub fn check_read_only(query: &str) -> ToolResult<&str> {
    let query = query.trim();
    if !query.to_lowercase().starts_with("select") {
        return Err(ToolError::NotSelect);
    }

    let body = query.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if has_statement_separator(body) {
        return Err(ToolError::MultipleStatements);
    }

    Ok(query)
}

/// length of a `$tag$` opener at the start of `rest`, tag possibly empty
fn dollar_tag_len(rest: &[u8]) -> Option<usize> {
    let mut j = 1;
    while j < rest.len() {
        let b = rest[j];
        let ident = b == b'_' || b.is_ascii_alphabetic() || (j > 1 && b.is_ascii_digit());
        if !ident {
            break;
        }
        j += 1;
    }
    (rest.get(j) == Some(&b'$')).then_some(j + 1)
}

/// a `;` outside string literals, quoted identifiers, dollar quotes and comments
fn has_statement_separator(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b';' => return true,
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        // doubled quote is an escape
                        if bytes.get(i + 1) == Some(&quote) {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'$' => {
                if let Some(tag_len) = dollar_tag_len(&bytes[i..]) {
                    let tag = &sql[i..i + tag_len];
                    match sql[i + tag_len..].find(tag) {
                        Some(end) => i += tag_len + end + tag_len - 1,
                        None => return false,
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    false
}

async fn run_sql_query(db: &DbContext, query: &str) -> ToolResult<String> {
    let query = check_read_only(query)?;

    let mut client = db.pool.get().await?;
    let tx = client
        .build_transaction()
        .read_only(true)
        .start()
        .await?;

    let messages = tx
        .simple_query(query)
        .await
        .map_err(|e| ToolError::Execution(pg_message(&e)))?;
    tx.rollback().await?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for message in messages {
        if let SimpleQueryMessage::Row(row) = message {
            if columns.is_empty() {
                columns = row.columns().iter().map(|c| c.name().to_string()).collect();
            }
            rows.push((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect());
        }
    }

    tracing::debug!(rows = rows.len(), "read-only query executed");
    Ok(render_query_results(&columns, &rows))
}

async fn get_table_stats(db: &DbContext, table: &str) -> ToolResult<String> {
    ensure_table(db, table).await?;
    let client = db.pool.get().await?;
    let relation = format!("public.{}", quote_ident(table));

    let row_count: i64 = client
        .query_one(format!("SELECT COUNT(*) FROM {}", relation).as_str(), &[])
        .await?
        .try_get(0)?;

    let size: String = client
        .query_one(
            "SELECT pg_size_pretty(pg_total_relation_size($1::text::regclass))",
            &[&relation],
        )
        .await?
        .try_get(0)?;

    let column_rows = client
        .query(
            "SELECT column_name::text, data_type::text
             FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name::text = $1
             ORDER BY ordinal_position",
            &[&table],
        )
        .await?;

    let mut stats = Vec::with_capacity(column_rows.len());
    for row in &column_rows {
        let name: String = row.try_get(0)?;
        let data_type: String = row.try_get(1)?;
        let column = quote_ident(&name);

        let sql = format!(
            "SELECT COUNT(*) FILTER (WHERE {col} IS NULL), COUNT(DISTINCT {col}) FROM {rel}",
            col = column,
            rel = relation
        );
        let counts = client.query_one(sql.as_str(), &[]).await?;

        stats.push(ColumnStats {
            name,
            data_type,
            null_count: counts.try_get(0)?,
            distinct_count: counts.try_get(1)?,
        });
    }

    Ok(render_table_stats(table, row_count, &size, &stats))
}

async fn find_related_tables(db: &DbContext, table: &str) -> ToolResult<String> {
    ensure_table(db, table).await?;
    let client = db.pool.get().await?;

    let to_references = |rows: Vec<tokio_postgres::Row>| -> ToolResult<Vec<Reference>> {
        rows.iter()
            .map(|row| -> ToolResult<Reference> {
                Ok((
                    row.try_get::<_, String>("local_column")?,
                    row.try_get::<_, String>("foreign_table")?,
                    row.try_get::<_, String>("foreign_column")?,
                ))
            })
            .collect()
    };

    let outgoing = to_references(client.query(OUTGOING_REFERENCES_QUERY, &[&table]).await?)?;
    let incoming = to_references(client.query(INCOMING_REFERENCES_QUERY, &[&table]).await?)?;

    Ok(render_relationships(table, &outgoing, &incoming))
}

use crate::context::{ensure_table, require, DbContext};
use crate::error::ToolResult;
use crate::render::{
    quote_ident, render_create_table, render_database_info, render_table_list, ColumnDef,
    DatabaseInfo,
};
use serde_json::{json, Value};

pub const SCHEMA_URI: &str = "postgres://schema";
pub const DATABASE_INFO_URI: &str = "postgres://database/info";
pub const TABLE_URI_PREFIX: &str = "postgres://table/";

/// a resource uri resolved to what it reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Schema,
    Table(String),
    DatabaseInfo,
}

impl Resource {
    pub fn parse(uri: &str) -> Option<Self> {
        match uri {
            SCHEMA_URI => Some(Self::Schema),
            DATABASE_INFO_URI => Some(Self::DatabaseInfo),
            _ => uri
                .strip_prefix(TABLE_URI_PREFIX)
                .filter(|name| !name.is_empty())
                .map(|name| Self::Table(name.to_string())),
        }
    }
}

pub fn list() -> Value {
    json!({
        "resources": [
            {
                "uri": SCHEMA_URI,
                "name": "list_schema_tables",
                "description": "List all tables in the database schema",
                "mimeType": "text/plain"
            },
            {
                "uri": DATABASE_INFO_URI,
                "name": "get_database_info",
                "description": "Get general information about the connected database",
                "mimeType": "text/plain"
            }
        ]
    })
}

pub fn templates() -> Value {
    json!({
        "resourceTemplates": [
            {
                "uriTemplate": "postgres://table/{table_name}",
                "name": "get_table_schema",
                "description": "Get the schema definition for a specific table",
                "mimeType": "text/plain"
            }
        ]
    })
}

/// text for a resource; domain failures come back as `Err` for the caller to render
pub async fn read(db: Option<&DbContext>, resource: &Resource) -> ToolResult<String> {
    let db = require(db)?;
    match resource {
        Resource::Schema => list_schema_tables(db).await,
        Resource::Table(name) => get_table_schema(db, name).await,
        Resource::DatabaseInfo => get_database_info(db).await,
    }
}

async fn list_schema_tables(db: &DbContext) -> ToolResult<String> {
    let client = db.pool.get().await?;
    let rows = client
        .query(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = 'public'
             ORDER BY table_name",
            &[],
        )
        .await?;

    let tables = rows
        .iter()
        .map(|row| row.try_get::<_, String>(0))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(render_table_list(&db.database_name, &tables))
}

async fn get_table_schema(db: &DbContext, table: &str) -> ToolResult<String> {
    ensure_table(db, table).await?;
    let client = db.pool.get().await?;

    let column_rows = client
        .query(
            "SELECT column_name::text, data_type::text, is_nullable::text, column_default::text
             FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name::text = $1
             ORDER BY ordinal_position",
            &[&table],
        )
        .await?;

    let mut columns = Vec::with_capacity(column_rows.len());
    for row in &column_rows {
        let is_nullable: String = row.try_get(2)?;
        columns.push(ColumnDef {
            name: row.try_get(0)?,
            data_type: row.try_get(1)?,
            nullable: is_nullable == "YES",
            default: row.try_get(3)?,
        });
    }

    let qualified = format!("public.{}", quote_ident(table));
    let primary_keys = client
        .query(
            "SELECT a.attname::text
             FROM pg_index i
             JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
             WHERE i.indrelid = $1::text::regclass AND i.indisprimary",
            &[&qualified],
        )
        .await?
        .iter()
        .map(|row| row.try_get::<_, String>(0))
        .collect::<Result<Vec<_>, _>>()?;

    let indexes = client
        .query(
            "SELECT indexdef::text FROM pg_indexes
             WHERE schemaname = 'public' AND tablename::text = $1
             ORDER BY indexname",
            &[&table],
        )
        .await?
        .iter()
        .map(|row| row.try_get::<_, String>(0))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(render_create_table(table, &columns, &primary_keys, &indexes))
}

async fn get_database_info(db: &DbContext) -> ToolResult<String> {
    let client = db.pool.get().await?;

    let version: String = client.query_one("SELECT version()", &[]).await?.try_get(0)?;
    let size: String = client
        .query_one(
            "SELECT pg_size_pretty(pg_database_size(current_database()))",
            &[],
        )
        .await?
        .try_get(0)?;
    let counts = client
        .query_one(
            "SELECT
                (SELECT COUNT(*) FROM information_schema.schemata) AS schema_count,
                (SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public') AS table_count,
                (SELECT COUNT(*) FROM information_schema.views WHERE table_schema = 'public') AS view_count",
            &[],
        )
        .await?;

    Ok(render_database_info(&DatabaseInfo {
        name: db.database_name.clone(),
        version,
        size,
        schema_count: counts.try_get("schema_count")?,
        table_count: counts.try_get("table_count")?,
        view_count: counts.try_get("view_count")?,
    }))
}

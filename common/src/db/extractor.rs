use crate::error::Result;
use crate::schema::{Column, DatabaseSchema, ForeignKey, Table};
use async_trait::async_trait;
use deadpool_postgres::Pool;

const TABLES_QUERY: &str = r#"
    SELECT
        t.table_schema::text AS table_schema,
        t.table_name::text AS table_name,
        obj_description(pgc.oid) AS table_description
    FROM information_schema.tables t
    JOIN pg_catalog.pg_class pgc ON t.table_name = pgc.relname
    JOIN pg_catalog.pg_namespace pgn
        ON pgc.relnamespace = pgn.oid AND t.table_schema = pgn.nspname
    WHERE t.table_type = 'BASE TABLE'
        AND t.table_schema NOT IN ('pg_catalog', 'information_schema')
    ORDER BY t.table_schema, t.table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.column_default::text AS column_default,
        c.is_nullable::text AS is_nullable,
        col_description(pgc.oid, c.ordinal_position::int) AS column_description
    FROM information_schema.columns c
    JOIN pg_catalog.pg_class pgc ON c.table_name = pgc.relname
    JOIN pg_catalog.pg_namespace pgn
        ON pgc.relnamespace = pgn.oid AND c.table_schema = pgn.nspname
    WHERE c.table_schema::text = $1
        AND c.table_name::text = $2
    ORDER BY c.ordinal_position
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        kcu.table_schema::text AS table_schema,
        kcu.table_name::text AS table_name,
        kcu.column_name::text AS column_name,
        ccu.table_schema::text AS foreign_table_schema,
        ccu.table_name::text AS foreign_table_name,
        ccu.column_name::text AS foreign_column_name
    FROM information_schema.table_constraints AS tc
    JOIN information_schema.key_column_usage AS kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage AS ccu
        ON ccu.constraint_name = tc.constraint_name
    WHERE tc.constraint_type = 'FOREIGN KEY'
    ORDER BY kcu.table_schema, kcu.table_name
"#;

/// anything that can produce a schema snapshot for a database
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn extract_schema(&self, db_name: Option<&str>) -> Result<DatabaseSchema>;
}

/// reads the postgres catalogs through the shared pool; never writes
pub struct PgSchemaExtractor {
    pool: Pool,
}

impl PgSchemaExtractor {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaSource for PgSchemaExtractor {
    #[tracing::instrument(skip(self))]
    async fn extract_schema(&self, db_name: Option<&str>) -> Result<DatabaseSchema> {
        let client = self.pool.get().await?;

        let table_rows = client.query(TABLES_QUERY, &[]).await?;
        let mut tables = Vec::with_capacity(table_rows.len());

        for row in &table_rows {
            let schema_name: String = row.try_get("table_schema")?;
            let table_name: String = row.try_get("table_name")?;
            let description: Option<String> = row.try_get("table_description")?;

            let column_rows = client
                .query(COLUMNS_QUERY, &[&schema_name, &table_name])
                .await?;

            let mut columns = Vec::with_capacity(column_rows.len());
            for col in &column_rows {
                let is_nullable: String = col.try_get("is_nullable")?;
                columns.push(Column {
                    name: col.try_get("column_name")?,
                    data_type: col.try_get("data_type")?,
                    nullable: is_nullable == "YES",
                    default: col.try_get("column_default")?,
                    description: col.try_get("column_description")?,
                });
            }

            tables.push(Table {
                name: table_name,
                schema: schema_name,
                columns,
                description,
            });
        }

        let fk_rows = client.query(FOREIGN_KEYS_QUERY, &[]).await?;
        let mut foreign_keys = Vec::with_capacity(fk_rows.len());
        for row in &fk_rows {
            foreign_keys.push(ForeignKey {
                table_schema: row.try_get("table_schema")?,
                table_name: row.try_get("table_name")?,
                column_name: row.try_get("column_name")?,
                foreign_table_schema: row.try_get("foreign_table_schema")?,
                foreign_table_name: row.try_get("foreign_table_name")?,
                foreign_column_name: row.try_get("foreign_column_name")?,
            });
        }

        let schema = DatabaseSchema::new(tables, foreign_keys);
        tracing::info!(
            tables = schema.tables.len(),
            columns = schema.column_count(),
            foreign_keys = schema.foreign_keys.len(),
            "schema extracted"
        );

        Ok(schema)
    }
}

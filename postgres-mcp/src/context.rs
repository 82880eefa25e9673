use crate::error::{ToolError, ToolResult};
use common::db::{pool, DatabaseProbe, Pool};

/// live database handle; absent when no connection string is configured
/// or the first connection failed
#[derive(Clone)]
pub struct DbContext {
    pub pool: Pool,
    pub database_name: String,
}

impl DbContext {
    /// connect from a `postgresql://` url, logging and returning `None` on failure
    pub async fn connect(connection_string: Option<&str>) -> Option<Self> {
        let Some(connection_string) = connection_string.filter(|s| !s.is_empty()) else {
            tracing::error!("POSTGRES_CONNECTION_STRING environment variable not set");
            return None;
        };

        let pool = match pool::connect_url(connection_string, 10) {
            Ok(pool) => pool,
            Err(e) => {
                tracing::error!("failed to connect to postgres: {}", e);
                return None;
            }
        };

        if let Err(e) = pool.ping().await {
            tracing::error!("failed to connect to postgres: {}", e);
            return None;
        }

        let database_name = pool::database_name(connection_string).unwrap_or_default();
        tracing::info!("connected to postgres database: {}", database_name);

        Some(Self {
            pool,
            database_name,
        })
    }
}

pub fn require(db: Option<&DbContext>) -> ToolResult<&DbContext> {
    db.ok_or(ToolError::Unavailable)
}

/// whether `name` is a table or view in the public schema
pub async fn table_exists(db: &DbContext, name: &str) -> ToolResult<bool> {
    let client = db.pool.get().await?;
    let row = client
        .query_one(
            "SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name::text = $1
            )",
            &[&name],
        )
        .await?;
    Ok(row.try_get(0)?)
}

pub async fn ensure_table(db: &DbContext, name: &str) -> ToolResult<()> {
    if table_exists(db, name).await? {
        Ok(())
    } else {
        Err(ToolError::TableNotFound(name.to_string()))
    }
}

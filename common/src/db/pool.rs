use crate::config::DatabaseSettings;
use crate::error::{Result, TextToSqlError};
use async_trait::async_trait;
use deadpool_postgres::{Manager, Pool};
use std::str::FromStr;
use tokio_postgres::NoTls;

/// build a pool from discrete settings and open `min_connections` eagerly
#[tracing::instrument(skip(settings), fields(db.host = %settings.host, db.name = %settings.name))]
pub async fn connect(settings: &DatabaseSettings) -> Result<Pool> {
    let pool = build_pool(settings.to_pg_config(), settings.max_connections)?;
    prewarm(&pool, settings.min_connections.min(settings.max_connections)).await?;
    tracing::info!(
        min = settings.min_connections,
        max = settings.max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// build a pool from a `postgresql://` connection string; no connection is
/// opened until first use
pub fn connect_url(connection_string: &str, max_connections: usize) -> Result<Pool> {
    let config = tokio_postgres::Config::from_str(connection_string)
        .map_err(|e| TextToSqlError::Config(format!("invalid connection string: {}", e)))?;
    build_pool(config, max_connections)
}

fn build_pool(config: tokio_postgres::Config, max_connections: usize) -> Result<Pool> {
    let manager = Manager::new(config, NoTls);
    Pool::builder(manager)
        .max_size(max_connections.max(1))
        .build()
        .map_err(|e| TextToSqlError::Config(format!("failed to build pool: {}", e)))
}

async fn prewarm(pool: &Pool, count: usize) -> Result<()> {
    // hold every connection until all are open so the pool really grows
    let mut held = Vec::with_capacity(count);
    for _ in 0..count {
        held.push(pool.get().await?);
    }
    Ok(())
}

/// database name embedded in a connection string, if any
pub fn database_name(connection_string: &str) -> Option<String> {
    tokio_postgres::Config::from_str(connection_string)
        .ok()
        .and_then(|c| c.get_dbname().map(str::to_string))
}

/// liveness probe used by health reporting
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl DatabaseProbe for Pool {
    async fn ping(&self) -> Result<()> {
        let client = self.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod context;
mod error;
mod prompts;
mod protocol;
mod render;
mod resources;
mod server;
mod tools;
mod transport;

use common::tracing::init_tracing;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // stdout carries the protocol, so logging goes to stderr
    let _guard = init_tracing("postgres-mcp", "info")?;

    let connection_string = std::env::var("POSTGRES_CONNECTION_STRING").ok();
    let db = context::DbContext::connect(connection_string.as_deref()).await;
    if db.is_none() {
        tracing::warn!("starting without a database; resources and tools will report it unavailable");
    }

    let server = server::McpServer::new(db);
    transport::run(
        &server,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod api;
mod cmd;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env file is fine; real env vars still apply
    dotenv::dotenv().ok();

    let args = cmd::Cli::parse();
    args.execute().await
}

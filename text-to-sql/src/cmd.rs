use crate::api::{self, AppState, CorsPolicy};
use anyhow::Result;
use clap::{Parser, Subcommand};
use common::agent::{LlmValidator, SqlValidator};
use common::config::{ApiSettings, CacheSettings, DatabaseSettings, LlmSettings};
use common::db::{pool, DatabaseProbe, PgSchemaExtractor, Pool, SchemaCache};
use common::llm::{ChatCompletion, CompletionClient};
use common::pipeline::{QueryRefiner, SqlGenerator};
use common::tracing::init_tracing;
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "text-to-sql")]
#[command(about = "convert natural language questions into postgresql queries", long_about = None)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    db: DatabaseSettings,

    #[command(flatten)]
    llm: LlmSettings,

    #[command(flatten)]
    cache: CacheSettings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the database connection, then serve the HTTP API
    Serve {
        #[command(flatten)]
        api: ApiSettings,
    },

    /// Generate SQL for a question and print it as JSON
    Query {
        /// Natural language question
        question: String,

        /// Schema cache key for the target database
        #[arg(long)]
        db_name: Option<String>,

        /// Skip the validation pass
        #[arg(long, default_value = "false")]
        no_validate: bool,
    },

    /// Refine a previously generated query using feedback
    Refine {
        /// The original natural language question
        question: String,

        /// SQL produced for the question earlier
        #[arg(long)]
        original_sql: String,

        /// What should change
        #[arg(long)]
        feedback: String,

        #[arg(long)]
        db_name: Option<String>,
    },

    /// Print the extracted schema as prompt context, or as JSON
    Schema {
        #[arg(long)]
        db_name: Option<String>,

        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Verify the database is reachable
    CheckDb,
}

/// the long-lived objects every command path shares
struct Services {
    pool: Pool,
    cache: Arc<SchemaCache>,
    generator: SqlGenerator,
    refiner: QueryRefiner,
}

impl Cli {
    async fn services(&self) -> Result<Services> {
        let pool = pool::connect(&self.db).await?;
        build_services(pool, &self.llm, &self.cache)
    }

    pub async fn execute(self) -> Result<()> {
        let _guard = init_tracing("text-to-sql", &self.log_level)?;

        tracing::debug!(db = ?self.db, llm = ?self.llm, "settings loaded");

        match self.command {
            Commands::Serve { ref api } => serve(&self.db, &self.llm, &self.cache, api).await,
            Commands::Query {
                ref question,
                ref db_name,
                no_validate,
            } => {
                let services = self.services().await?;
                let result = services
                    .generator
                    .generate(question, db_name.as_deref(), !no_validate)
                    .await?;
                print_json(&result)
            }
            Commands::Refine {
                ref question,
                ref original_sql,
                ref feedback,
                ref db_name,
            } => {
                let services = self.services().await?;
                let result = services
                    .refiner
                    .refine(question, original_sql, feedback, db_name.as_deref())
                    .await?;
                print_json(&result)
            }
            Commands::Schema { ref db_name, json } => {
                let services = self.services().await?;
                let schema = services.cache.get(db_name.as_deref()).await?;
                if json {
                    print_json(&schema.to_json())
                } else {
                    println!("{}", schema.to_context_string());
                    Ok(())
                }
            }
            Commands::CheckDb => {
                check_database(&self.db).await?;
                println!("database connection ok");
                Ok(())
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn check_database(db: &DatabaseSettings) -> Result<Pool> {
    let pool = match pool::connect(db).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = pool.ping().await {
        tracing::error!("failed to connect to database: {}", e);
        return Err(e.into());
    }

    tracing::info!("database connection verified");
    Ok(pool)
}

fn build_services(pool: Pool, llm: &LlmSettings, cache: &CacheSettings) -> Result<Services> {
    let cache = Arc::new(SchemaCache::new(
        Arc::new(PgSchemaExtractor::new(pool.clone())),
        cache.ttl(),
    ));

    let client: Arc<dyn ChatCompletion> = Arc::new(CompletionClient::from_settings(llm)?);
    let validator: Arc<dyn SqlValidator> =
        Arc::new(LlmValidator::new(Arc::clone(&client), llm.default_model.clone()));

    Ok(Services {
        generator: SqlGenerator::new(Arc::clone(&cache), Arc::clone(&client), Arc::clone(&validator)),
        refiner: QueryRefiner::new(Arc::clone(&cache), client, validator),
        cache,
        pool,
    })
}

async fn serve(
    db: &DatabaseSettings,
    llm: &LlmSettings,
    cache: &CacheSettings,
    api: &ApiSettings,
) -> Result<()> {
    let pool = check_database(db).await?;
    let services = build_services(pool, llm, cache)?;
    let state = Arc::new(AppState {
        generator: services.generator,
        refiner: services.refiner,
        cache: services.cache,
        probe: Arc::new(services.pool),
        cors: CorsPolicy::new(api.cors_origins.clone()),
    });

    tracing::info!(
        cache_ttl_secs = state.cache.ttl().as_secs(),
        "starting text-to-sql server on {}",
        api.bind_addr()
    );

    api::serve(state, &api.bind_addr()).await
}

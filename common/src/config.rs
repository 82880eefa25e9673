//! Environment-driven settings shared by the binaries.
//!
//! Every option is a clap argument with an env fallback, so flags win over
//! environment variables which win over defaults.

use clap::{Args, ValueEnum};
use std::fmt;
use std::time::Duration;

#[derive(Args, Clone)]
pub struct DatabaseSettings {
    /// Database user
    #[arg(long = "db-user", env = "DB_USER", default_value = "postgres")]
    pub user: String,

    /// Database password
    #[arg(long = "db-password", env = "DB_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub password: String,

    /// Database host
    #[arg(id = "db_host", long = "db-host", env = "DB_HOST", default_value = "localhost")]
    pub host: String,

    /// Database port
    #[arg(id = "db_port", long = "db-port", env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,

    /// Database name
    #[arg(long = "database", env = "DB_NAME", default_value = "postgres")]
    pub name: String,

    /// Connections opened eagerly at startup
    #[arg(long = "db-min-connections", env = "DB_MIN_CONNECTIONS", default_value_t = 5)]
    pub min_connections: usize,

    /// Upper bound on pooled connections
    #[arg(long = "db-max-connections", env = "DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: usize,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("min_connections", &self.min_connections)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DatabaseSettings {
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .user(&self.user)
            .password(&self.password)
            .host(&self.host)
            .port(self.port)
            .dbname(&self.name);
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    Openai,
    Anthropic,
}

#[derive(Args, Clone)]
pub struct LlmSettings {
    /// Base url of the chat completion endpoint
    #[arg(long = "llm-server-url", env = "LLM_SERVER_URL", default_value = "http://localhost:8000/v1")]
    pub server_url: String,

    /// Bearer token for the completion endpoint
    #[arg(long = "llm-api-key", env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used when a request does not name one
    #[arg(long = "llm-default-model", env = "LLM_DEFAULT_MODEL", default_value = "openai/gpt-4")]
    pub default_model: String,

    /// Per-call timeout in seconds
    #[arg(long = "llm-timeout", env = "LLM_TIMEOUT", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Provider whose api key is used when no explicit key is set
    #[arg(long = "llm-provider", env = "LLM_PROVIDER", value_enum, default_value = "openai")]
    pub provider: LlmProvider,

    #[arg(long = "openai-api-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long = "anthropic-api-key", env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("server_url", &self.server_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("provider", &self.provider)
            .finish()
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// explicit key first, then the selected provider's key
    pub fn resolved_api_key(&self) -> Option<String> {
        let provider_key = match self.provider {
            LlmProvider::Openai => self.openai_api_key.as_ref(),
            LlmProvider::Anthropic => self.anthropic_api_key.as_ref(),
        };

        self.api_key
            .as_ref()
            .or(provider_key)
            .filter(|k| !k.is_empty())
            .cloned()
    }
}

#[derive(Debug, Args, Clone)]
pub struct CacheSettings {
    /// Seconds a cached schema is served before re-extraction
    #[arg(long = "schema-cache-ttl", env = "SCHEMA_CACHE_TTL", default_value_t = 3600)]
    pub ttl_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Args, Clone)]
pub struct ApiSettings {
    /// Host ip to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Allowed CORS origins, comma separated
    #[arg(long = "cors-origins", env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,
}

impl ApiSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

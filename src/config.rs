//! Configuration management for the docket service
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{env}.toml)
//! - Default values

use crate::errors::AppError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// OpenAI API configuration (embeddings + chat)
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Source document and indexing configuration
    #[serde(default)]
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log filter directive
    #[serde(default = "default_rust_log")]
    pub rust_log: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database host
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Database port
    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database user
    #[serde(default = "default_db_user")]
    pub user: String,

    /// Database password (APP__DATABASE__PASSWORD)
    #[serde(default)]
    pub password: String,

    /// Database name
    #[serde(default = "default_db_name")]
    pub dbname: String,

    /// Keyspace holding the vector table, rendered as a schema
    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    /// Storage mode; only "pgvector" is supported
    #[serde(default = "default_db_mode")]
    pub mode: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    /// API key (APP__OPENAI__API_KEY); the literal "mock" selects
    /// in-process mock clients
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// API base URL (for custom endpoints)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Chat completion model
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Sampling temperature for completions
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for embedding requests
    #[serde(default = "default_openai_retries")]
    pub max_retries: u32,

    /// Provider tag, suffixes the vector table name
    #[serde(default = "default_provider")]
    pub provider: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentConfig {
    /// Where to download the document from
    #[serde(default = "default_document_url")]
    pub url: String,

    /// Local filename for the document
    #[serde(default = "default_document_filename")]
    pub filename: String,

    /// Directory the document is stored in
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Whether each question re-chunks and re-embeds the document
    #[serde(default = "default_process_pdf")]
    pub process_pdf: bool,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between adjacent chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_rust_log() -> String { "info,docket=debug".to_string() }
fn default_request_timeout() -> u64 { 60 }
fn default_max_concurrent() -> usize { 100 }
fn default_db_host() -> String { "localhost".to_string() }
fn default_db_port() -> u16 { 5432 }
fn default_db_user() -> String { "postgres".to_string() }
fn default_db_name() -> String { "docket".to_string() }
fn default_keyspace() -> String { "docket".to_string() }
fn default_db_mode() -> String { "pgvector".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_connect_timeout() -> u64 { 10 }
fn default_api_key() -> String { "mock".to_string() }
fn default_api_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_embedding_model() -> String { "text-embedding-ada-002".to_string() }
fn default_chat_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_temperature() -> f32 { 0.0 }
fn default_openai_timeout() -> u64 { 30 }
fn default_openai_retries() -> u32 { 3 }
fn default_provider() -> String { "openai".to_string() }
fn default_document_url() -> String {
    "https://github.com/GeorgeCrossIV/CassIO---PDF-Law-case-questions/raw/main/McCall-v-Microsoft.pdf"
        .to_string()
}
fn default_document_filename() -> String { "McCall-v-Microsoft.pdf".to_string() }
fn default_data_dir() -> String { "data".to_string() }
fn default_process_pdf() -> bool { true }
fn default_chunk_size() -> usize { 250 }
fn default_chunk_overlap() -> usize { 120 }
fn default_top_k() -> usize { 4 }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, AppError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__PASSWORD=...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl ServerConfig {
    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl DocumentConfig {
    /// Local path of the document (data_dir joined with filename)
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.filename)
    }
}

impl OpenAiConfig {
    /// Whether the in-process mock clients should be used
    pub fn is_mock(&self) -> bool {
        self.api_key == "mock"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rust_log: default_rust_log(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            dbname: default_db_name(),
            keyspace: default_keyspace(),
            mode: default_db_mode(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            api_base: default_api_base(),
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_openai_timeout(),
            max_retries: default_openai_retries(),
            provider: default_provider(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            url: default_document_url(),
            filename: default_document_filename(),
            data_dir: default_data_dir(),
            process_pdf: default_process_pdf(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

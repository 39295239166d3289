//! Postgres + pgvector implementation of the vector table.
//!
//! The table lives in the configured keyspace (a Postgres schema) and its
//! name is derived from the provider tag. Both are interpolated into SQL,
//! so they are validated as strict lowercase identifiers first.

use super::{ChunkRecord, ScoredChunk, VectorStore};
use crate::config::DatabaseConfig;
use crate::errors::AppError;
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// The single supported storage mode
const SUPPORTED_MODE: &str = "pgvector";

/// Prefix of the vector table; the provider tag completes the name
const TABLE_PREFIX: &str = "vs_law_pdf_";

/// Postgres-backed vector store
pub struct PgVectorStore {
    pool: PgPool,
    schema: String,
    table: String,
    dimension: usize,
}

impl PgVectorStore {
    /// Connect to Postgres and derive the table location from configuration
    pub async fn connect(
        config: &DatabaseConfig,
        provider: &str,
        dimension: usize,
    ) -> Result<Self, AppError> {
        validate_mode(&config.mode)?;

        let schema = config.keyspace.clone();
        validate_identifier(&schema)?;

        let table = table_name(provider);
        validate_identifier(&table)?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.dbname);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            pool,
            schema,
            table,
            dimension,
        })
    }

    /// Bootstrap the extension, schema and table
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema))
            .execute(&self.pool)
            .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                page INT NOT NULL,
                chunk_index INT NOT NULL,
                content TEXT NOT NULL,
                embedding vector({}) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            self.qualified_table(),
            self.dimension
        ))
        .execute(&self.pool)
        .await?;

        info!(table = %self.qualified_table(), dimension = self.dimension, "Vector table ready");
        Ok(())
    }

    fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query(&format!("TRUNCATE {}", self.qualified_table()))
            .execute(&self.pool)
            .await?;

        debug!(table = %self.qualified_table(), "Vector table cleared");
        Ok(())
    }

    async fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} (id, page, chunk_index, content, embedding) VALUES ($1, $2, $3, $4, $5)",
            self.qualified_table()
        );

        for chunk in chunks {
            sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(chunk.page)
                .bind(chunk.chunk_index)
                .bind(&chunk.content)
                .bind(Vector::from(chunk.embedding.clone()))
                .execute(&self.pool)
                .await?;
        }

        debug!(count = chunks.len(), "Chunks stored");
        Ok(())
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        let sql = format!(
            r#"
            SELECT page, chunk_index, content,
                   1 - (embedding <=> $1) AS score
            FROM {}
            ORDER BY embedding <=> $1
            LIMIT $2
            "#,
            self.qualified_table()
        );

        let rows = sqlx::query(&sql)
            .bind(Vector::from(embedding.to_vec()))
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut chunks = Vec::with_capacity(rows.len());
        for row in rows {
            chunks.push(ScoredChunk {
                page: row.try_get("page")?,
                chunk_index: row.try_get("chunk_index")?,
                content: row.try_get("content")?,
                score: row.try_get("score")?,
            });
        }

        Ok(chunks)
    }
}

/// Derive the vector table name from the provider tag
fn table_name(provider: &str) -> String {
    format!("{}{}", TABLE_PREFIX, provider)
}

/// Reject anything other than the supported storage mode
fn validate_mode(mode: &str) -> Result<(), AppError> {
    if mode == SUPPORTED_MODE {
        Ok(())
    } else {
        Err(AppError::InvalidConfiguration(format!(
            "Unsupported storage mode: {}",
            mode
        )))
    }
}

/// Schema and table names are interpolated into SQL, so they are held to
/// strict lowercase Postgres identifiers.
fn validate_identifier(name: &str) -> Result<(), AppError> {
    let mut chars = name.chars();
    let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if first_ok && rest_ok && name.len() <= 63 {
        Ok(())
    } else {
        Err(AppError::InvalidConfiguration(format!(
            "Invalid identifier: {:?}",
            name
        )))
    }
}

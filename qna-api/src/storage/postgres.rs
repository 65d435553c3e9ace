use super::{QnaStore, StorageError};
use crate::config::DatabaseConfig;
use crate::models::{NewQnaEntry, QnaEntry, ScoredEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Row};
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

// `id::BIGINT` keeps decoding stable when the table was created with SERIAL
const ENTRY_COLUMNS: &str = "id::BIGINT AS id, question, answer, category, subcategory";

/// Postgres-backed store; similarity is computed by `pg_trgm`
#[derive(Clone)]
pub struct PgQnaStore {
    pool: PgPool,
}

impl PgQnaStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let url = config.url.as_deref().ok_or_else(|| {
            StorageError::Configuration(
                "database url is not set (DATABASE_URL or [database].url)".to_string(),
            )
        })?;

        let mut options = PgConnectOptions::from_str(url)?;

        let ssl_mode = match config.ssl_mode.as_deref() {
            Some(mode) => Some(PgSslMode::from_str(mode)?),
            None if !url.contains("sslmode=") => Some(PgSslMode::VerifyFull),
            None => None,
        };
        if let Some(mode) = ssl_mode {
            options = options.ssl_mode(mode);
        }

        if config.resolve_ipv4 {
            let host = options.get_host().to_string();
            let address = resolve_ipv4(&host, options.get_port()).await?;
            info!(host = %host, address = %address, "Resolved database host to IPv4");
            if matches!(ssl_mode, Some(PgSslMode::VerifyFull)) {
                warn!("verify-full checks the server certificate against the resolved IP address");
            }
            options = options.host(&address.to_string());
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Creates the trigram extension, the table and its trigram index
    pub async fn init(&self) -> Result<(), StorageError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS pg_trgm")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS qna_library (
                id BIGSERIAL PRIMARY KEY,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                category TEXT,
                subcategory TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_qna_library_question_trgm
                ON qna_library USING gin (question gin_trgm_ops)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn server_time(&self) -> Result<DateTime<Utc>, StorageError> {
        Ok(sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&self.pool)
            .await?)
    }
}

async fn resolve_ipv4(host: &str, port: u16) -> Result<IpAddr, StorageError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let mut addresses = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        StorageError::Configuration(format!("Failed to resolve database host {host}: {e}"))
    })?;

    addresses
        .find(|addr| addr.is_ipv4())
        .map(|addr| addr.ip())
        .ok_or_else(|| {
            StorageError::Configuration(format!("No IPv4 address found for database host {host}"))
        })
}

#[async_trait]
impl QnaStore for PgQnaStore {
    async fn list(&self) -> Result<Vec<QnaEntry>, StorageError> {
        let entries = sqlx::query_as::<_, QnaEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM qna_library ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn insert(&self, entry: NewQnaEntry) -> Result<QnaEntry, StorageError> {
        let created = sqlx::query_as::<_, QnaEntry>(&format!(
            r#"
            INSERT INTO qna_library (question, answer, category, subcategory)
            VALUES ($1, $2, $3, $4)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(&entry.question)
        .bind(&entry.answer)
        .bind(&entry.category)
        .bind(&entry.subcategory)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM qna_library WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_similar(
        &self,
        question: &str,
        min_score: f32,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, StorageError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}, similarity(question, $1) AS score
            FROM qna_library
            WHERE similarity(question, $1) > $2
            ORDER BY score DESC
            LIMIT $3
            "#
        ))
        .bind(question)
        .bind(min_score)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ScoredEntry, StorageError> {
                Ok(ScoredEntry {
                    entry: QnaEntry {
                        id: row.try_get("id")?,
                        question: row.try_get("question")?,
                        answer: row.try_get("answer")?,
                        category: row.try_get("category")?,
                        subcategory: row.try_get("subcategory")?,
                    },
                    score: row.try_get("score")?,
                })
            })
            .collect()
    }

    /// Polled by `/health`, so it stays silent
    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;
use tracing::info;

use super::document::Document;
use super::sql::{bind_param, count_sql, delete_sql, select_sql, within_sql, SqlResult};
use super::store::{prepare_insert, prepare_patch, DocumentStore, StoreError};
use crate::config::DatabaseConfig;
use crate::geo::SphericalCap;
use crate::query::{FindQuery, Predicate};

const SCHEMA_SQL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        doc JSONB NOT NULL,
        seq BIGSERIAL,
        PRIMARY KEY (collection, id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS documents_doc_gin ON documents USING GIN (doc jsonb_path_ops)",
    "CREATE INDEX IF NOT EXISTS documents_collection_seq ON documents (collection, seq)",
];

/// PostgreSQL-backed store keeping each document as a JSONB row
pub struct PgStore {
    pool: PgPool,
    log_queries: bool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("Connected to document database ({} max connections)", config.max_connections);
        Ok(Self { pool, log_queries: config.enable_query_logging })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA_SQL {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Document schema ready");
        Ok(())
    }

    async fn fetch_documents(&self, sql: &SqlResult) -> Result<Vec<Document>, StoreError> {
        self.log(sql);
        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_document).collect()
    }

    fn log(&self, sql: &SqlResult) {
        if self.log_queries {
            tracing::debug!(query = %sql.query, params = sql.params.len(), "executing document query");
        }
    }
}

fn row_document(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    match row.try_get::<Value, _>("doc")? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!("stored document is not an object: {}", other))),
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn count(&self, collection: &str, predicate: &Predicate) -> Result<u64, StoreError> {
        let sql = count_sql(collection, predicate);
        self.log(&sql);
        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let sql = select_sql(collection, &query.predicate, &query.sort, query.skip, query.limit);
        self.fetch_documents(&sql).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT doc FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_document).transpose()
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let (id, doc) = prepare_insert(doc)?;
        let row = sqlx::query("INSERT INTO documents (collection, id, doc) VALUES ($1, $2, $3) RETURNING doc")
            .bind(collection)
            .bind(&id)
            .bind(Value::Object(doc))
            .fetch_one(&self.pool)
            .await?;
        row_document(&row)
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Option<Document>, StoreError> {
        let patch = prepare_patch(patch);
        let row = sqlx::query(
            "UPDATE documents SET doc = doc || $3 WHERE collection = $1 AND id = $2 RETURNING doc",
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_document).transpose()
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, collection: &str, predicate: &Predicate) -> Result<u64, StoreError> {
        let sql = delete_sql(collection, predicate);
        self.log(&sql);
        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_param(q, p);
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }

    async fn find_within(&self, collection: &str, field: &str, cap: &SphericalCap) -> Result<Vec<Document>, StoreError> {
        let sql = within_sql(collection, field, cap);
        self.fetch_documents(&sql).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed document database pool");
    }
}

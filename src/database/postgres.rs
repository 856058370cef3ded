use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

use super::{CollectionStore, DocumentStore, StoreError, StoreResult, merge_content};
use crate::models::api::{
    Collection, CollectionForm, Document, DocumentForm, DocumentUpdateForm,
};

/// PostgreSQL-backed store for both entity tables.
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn new(uri: &str, pool_size: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(uri)
            .await?;

        info!("Connected to PostgreSQL (pool_size={pool_size})");
        Ok(Self { pool })
    }

    /// Create tables and indexes.
    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS collection (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                key VARCHAR(255) NOT NULL UNIQUE,
                title TEXT NOT NULL,
                content TEXT,
                user_id VARCHAR(255) NOT NULL,
                timestamp BIGINT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS document (
                id SERIAL PRIMARY KEY,
                collection_name VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL UNIQUE,
                title TEXT NOT NULL,
                filename VARCHAR(1024) NOT NULL,
                original_filename VARCHAR(1024),
                content TEXT,
                user_id VARCHAR(255) NOT NULL,
                collection VARCHAR(255),
                path TEXT,
                timestamp BIGINT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_document_collection ON document(collection)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_document_path ON document(path)")
            .execute(&self.pool)
            .await?;

        info!("Database tables initialized");
        Ok(())
    }
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

fn row_to_collection(r: &PgRow) -> Collection {
    Collection {
        id: r.get("id"),
        name: r.get("name"),
        key: r.get("key"),
        title: r.get("title"),
        content: r.get("content"),
        user_id: r.get("user_id"),
        timestamp: r.get("timestamp"),
    }
}

fn row_to_document(r: &PgRow) -> Document {
    Document {
        collection_name: r.get("collection_name"),
        name: r.get("name"),
        title: r.get("title"),
        filename: r.get("filename"),
        original_filename: r.get("original_filename"),
        content: r.get("content"),
        user_id: r.get("user_id"),
        collection: r.get("collection"),
        path: r.get("path"),
        timestamp: r.get("timestamp"),
    }
}

#[async_trait]
impl CollectionStore for PostgresDatabase {
    async fn insert(&self, user_id: &str, form: &CollectionForm) -> StoreResult<Collection> {
        let key = uuid::Uuid::new_v4().to_string();
        let timestamp = now_epoch();

        let row = sqlx::query(
            "INSERT INTO collection (name, key, title, content, user_id, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(&form.name)
        .bind(&key)
        .bind(&form.title)
        .bind(&form.content)
        .bind(user_id)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(Collection {
            id: row.get("id"),
            name: form.name.clone(),
            key,
            title: form.title.clone(),
            content: form.content.clone(),
            user_id: user_id.to_string(),
            timestamp,
        })
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Collection>> {
        let row = sqlx::query("SELECT * FROM collection WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_collection(&r)))
    }

    async fn get_by_key(&self, key: &str) -> StoreResult<Option<Collection>> {
        let row = sqlx::query("SELECT * FROM collection WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_collection(&r)))
    }

    async fn list(&self) -> StoreResult<Vec<Collection>> {
        let rows = sqlx::query("SELECT * FROM collection")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_collection).collect())
    }

    async fn update_by_name(&self, name: &str, form: &CollectionForm) -> StoreResult<Collection> {
        let result = sqlx::query(
            "UPDATE collection SET name = $1, title = $2, timestamp = $3 WHERE name = $4",
        )
        .bind(&form.name)
        .bind(&form.title)
        .bind(now_epoch())
        .bind(name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let row = sqlx::query("SELECT * FROM collection WHERE name = $1 LIMIT 1")
            .bind(&form.name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_collection(&r)).ok_or(StoreError::NotFound)
    }

    async fn update_by_key(&self, key: &str, form: &CollectionForm) -> StoreResult<Collection> {
        let result = sqlx::query(
            "UPDATE collection
             SET name = $1, title = $2, content = $3, timestamp = $4
             WHERE key = $5",
        )
        .bind(&form.name)
        .bind(&form.title)
        .bind(&form.content)
        .bind(now_epoch())
        .bind(key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let row = sqlx::query("SELECT * FROM collection WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_collection(&r)).ok_or(StoreError::NotFound)
    }

    async fn merge_content_by_name(
        &self,
        name: &str,
        partial: &Map<String, Value>,
    ) -> StoreResult<Collection> {
        // Row lock held across the read-modify-write so concurrent merges
        // to the same name serialize instead of losing updates.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT content FROM collection WHERE name = $1 LIMIT 1 FOR UPDATE")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        let current: Option<String> = match row {
            Some(r) => r.get("content"),
            None => return Err(StoreError::NotFound),
        };

        let merged = merge_content(current.as_deref(), partial);

        sqlx::query("UPDATE collection SET content = $1, timestamp = $2 WHERE name = $3")
            .bind(&merged)
            .bind(now_epoch())
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query("SELECT * FROM collection WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(row_to_collection(&row))
    }

    async fn delete_by_name(&self, name: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM collection WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_key(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM collection WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDatabase {
    async fn insert(&self, user_id: &str, form: &DocumentForm) -> StoreResult<Document> {
        let timestamp = now_epoch();

        sqlx::query(
            "INSERT INTO document
                (collection_name, name, title, filename, original_filename,
                 content, user_id, collection, path, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&form.collection_name)
        .bind(&form.name)
        .bind(&form.title)
        .bind(&form.filename)
        .bind(&form.original_filename)
        .bind(&form.content)
        .bind(user_id)
        .bind(&form.collection)
        .bind(&form.path)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        Ok(Document {
            collection_name: form.collection_name.clone(),
            name: form.name.clone(),
            title: form.title.clone(),
            filename: form.filename.clone(),
            original_filename: form.original_filename.clone(),
            content: form.content.clone(),
            user_id: user_id.to_string(),
            collection: form.collection.clone(),
            path: form.path.clone(),
            timestamp,
        })
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query("SELECT * FROM document WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_document(&r)))
    }

    async fn list(&self) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM document")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn get_by_paths(&self, paths: &[String]) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM document WHERE path = ANY($1)")
            .bind(paths)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn get_by_collection_name(&self, collection_name: &str) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM document WHERE collection_name = $1")
            .bind(collection_name)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn get_by_collection(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM document WHERE collection = $1")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn update_by_name(
        &self,
        name: &str,
        form: &DocumentUpdateForm,
    ) -> StoreResult<Document> {
        let result = sqlx::query(
            "UPDATE document SET name = $1, title = $2, timestamp = $3 WHERE name = $4",
        )
        .bind(&form.name)
        .bind(&form.title)
        .bind(now_epoch())
        .bind(name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let row = sqlx::query("SELECT * FROM document WHERE name = $1")
            .bind(&form.name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_document(&r)).ok_or(StoreError::NotFound)
    }

    async fn merge_content_by_name(
        &self,
        name: &str,
        partial: &Map<String, Value>,
    ) -> StoreResult<Document> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT content FROM document WHERE name = $1 FOR UPDATE")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        let current: Option<String> = match row {
            Some(r) => r.get("content"),
            None => return Err(StoreError::NotFound),
        };

        let merged = merge_content(current.as_deref(), partial);

        sqlx::query("UPDATE document SET content = $1, timestamp = $2 WHERE name = $3")
            .bind(&merged)
            .bind(now_epoch())
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query("SELECT * FROM document WHERE name = $1")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(row_to_document(&row))
    }

    async fn delete_by_name(&self, name: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM document WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM document").execute(&self.pool).await?;
        Ok(())
    }
}

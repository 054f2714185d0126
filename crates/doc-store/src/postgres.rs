use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Document, DocumentQuery, DocumentWrite, Result, SortKey, StoreError, Version,
    query::path_segments,
    store::{DocumentStore, PutOptions},
};

const COLUMNS: &str = "collection, key, version, created_at, updated_at, body";

/// PostgreSQL-backed document store.
///
/// All documents live in a single `documents` table keyed by
/// `(collection, key)` with the body stored as JSONB.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a store.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            collection: row.try_get("collection")?,
            key: row.try_get("key")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }

    async fn conflict(&self, write: DocumentWrite, expected: Version) -> StoreError {
        let actual = match sqlx::query_scalar::<_, i64>(
            "SELECT version FROM documents WHERE collection = $1 AND key = $2",
        )
        .bind(&write.collection)
        .bind(&write.key)
        .fetch_optional(&self.pool)
        .await
        {
            Ok(version) => Version::new(version.unwrap_or(0)),
            Err(e) => return StoreError::Database(e),
        };

        metrics::counter!("document_store_conflicts_total").increment(1);
        tracing::debug!(
            collection = %write.collection,
            key = %write.key,
            %expected,
            %actual,
            "document write rejected"
        );
        StoreError::ConcurrencyConflict {
            collection: write.collection,
            key: write.key,
            expected,
            actual,
        }
    }

    /// Appends WHERE clauses for the query filters, returning the next
    /// placeholder index.
    fn push_filters(sql: &mut String, query: &DocumentQuery) -> usize {
        let mut param = 1;
        for _ in &query.filters {
            sql.push_str(&format!(
                " AND body #> ${} = ${}",
                param + 1,
                param + 2
            ));
            param += 2;
        }
        param
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM documents WHERE collection = $1 AND key = $2"
        ))
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn put(&self, write: DocumentWrite, options: PutOptions) -> Result<Document> {
        let now = Utc::now();

        let row = match options.expected_version {
            None => {
                sqlx::query(&format!(
                    r#"
                    INSERT INTO documents (collection, key, version, created_at, updated_at, body)
                    VALUES ($1, $2, 1, $3, $3, $4)
                    ON CONFLICT (collection, key) DO UPDATE SET
                        version = documents.version + 1,
                        updated_at = EXCLUDED.updated_at,
                        body = EXCLUDED.body
                    RETURNING {COLUMNS}
                    "#
                ))
                .bind(&write.collection)
                .bind(&write.key)
                .bind(now)
                .bind(&write.body)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(expected) if expected == Version::initial() => {
                sqlx::query(&format!(
                    r#"
                    INSERT INTO documents (collection, key, version, created_at, updated_at, body)
                    VALUES ($1, $2, 1, $3, $3, $4)
                    ON CONFLICT (collection, key) DO NOTHING
                    RETURNING {COLUMNS}
                    "#
                ))
                .bind(&write.collection)
                .bind(&write.key)
                .bind(now)
                .bind(&write.body)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query(&format!(
                    r#"
                    UPDATE documents
                    SET version = version + 1, updated_at = $3, body = $4
                    WHERE collection = $1 AND key = $2 AND version = $5
                    RETURNING {COLUMNS}
                    "#
                ))
                .bind(&write.collection)
                .bind(&write.key)
                .bind(now)
                .bind(&write.body)
                .bind(expected.as_i64())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match row {
            Some(row) => Self::row_to_document(row),
            None => {
                let expected = options.expected_version.unwrap_or_default();
                Err(self.conflict(write, expected).await)
            }
        }
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        query.validate()?;

        let mut sql = format!("SELECT {COLUMNS} FROM documents WHERE collection = $1");
        let mut param = Self::push_filters(&mut sql, &query);

        let direction = query.direction.as_sql();
        match &query.sort {
            SortKey::CreatedAt => sql.push_str(&format!(" ORDER BY created_at {direction}")),
            SortKey::UpdatedAt => sql.push_str(&format!(" ORDER BY updated_at {direction}")),
            SortKey::Field(_) => {
                param += 1;
                sql.push_str(&format!(" ORDER BY body #> ${param} {direction}"));
            }
        }
        sql.push_str(&format!(", seq {direction}"));

        if query.limit.is_some() {
            param += 1;
            sql.push_str(&format!(" LIMIT ${param}"));
        }
        if query.offset.is_some() {
            param += 1;
            sql.push_str(&format!(" OFFSET ${param}"));
        }

        let mut sqlx_query = sqlx::query(&sql).bind(&query.collection);
        for filter in &query.filters {
            sqlx_query = sqlx_query
                .bind(path_segments(&filter.path)?)
                .bind(&filter.value);
        }
        if let SortKey::Field(path) = &query.sort {
            sqlx_query = sqlx_query.bind(path_segments(path)?);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn count(&self, query: &DocumentQuery) -> Result<u64> {
        query.validate()?;

        let mut sql = String::from("SELECT COUNT(*) FROM documents WHERE collection = $1");
        Self::push_filters(&mut sql, query);

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&sql).bind(&query.collection);
        for filter in &query.filters {
            sqlx_query = sqlx_query
                .bind(path_segments(&filter.path)?)
                .bind(&filter.value);
        }

        let count = sqlx_query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}

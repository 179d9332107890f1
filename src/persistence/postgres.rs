//! PostgreSQL implementation of the catalog store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::CatalogStore;
use crate::domain::{CatalogEntry, EntryId};
use crate::error::CatalogError;

/// DDL for the catalog table, applied by [`PostgresCatalogStore::init_schema`].
pub const CATALOG_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS catalog_entries (\
     id UUID PRIMARY KEY, \
     title VARCHAR(500) NOT NULL, \
     author VARCHAR(300) NOT NULL, \
     abstract_text TEXT, \
     status VARCHAR(50), \
     created_at TIMESTAMPTZ, \
     synced_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP)";

const UPSERT_ENTRY: &str = "INSERT INTO catalog_entries \
     (id, title, author, abstract_text, status, created_at, synced_at) \
     VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, CURRENT_TIMESTAMP)) \
     ON CONFLICT (id) DO UPDATE SET \
     title = EXCLUDED.title, \
     author = EXCLUDED.author, \
     abstract_text = EXCLUDED.abstract_text, \
     status = EXCLUDED.status, \
     created_at = COALESCE(catalog_entries.created_at, EXCLUDED.created_at), \
     synced_at = EXCLUDED.synced_at";

const SELECT_COLUMNS: &str =
    "SELECT id, title, author, abstract_text, status, created_at, synced_at FROM catalog_entries";

type EntryRow = (
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

fn entry_from_row(row: EntryRow) -> CatalogEntry {
    let (id, title, author, abstract_text, status, created_at, synced_at) = row;
    CatalogEntry {
        id: EntryId::from_uuid(id),
        title,
        author,
        abstract_text,
        status,
        created_at,
        synced_at,
    }
}

/// PostgreSQL-backed catalog store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the catalog table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError::PersistenceError`] on database failure.
    pub async fn init_schema(&self) -> Result<(), CatalogError> {
        sqlx::query(CATALOG_SCHEMA).execute(&self.pool).await?;
        tracing::info!("catalog schema initialized");
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn get_by_id(&self, id: EntryId) -> Result<Option<CatalogEntry>, CatalogError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(entry_from_row))
    }

    async fn upsert(&self, entry: &CatalogEntry) -> Result<(), CatalogError> {
        sqlx::query(UPSERT_ENTRY)
            .bind(*entry.id.as_uuid())
            .bind(&entry.title)
            .bind(&entry.author)
            .bind(&entry.abstract_text)
            .bind(&entry.status)
            .bind(entry.created_at)
            .bind(entry.synced_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY synced_at DESC NULLS LAST"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(entry_from_row).collect())
    }
}

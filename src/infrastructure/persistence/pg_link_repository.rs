//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{Link, LinkUpdate, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::LinkError;

const LINK_COLUMNS: &str =
    "code, target_url, created_at, expires_at, use_count, last_used_at, custom_alias";

#[derive(FromRow)]
struct LinkRow {
    code: String,
    target_url: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    use_count: i64,
    last_used_at: Option<DateTime<Utc>>,
    custom_alias: bool,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link::new(
            r.code,
            r.target_url,
            r.created_at,
            r.expires_at,
            r.use_count,
            r.last_used_at,
            r.custom_alias,
        )
    }
}

/// Maps a driver error to the store taxonomy.
///
/// A violation of the unique constraint on `code` becomes
/// [`LinkError::AlreadyExists`]; everything else is [`LinkError::StoreUnavailable`].
fn map_sqlx_error(e: sqlx::Error, code: &str) -> LinkError {
    if let Some(db) = e.as_database_error()
        && db.is_unique_violation()
    {
        return LinkError::already_exists(code);
    }

    LinkError::StoreUnavailable(e.to_string())
}

/// PostgreSQL repository for link storage and retrieval.
///
/// Every mutation is a single statement with `RETURNING`, so the row lock
/// taken by PostgreSQL serializes concurrent changes to the same code.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, LinkError> {
        let sql = format!(
            "INSERT INTO links (code, target_url, created_at, expires_at, custom_alias)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {LINK_COLUMNS}"
        );

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(&new_link.code)
            .bind(&new_link.target_url)
            .bind(new_link.created_at)
            .bind(new_link.expires_at)
            .bind(new_link.custom_alias)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error(e, &new_link.code))?;

        Ok(row.into())
    }

    async fn get(&self, code: &str) -> Result<Link, LinkError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE code = $1");

        sqlx::query_as::<_, LinkRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error(e, code))?
            .map(Link::from)
            .ok_or_else(|| LinkError::not_found(code))
    }

    async fn exists(&self, code: &str) -> Result<bool, LinkError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM links WHERE code = $1)")
            .bind(code)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error(e, code))
    }

    async fn update(&self, code: &str, update: LinkUpdate) -> Result<Link, LinkError> {
        let (assignments, conflict_code) = match &update {
            LinkUpdate::RecordUse { .. } => ("use_count = use_count + 1, last_used_at = $2", code),
            LinkUpdate::SetTarget(_) => ("target_url = $2", code),
            LinkUpdate::Rekey(new_code) => ("code = $2", new_code.as_str()),
        };
        let sql =
            format!("UPDATE links SET {assignments} WHERE code = $1 RETURNING {LINK_COLUMNS}");

        let query = sqlx::query_as::<_, LinkRow>(&sql).bind(code);
        let query = match &update {
            LinkUpdate::RecordUse { at } => query.bind(*at),
            LinkUpdate::SetTarget(url) => query.bind(url.as_str()),
            LinkUpdate::Rekey(new_code) => query.bind(new_code.as_str()),
        };

        query
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error(e, conflict_code))?
            .map(Link::from)
            .ok_or_else(|| LinkError::not_found(code))
    }

    async fn delete(&self, code: &str) -> Result<(), LinkError> {
        let result = sqlx::query("DELETE FROM links WHERE code = $1")
            .bind(code)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error(e, code))?;

        if result.rows_affected() == 0 {
            return Err(LinkError::not_found(code));
        }
        Ok(())
    }

    async fn delete_expired(&self, code: &str, as_of: DateTime<Utc>) -> Result<bool, LinkError> {
        let result = sqlx::query(
            "DELETE FROM links
             WHERE code = $1 AND expires_at IS NOT NULL AND expires_at < $2",
        )
        .bind(code)
        .bind(as_of)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error(e, code))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<Link>, LinkError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links
             WHERE expires_at IS NOT NULL AND expires_at < $1
             ORDER BY expires_at, code"
        );

        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(as_of)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| LinkError::StoreUnavailable(e.to_string()))?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn find_by_target(&self, target_url: &str) -> Result<Vec<Link>, LinkError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE target_url = $1 ORDER BY created_at, code"
        );

        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(target_url)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| LinkError::StoreUnavailable(e.to_string()))?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn most_used(&self, limit: usize) -> Result<Vec<Link>, LinkError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links ORDER BY use_count DESC, code ASC LIMIT $1"
        );

        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| LinkError::StoreUnavailable(e.to_string()))?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}

// src/db/model.rs

use std::{
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteRow, types::Json};
use validator::Validate;

use crate::{
    db::{
        filter::{Field, Filter, Sort, push_order_by},
        schema::Schema,
    },
    error::AppError,
};

/// Relation type for documents that reference nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoRelation {}

/// Expansion payload for documents that reference nothing.
#[derive(Debug, Default, Serialize)]
pub struct Unexpanded {}

/// A record type stored as one JSON document per row.
#[async_trait]
pub trait Document: Serialize + DeserializeOwned + Validate + Send + Sync + Unpin + 'static {
    /// Queryable fields.
    type Field: Field;

    /// Relations that `populate` can resolve.
    type Relation: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    /// Resolved relation data attached to a populated record.
    type Expanded: Serialize + Default + Send + 'static;

    fn schema() -> &'static Schema;

    /// Resolves `relations` for a batch of records.
    /// The result is aligned with `records`.
    async fn expand(
        _pool: &SqlitePool,
        records: &[Stored<Self>],
        _relations: &[Self::Relation],
    ) -> Result<Vec<Self::Expanded>, AppError> {
        Ok(records.iter().map(|_| Default::default()).collect())
    }
}

/// A persisted document together with its identity and timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct Stored<D> {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(flatten)]
    pub doc: D,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<D> Deref for Stored<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.doc
    }
}

impl<D> DerefMut for Stored<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.doc
    }
}

impl<'r, D: Document> FromRow<'r, SqliteRow> for Stored<D> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let Json(doc) = row.try_get::<Json<D>, _>("doc")?;
        Ok(Self {
            id: row.try_get("id")?,
            doc,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A stored record with its requested relations resolved.
#[derive(Debug, Serialize)]
#[serde(bound = "")]
pub struct Populated<D: Document> {
    #[serde(flatten)]
    pub record: Stored<D>,
    #[serde(flatten)]
    pub expanded: D::Expanded,
}

/// Handle bound to one collection.
///
/// Handles are obtained from the [`Registry`](crate::db::registry::Registry),
/// which makes sure the collection exists before the first use.
pub struct Model<D> {
    pool: SqlitePool,
    _doc: PhantomData<fn() -> D>,
}

impl<D> Clone for Model<D> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _doc: PhantomData,
        }
    }
}

impl<D: Document> fmt::Debug for Model<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("collection", &D::schema().name)
            .finish()
    }
}

impl<D: Document> Model<D> {
    pub(crate) fn bind(pool: SqlitePool) -> Self {
        Self {
            pool,
            _doc: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        D::schema().name
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn select(&self) -> QueryBuilder<'static, Sqlite> {
        QueryBuilder::new(format!(
            "SELECT id, doc, created_at, updated_at FROM {}",
            self.name()
        ))
    }

    fn encode(doc: &D) -> Result<String, AppError> {
        doc.validate()
            .map_err(|e| AppError::ConstraintViolation(e.to_string()))?;
        Ok(serde_json::to_string(doc)?)
    }

    /// Inserts a new document and stamps both timestamps.
    pub async fn create(&self, doc: D) -> Result<Stored<D>, AppError> {
        let body = Self::encode(&doc)?;
        let now = Utc::now();

        let id = sqlx::query(&format!(
            "INSERT INTO {} (doc, created_at, updated_at) VALUES (?, ?, ?)",
            self.name()
        ))
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            tracing::debug!("Insert into {} rejected: {}", self.name(), err);
            err
        })?
        .last_insert_rowid();

        tracing::debug!("Inserted {} #{}", self.name(), id);

        Ok(Stored {
            id,
            doc,
            created_at: now,
            updated_at: now,
        })
    }

    /// Filtered, sorted, windowed read. `limit = None` means no limit.
    pub async fn find(
        &self,
        filter: &Filter<D::Field>,
        sort: &[Sort<D::Field>],
        skip: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Stored<D>>, AppError> {
        let mut qb = self.select();
        qb.push(" WHERE ");
        filter.push_sql(&mut qb);
        push_order_by(&mut qb, sort);
        qb.push(" LIMIT ");
        qb.push_bind(limit.unwrap_or(-1));
        qb.push(" OFFSET ");
        qb.push_bind(skip);

        let records = qb
            .build_query_as::<Stored<D>>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query {}: {:?}", self.name(), e);
                AppError::from(e)
            })?;

        Ok(records)
    }

    pub async fn find_one(&self, filter: &Filter<D::Field>) -> Result<Option<Stored<D>>, AppError> {
        Ok(self.find(filter, &[], 0, Some(1)).await?.into_iter().next())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Stored<D>>, AppError> {
        let record = sqlx::query_as::<_, Stored<D>>(&format!(
            "SELECT id, doc, created_at, updated_at FROM {} WHERE id = ?",
            self.name()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Number of records matching `filter`, ignoring any window.
    pub async fn count(&self, filter: &Filter<D::Field>) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", self.name()));
        qb.push(" WHERE ");
        filter.push_sql(&mut qb);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count {}: {:?}", self.name(), e);
                AppError::from(e)
            })?;

        Ok(count)
    }

    /// Writes the document back and refreshes `updated_at`.
    pub async fn save(&self, record: &mut Stored<D>) -> Result<(), AppError> {
        let body = Self::encode(&record.doc)?;
        let now = Utc::now();

        let result = sqlx::query(&format!(
            "UPDATE {} SET doc = ?, updated_at = ? WHERE id = ?",
            self.name()
        ))
        .bind(body)
        .bind(now)
        .bind(record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "{} #{} not found",
                self.name(),
                record.id
            )));
        }

        record.updated_at = now;
        Ok(())
    }

    /// Returns whether a record was removed.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.name()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete from {}: {:?}", self.name(), e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_many(&self, filter: &Filter<D::Field>) -> Result<u64, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {}", self.name()));
        qb.push(" WHERE ");
        filter.push_sql(&mut qb);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Attaches the requested relations to already-loaded records.
    pub async fn populate(
        &self,
        records: Vec<Stored<D>>,
        relations: &[D::Relation],
    ) -> Result<Vec<Populated<D>>, AppError> {
        let expanded = D::expand(&self.pool, &records, relations).await?;
        Ok(records
            .into_iter()
            .zip(expanded)
            .map(|(record, expanded)| Populated { record, expanded })
            .collect())
    }

    pub async fn find_populated(
        &self,
        filter: &Filter<D::Field>,
        sort: &[Sort<D::Field>],
        skip: i64,
        limit: Option<i64>,
        relations: &[D::Relation],
    ) -> Result<Vec<Populated<D>>, AppError> {
        let records = self.find(filter, sort, skip, limit).await?;
        self.populate(records, relations).await
    }
}

//! PostgreSQL `ContentStore`
//!
//! Vector columns are handled with raw SQL: writes bind the pgvector
//! literal and cast it with `::vector`, reads select `embedding::text`.
//! Nearest-neighbour queries order by ascending `<=>` distance on the
//! dimension-cast column so the per-dimension HNSW index applies.

use super::models::{
    content_columns, description_expr, ContentRow, IdRow, NeighborRow, SummaryRow, VectorRow,
};
use super::vector::{parse_literal, to_literal};
use super::DbPool;
use crate::content::{ContentKind, ContentRecord, StoredEmbedding};
use crate::embeddings::ModelSpec;
use crate::errors::{AppError, Result};
use crate::store::{
    CandidateFilter, ContentStore, DocumentSummary, EmbeddedVector, Neighbor,
};
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, Statement, Value};
use std::collections::HashMap;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    fn statement(sql: &str, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
    }

    async fn execute_on_record(
        &self,
        kind: ContentKind,
        id: i64,
        sql: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let result = self
            .write_conn()
            .execute(Self::statement(sql, values))
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::DocumentNotFound {
                kind: kind.to_string(),
                id,
            });
        }
        Ok(())
    }

    fn into_records(kind: ContentKind, rows: Vec<ContentRow>) -> Result<Vec<ContentRecord>> {
        rows.into_iter().map(|row| row.into_record(kind)).collect()
    }
}

#[async_trait]
impl ContentStore for Repository {
    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    async fn find(&self, kind: ContentKind, id: i64) -> Result<Option<ContentRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            content_columns(kind),
            kind.collection_name()
        );

        ContentRow::find_by_statement(Self::statement(&sql, vec![id.into()]))
            .one(self.read_conn())
            .await?
            .map(|row| row.into_record(kind))
            .transpose()
    }

    async fn embedding_candidates(
        &self,
        kind: ContentKind,
        filter: &CandidateFilter,
        limit: usize,
    ) -> Result<Vec<ContentRecord>> {
        let sql = format!(
            r#"
            SELECT {columns}
            FROM {table}
            WHERE status = 'published'
              AND (
                $1
                OR (embedding IS NULL
                    AND (embedding_checked_at IS NULL OR updated_at > embedding_checked_at))
                OR embedding_model IS DISTINCT FROM $2
                OR embedding_dimensions IS DISTINCT FROM $3
                OR updated_at > GREATEST(embedding_generated_at, embedding_checked_at)
                OR ($4::timestamptz IS NOT NULL AND embedding_generated_at < $4::timestamptz)
              )
            ORDER BY id
            LIMIT $5
            "#,
            columns = content_columns(kind),
            table = kind.collection_name(),
        );

        let values: Vec<Value> = vec![
            filter.force.into(),
            filter.canonical.name.clone().into(),
            (filter.canonical.dimensions as i32).into(),
            filter.expired_before.into(),
            (limit as i64).into(),
        ];

        let rows = ContentRow::find_by_statement(Self::statement(&sql, values))
            .all(self.read_conn())
            .await?;
        Self::into_records(kind, rows)
    }

    async fn save_embedding(
        &self,
        kind: ContentKind,
        id: i64,
        embedding: &StoredEmbedding,
    ) -> Result<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET embedding = $1::vector,
                embedding_model = $2,
                embedding_dimensions = $3,
                embedding_text_hash = $4,
                embedding_generated_at = $5,
                embedding_checked_at = $5
            WHERE id = $6
            "#,
            kind.collection_name()
        );

        self.execute_on_record(
            kind,
            id,
            &sql,
            vec![
                to_literal(&embedding.vector).into(),
                embedding.model.clone().into(),
                (embedding.dimensions as i32).into(),
                embedding.text_hash.clone().into(),
                embedding.generated_at.into(),
                id.into(),
            ],
        )
        .await
    }

    async fn mark_checked(&self, kind: ContentKind, id: i64) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET embedding_checked_at = NOW() WHERE id = $1",
            kind.collection_name()
        );
        self.execute_on_record(kind, id, &sql, vec![id.into()]).await
    }

    async fn nearest(
        &self,
        kind: ContentKind,
        vector: &[f32],
        model: &ModelSpec,
        exclude: Option<i64>,
        max_distance: Option<f64>,
        limit: usize,
    ) -> Result<Vec<Neighbor>> {
        // Distance on the dimension-cast column matches the partial HNSW index
        let distance = format!(
            "(embedding::vector({dims}) <=> $1::vector({dims}))",
            dims = model.dimensions
        );
        let sql = format!(
            r#"
            SELECT id, {distance}::float8 AS distance
            FROM {table}
            WHERE embedding IS NOT NULL
              AND embedding_model = $2
              AND embedding_dimensions = $3
              AND {visible}
              AND ($4::bigint IS NULL OR id <> $4::bigint)
              AND ($5::float8 IS NULL OR {distance} <= $5::float8)
            ORDER BY {distance} ASC, id ASC
            LIMIT $6
            "#,
            distance = distance,
            table = kind.collection_name(),
            visible = kind.capability().visibility_sql(),
        );

        let values: Vec<Value> = vec![
            to_literal(vector).into(),
            model.name.clone().into(),
            (model.dimensions as i32).into(),
            exclude.into(),
            max_distance.into(),
            (limit as i64).into(),
        ];

        let rows = NeighborRow::find_by_statement(Self::statement(&sql, values))
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Neighbor {
                id: row.id,
                distance: row.distance,
            })
            .collect())
    }

    async fn hydrate(&self, kind: ContentKind, ids: &[i64]) -> Result<Vec<DocumentSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT id, title, slug, {description} AS description, published_at
            FROM {table}
            WHERE id = ANY($1) AND {visible}
            "#,
            description = description_expr(kind),
            table = kind.collection_name(),
            visible = kind.capability().visibility_sql(),
        );

        let rows = SummaryRow::find_by_statement(Self::statement(&sql, vec![ids.to_vec().into()]))
            .all(self.read_conn())
            .await?;

        let mut by_id: HashMap<i64, SummaryRow> = rows.into_iter().map(|r| (r.id, r)).collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|row| DocumentSummary {
                id: row.id,
                kind,
                title: row.title,
                slug: row.slug,
                description: row.description,
                published_at: row.published_at,
            })
            .collect())
    }

    async fn set_recommendations(&self, kind: ContentKind, id: i64, ids: &[i64]) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET recommended_ids = $1 WHERE id = $2",
            kind.collection_name()
        );
        self.execute_on_record(kind, id, &sql, vec![ids.to_vec().into(), id.into()])
            .await
    }

    async fn lexical_ranking(&self, kind: ContentKind, query: &str, limit: usize) -> Result<Vec<i64>> {
        let sql = format!(
            r#"
            SELECT id
            FROM {table}
            WHERE {visible}
              AND search_vector @@ plainto_tsquery('english', $1)
            ORDER BY ts_rank_cd(search_vector, plainto_tsquery('english', $1)) DESC, id ASC
            LIMIT $2
            "#,
            table = kind.collection_name(),
            visible = kind.capability().visibility_sql(),
        );

        let rows = IdRow::find_by_statement(Self::statement(
            &sql,
            vec![query.into(), (limit as i64).into()],
        ))
        .all(self.read_conn())
        .await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn fuzzy_ranking(
        &self,
        kind: ContentKind,
        query: &str,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<i64>> {
        let sql = format!(
            r#"
            SELECT id
            FROM (
                SELECT id,
                       GREATEST(
                           similarity(title, $1),
                           similarity(COALESCE({description}, ''), $1)
                       ) AS score
                FROM {table}
                WHERE {visible}
            ) scored
            WHERE score >= $2
            ORDER BY score DESC, id ASC
            LIMIT $3
            "#,
            description = description_expr(kind),
            table = kind.collection_name(),
            visible = kind.capability().visibility_sql(),
        );

        let rows = IdRow::find_by_statement(Self::statement(
            &sql,
            vec![query.into(), threshold.into(), (limit as i64).into()],
        ))
        .all(self.read_conn())
        .await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn list_embedded(&self, kind: ContentKind, limit: usize) -> Result<Vec<EmbeddedVector>> {
        let sql = format!(
            r#"
            SELECT id, embedding::text AS embedding_text, embedding_model, embedding_dimensions
            FROM {table}
            WHERE embedding IS NOT NULL AND {visible}
            ORDER BY id
            LIMIT $1
            "#,
            table = kind.collection_name(),
            visible = kind.capability().visibility_sql(),
        );

        let rows = VectorRow::find_by_statement(Self::statement(&sql, vec![(limit as i64).into()]))
            .all(self.read_conn())
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(EmbeddedVector {
                    id: row.id,
                    vector: parse_literal(&row.embedding_text)?,
                    model: row.embedding_model,
                    dimensions: row.embedding_dimensions.max(0) as usize,
                })
            })
            .collect()
    }
}

//! PostgreSQL-backed [`PriceStore`]

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use pricekeep_common::{CanonicalRecord, PersistedRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{sort_by_identity, CommitOutcome, PriceStore, StoreError};
use crate::config::DatabaseConfig;
use crate::models::PriceFilter;

/// Candidates sent per `INSERT ... UNNEST` statement.
const INSERT_CHUNK_SIZE: usize = 1_000;

const INSERT_SQL: &str = r#"
    INSERT INTO prices (product_id, create_date, name, category, price)
    SELECT * FROM UNNEST($1::TEXT[], $2::DATE[], $3::TEXT[], $4::TEXT[], $5::BIGINT[])
    ON CONFLICT (create_date, name, category, price) DO NOTHING
"#;

const STATS_SQL: &str = r#"
    SELECT COUNT(DISTINCT category)::BIGINT, COALESCE(SUM(price), 0)::TEXT
    FROM prices
"#;

const SELECT_SQL: &str = r#"
    SELECT id, name, category, price, create_date
    FROM prices
    WHERE ($1::DATE IS NULL OR create_date >= $1)
      AND ($2::DATE IS NULL OR create_date <= $2)
      AND ($3::BIGINT IS NULL OR price >= $3)
      AND ($4::BIGINT IS NULL OR price <= $4)
    ORDER BY create_date, id
"#;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: i64,
    name: String,
    category: String,
    price: i64,
    create_date: NaiveDate,
}

impl From<PriceRow> for PersistedRecord {
    fn from(row: PriceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            price_minor: row.price,
            date: row.create_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    #[tracing::instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    async fn commit(
        &self,
        mut candidates: Vec<CanonicalRecord>,
    ) -> Result<CommitOutcome, StoreError> {
        sort_by_identity(&mut candidates);

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;

        for chunk in candidates.chunks(INSERT_CHUNK_SIZE) {
            let mut product_ids = Vec::with_capacity(chunk.len());
            let mut dates = Vec::with_capacity(chunk.len());
            let mut names = Vec::with_capacity(chunk.len());
            let mut categories = Vec::with_capacity(chunk.len());
            let mut prices = Vec::with_capacity(chunk.len());
            for record in chunk {
                product_ids.push(record.external_id.clone());
                dates.push(record.date);
                names.push(record.name.clone());
                categories.push(record.category.clone());
                prices.push(record.price_minor);
            }

            let result = sqlx::query(INSERT_SQL)
                .bind(&product_ids)
                .bind(&dates)
                .bind(&names)
                .bind(&categories)
                .bind(&prices)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected() as usize;
        }

        // SUM(BIGINT) is NUMERIC; read it as text so large totals stay exact
        let (total_categories, total_price): (i64, String) =
            sqlx::query_as(STATS_SQL).fetch_one(&mut *tx).await?;
        let total_price_minor: i128 = total_price.parse().map_err(|_| {
            StoreError::Aborted(format!("price total {total_price} is out of range"))
        })?;

        tx.commit().await?;

        let outcome = CommitOutcome {
            inserted,
            duplicates: candidates.len() - inserted,
            total_categories,
            total_price_minor,
        };
        tracing::debug!(
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            "Unit of work committed"
        );
        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    async fn query(&self, filter: &PriceFilter) -> Result<Vec<PersistedRecord>, StoreError> {
        let rows: Vec<PriceRow> = sqlx::query_as(SELECT_SQL)
            .bind(filter.date_from())
            .bind(filter.date_to())
            .bind(filter.price_from())
            .bind(filter.price_to())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PersistedRecord::from).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

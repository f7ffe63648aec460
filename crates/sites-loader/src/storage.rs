//! Bulk insert of site rows
//!
//! All rows of a run are written inside one transaction. Rows are sent as
//! multi-row `INSERT` statements of at most `batch_size` rows each; a failure
//! in any chunk rolls back every chunk before it.

use crate::db::SITES_TABLE;
use crate::error::{LoaderError, Result};
use crate::normalize::{normalize, SiteRow, SITE_COLUMNS};
use crate::pipeline::Stage;
use sites_common::SiteRecord;
use sqlx::types::Json;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder, Transaction};
use tracing::{debug, error, info, warn};

/// Rows per INSERT statement
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Largest batch that stays under the 65535 bind parameters Postgres accepts
pub const MAX_BATCH_SIZE: usize = u16::MAX as usize / SITE_COLUMNS.len();

/// Outcome of a committed load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: u64,
    pub batches: usize,
}

/// Normalize every record and check that each row can be stored.
pub fn prepare_rows(records: Vec<SiteRecord>) -> Result<Vec<SiteRow>> {
    let rows: Vec<SiteRow> = records.into_iter().map(normalize).collect();

    for (index, row) in rows.iter().enumerate() {
        row.validate(index)
            .map_err(|cause| LoaderError::load(Stage::Normalized, cause))?;
    }

    debug!(rows = rows.len(), "Records normalized");
    Ok(rows)
}

/// Number of INSERT statements needed for `rows` rows
pub fn batch_count(rows: usize, batch_size: usize) -> usize {
    rows.div_ceil(batch_size)
}

pub struct SiteStorage {
    batch_size: usize,
}

impl Default for SiteStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteStorage {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Storage with a custom batch size, clamped to `1..=MAX_BATCH_SIZE`
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Normalize `records` and insert them all, or none of them.
    ///
    /// On success the transaction is committed and the inserted row count
    /// reported. On any failure the transaction is rolled back and the cause
    /// returned as [`LoaderError::Load`].
    pub async fn load_all(
        &self,
        conn: &mut PgConnection,
        records: Vec<SiteRecord>,
    ) -> Result<LoadReport> {
        let rows = prepare_rows(records)?;

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| LoaderError::load(Stage::Inserting, e))?;

        match self.insert_rows(&mut tx, &rows).await {
            Ok(inserted) => {
                tx.commit()
                    .await
                    .map_err(|e| LoaderError::load(Stage::Committed, e))?;

                let report = LoadReport {
                    inserted,
                    batches: batch_count(rows.len(), self.batch_size),
                };
                info!(inserted = report.inserted, batches = report.batches, "Load committed");
                Ok(report)
            },
            Err(e) => {
                error!(error = %e, "Insert failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback did not complete; the server discards the transaction");
                }
                Err(e)
            },
        }
    }

    async fn insert_rows(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[SiteRow],
    ) -> Result<u64> {
        let total_batches = batch_count(rows.len(), self.batch_size);
        let mut inserted = 0;

        for (batch_idx, chunk) in rows.chunks(self.batch_size).enumerate() {
            debug!(
                batch = batch_idx + 1,
                total = total_batches,
                rows = chunk.len(),
                "Inserting batch"
            );

            inserted += batch_insert(tx, chunk)
                .await
                .map_err(|e| LoaderError::load(Stage::Inserting, e))?;
        }

        Ok(inserted)
    }
}

async fn batch_insert(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[SiteRow],
) -> std::result::Result<u64, sqlx::Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        SITES_TABLE,
        SITE_COLUMNS.join(", ")
    ));

    query_builder.push_values(rows, |mut b, row| {
        b.push_bind(&row.url)
            .push_bind(&row.title)
            .push_bind(&row.site_type)
            .push_bind(&row.language)
            .push_bind(&row.country)
            .push_bind(Json(&row.platforms))
            .push_bind(&row.data_formats)
            .push_bind(&row.emails)
            .push_bind(&row.html_path)
            .push_bind(&row.md_path)
            .push_bind(&row.wayback_status)
            .push_bind(&row.notes);
    });

    let result = query_builder.build().execute(&mut **tx).await?;
    Ok(result.rows_affected())
}

//! Destination schema
//!
//! The `sites` table is created once and never altered. Re-running the
//! creation statement against an existing table is a no-op.

use crate::error::{LoaderError, Result};
use crate::pipeline::Stage;
use sqlx::{Connection, PgConnection};
use tracing::info;

pub const SITES_TABLE: &str = "sites";

pub const CREATE_SITES_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sites (
    id              SERIAL PRIMARY KEY,
    url             TEXT NOT NULL,
    title           TEXT,
    type            TEXT,
    language        TEXT,
    country         TEXT,
    platforms       JSONB,
    data_formats    TEXT[],
    emails          TEXT[],
    html_path       TEXT,
    md_path         TEXT,
    wayback_status  TEXT,
    notes           TEXT
)
"#;

/// Create the `sites` table if it does not exist yet, in its own transaction.
pub async fn ensure_schema(conn: &mut PgConnection) -> Result<()> {
    let fail = |e: sqlx::Error| LoaderError::load(Stage::SchemaEnsured, e);

    let mut tx = conn.begin().await.map_err(fail)?;
    sqlx::query(CREATE_SITES_TABLE_SQL)
        .execute(&mut *tx)
        .await
        .map_err(fail)?;
    tx.commit().await.map_err(fail)?;

    info!(table = SITES_TABLE, "Schema ensured");
    Ok(())
}

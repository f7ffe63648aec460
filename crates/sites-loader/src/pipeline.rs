//! Load pipeline orchestration
//!
//! A run moves through the following stages:
//!
//! ```text
//! Idle -> Connected -> SchemaEnsured -> Normalized -> Inserting -> Committed -> Closed
//!                                                               \-> RolledBack -> Closed
//! ```
//!
//! Records are read before connecting, so malformed input never opens a
//! connection. Once connected, the connection is closed on every exit path.

use crate::config::LoaderConfig;
use crate::db::{self, DbConfig};
use crate::error::{LoaderError, Result};
use crate::source::{RecordOrigin, SourceReader};
use crate::storage::{batch_count, prepare_rows, LoadReport, SiteStorage};
use sites_common::SiteRecord;
use sqlx::PgConnection;
use std::fmt;
use tracing::{debug, error, info, info_span, Instrument};

/// Lifecycle stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Connected,
    SchemaEnsured,
    Normalized,
    Inserting,
    Committed,
    RolledBack,
    Closed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Connected => "connect",
            Stage::SchemaEnsured => "ensure schema",
            Stage::Normalized => "normalize",
            Stage::Inserting => "insert",
            Stage::Committed => "commit",
            Stage::RolledBack => "rollback",
            Stage::Closed => "close",
        };
        f.write_str(name)
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub origin: RecordOrigin,
    pub rows: u64,
    pub batches: usize,
    pub dry_run: bool,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(
                f,
                "Dry run: {} records from {} would be inserted in {} batch(es)",
                self.rows, self.origin, self.batches
            )
        } else {
            write!(f, "Inserted {} records from {}", self.rows, self.origin)
        }
    }
}

/// Run the whole load described by `config`.
pub async fn run(config: &LoaderConfig) -> Result<RunReport> {
    let source = SourceReader::new(&config.input_path).read()?;
    let storage = SiteStorage::with_batch_size(config.batch_size);

    if config.dry_run {
        let rows = prepare_rows(source.records)?;
        let rows_len = rows.len();
        info!(rows = rows_len, origin = %source.origin, "Dry run, skipping database");
        return Ok(RunReport {
            origin: source.origin,
            rows: rows_len as u64,
            batches: batch_count(rows_len, storage.batch_size()),
            dry_run: true,
        });
    }

    let db_config = config
        .database
        .as_ref()
        .ok_or_else(|| LoaderError::config("DATABASE_URL not set"))?;

    let report = load(db_config, &storage, source.records)
        .instrument(info_span!("load", origin = %source.origin))
        .await?;

    Ok(RunReport {
        origin: source.origin,
        rows: report.inserted,
        batches: report.batches,
        dry_run: false,
    })
}

/// Connect, load `records`, and close the connection whatever the outcome.
pub async fn load(
    db_config: &DbConfig,
    storage: &SiteStorage,
    records: Vec<SiteRecord>,
) -> Result<LoadReport> {
    debug!(stage = %Stage::Idle, records = records.len(), "Starting load");

    let mut conn = db::connect(db_config).await?;
    debug!(stage = %Stage::Connected, "Connection open");

    let outcome = load_on(&mut conn, storage, records).await;

    db::close(conn).await;
    debug!(stage = %Stage::Closed, "Connection closed");

    outcome
}

/// Ensure the schema and load `records` over an already open connection.
pub async fn load_on(
    conn: &mut PgConnection,
    storage: &SiteStorage,
    records: Vec<SiteRecord>,
) -> Result<LoadReport> {
    let outcome = ensure_and_insert(conn, storage, records).await;

    match &outcome {
        Ok(report) => debug!(stage = %Stage::Committed, inserted = report.inserted, "Run committed"),
        Err(e) => error!(stage = %Stage::RolledBack, error = %e, "Run rolled back"),
    }

    outcome
}

async fn ensure_and_insert(
    conn: &mut PgConnection,
    storage: &SiteStorage,
    records: Vec<SiteRecord>,
) -> Result<LoadReport> {
    db::ensure_schema(conn).await?;
    debug!(stage = %Stage::SchemaEnsured, "Schema ready");
    storage.load_all(conn, records).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::source::DEFAULT_INPUT_FILE;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn dry_run_config(input_path: impl Into<std::path::PathBuf>) -> LoaderConfig {
        LoaderConfig {
            database: None,
            input_path: input_path.into(),
            batch_size: 10,
            dry_run: true,
        }
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::SchemaEnsured.to_string(), "ensure schema");
        assert_eq!(Stage::Inserting.to_string(), "insert");
        assert_eq!(Stage::RolledBack.to_string(), "rollback");
    }

    #[tokio::test]
    async fn test_dry_run_with_fallback() {
        let dir = TempDir::new().unwrap();
        let report = run(&dry_run_config(dir.path().join(DEFAULT_INPUT_FILE))).await.unwrap();

        assert_eq!(report.origin, RecordOrigin::Fallback);
        assert_eq!(report.rows, 26);
        assert_eq!(report.batches, 3);
        assert!(report.to_string().starts_with("Dry run: 26 records from built-in fallback data"));
    }

    #[tokio::test]
    async fn test_dry_run_surfaces_missing_url() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"url": "https://a.example/"}}, {{"title": "no url"}}]"#).unwrap();

        let err = run(&dry_run_config(file.path())).await.unwrap_err();
        assert!(matches!(err, LoaderError::Load { stage: Stage::Normalized, .. }));
    }

    #[tokio::test]
    async fn test_malformed_input_fails_before_connecting() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let config = LoaderConfig {
            database: Some(DbConfig::new("postgresql://loader:pw@127.0.0.1:1/sites")),
            dry_run: false,
            ..dry_run_config(file.path())
        };

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, LoaderError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn test_missing_database_url() {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig {
            dry_run: false,
            ..dry_run_config(dir.path().join(DEFAULT_INPUT_FILE))
        };

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_connection_error() {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig {
            database: Some(DbConfig::new("postgresql://loader:pw@127.0.0.1:1/sites")),
            dry_run: false,
            ..dry_run_config(dir.path().join(DEFAULT_INPUT_FILE))
        };

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, LoaderError::Connection(_)));
    }
}

//! Test utilities for sites loader integration tests using testcontainers
//!
//! Each test gets its own PostgreSQL container, so tests never share a
//! `sites` table.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestPostgres;
//!
//! #[tokio::test]
//! async fn test_with_postgres() {
//!     let pg = TestPostgres::start().await.unwrap();
//!     let mut conn = pg.connect().await.unwrap();
//!     sqlx::query("SELECT 1").execute(&mut conn).await.unwrap();
//! }
//! ```

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection};
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

/// PostgreSQL version used by the tests
pub const POSTGRES_TAG: &str = "16-alpine";

/// PostgreSQL test container wrapper
///
/// The container runs without TLS, so tests connect with [`TestPostgres::connect`]
/// rather than through the loader's TLS-enforcing `db::connect`.
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    connection_string: String,
}

impl TestPostgres {
    /// Start a new PostgreSQL container
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag(POSTGRES_TAG)
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
        debug!("PostgreSQL connection: {}", connection_string);

        Ok(Self {
            _container: container,
            connection_string,
        })
    }

    /// Open a plain (non-TLS) connection to the container
    pub async fn connect(&self) -> Result<PgConnection> {
        PgConnection::connect(&self.connection_string)
            .await
            .context("Failed to connect to PostgreSQL")
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Number of rows currently in `sites`
    pub async fn site_count(&self) -> Result<i64> {
        let mut conn = self.connect().await?;
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sites")
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(count)
    }
}

//! Sites Loader Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads harvested site records into the PostgreSQL `sites` table.
//!
//! # Pipeline
//!
//! - **Source**: records come from `db.json` beside the loader, or from the
//!   embedded fallback set when that file is absent
//! - **Schema**: `sites` is created if missing, never altered
//! - **Normalize**: each record becomes a fixed-column row; missing lists
//!   become empty containers
//! - **Insert**: rows go out in multi-row batches inside a single
//!   transaction, committed together or rolled back together
//!
//! # Example
//!
//! ```no_run
//! use sites_loader::{config::LoaderConfig, db::DbConfig, pipeline};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoaderConfig {
//!         database: Some(DbConfig::from_env()?),
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!     let report = pipeline::run(&config).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod source;
pub mod storage;

pub use error::{LoadCause, LoaderError, Result};
pub use normalize::{normalize, SiteRow};
pub use pipeline::{RunReport, Stage};
pub use source::{RecordOrigin, SourceData, SourceReader};
pub use storage::{LoadReport, SiteStorage};

//! Configuration management
//!
//! The binary fills [`LoaderConfig`] from its flags, which fall back to
//! `DATABASE_URL` (then `NEON_URL`), `SITES_INPUT` and `SITES_BATCH_SIZE`.

use crate::db::DbConfig;
use crate::error::{LoaderError, Result};
use crate::source::default_input_path;
use crate::storage::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
use std::path::PathBuf;

/// Loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Absent only for dry runs
    pub database: Option<DbConfig>,
    pub input_path: PathBuf,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl LoaderConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(LoaderError::config(format!(
                "batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }

        match &self.database {
            Some(db) if db.url.trim().is_empty() => {
                Err(LoaderError::config("database URL cannot be empty"))
            },
            Some(db) => db.connect_options().map(|_| ()),
            None if self.dry_run => Ok(()),
            None => Err(LoaderError::config(
                "DATABASE_URL not set. Provide --database-url or set DATABASE_URL.",
            )),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            database: None,
            input_path: default_input_path(),
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let config = LoaderConfig {
            database: Some(DbConfig::new("postgresql://loader:pw@db.example/sites")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = LoaderConfig {
            batch_size: 0,
            ..config
        };
        assert!(config.validate().is_err());

        let config = LoaderConfig {
            batch_size: MAX_BATCH_SIZE + 1,
            ..config
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_database_requirements() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_err());

        let config = LoaderConfig {
            dry_run: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = LoaderConfig {
            database: Some(DbConfig::new("  ")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

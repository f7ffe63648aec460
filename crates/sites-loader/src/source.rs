//! Source Reader
//!
//! Produces the ordered list of harvested records for a run. Records come
//! either from a JSON file beside the loader or, when that file is absent,
//! from the data set embedded in the binary. Both paths go through
//! [`parse_records`], so they behave identically downstream.

use crate::error::{LoaderError, Result};
use sites_common::SiteRecord;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name looked up next to the loader executable
pub const DEFAULT_INPUT_FILE: &str = "db.json";

/// Seed data set used when no input file is present
pub const FALLBACK_SITES_JSON: &str = include_str!("../data/fallback_sites.json");

/// Where the records of a run came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOrigin {
    File(PathBuf),
    Fallback,
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOrigin::File(path) => write!(f, "{}", path.display()),
            RecordOrigin::Fallback => write!(f, "built-in fallback data"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceData {
    pub origin: RecordOrigin,
    pub records: Vec<SiteRecord>,
}

/// `db.json` in the directory holding the running executable.
///
/// Falls back to a path relative to the working directory when the
/// executable location cannot be determined.
pub fn default_input_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_INPUT_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_FILE))
}

/// Parse a whole JSON document as an array of site records.
pub fn parse_records(json: &[u8], source_name: &str) -> Result<Vec<SiteRecord>> {
    serde_json::from_slice(json).map_err(|e| LoaderError::malformed(source_name, e))
}

/// The embedded seed records
pub fn fallback_records() -> Result<Vec<SiteRecord>> {
    parse_records(FALLBACK_SITES_JSON.as_bytes(), "built-in fallback data")
}

pub struct SourceReader {
    path: PathBuf,
}

impl SourceReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the input file, or the fallback set when the file is missing or unreadable.
    ///
    /// A file that exists but does not parse is an error, never a reason to
    /// fall back.
    pub fn read(&self) -> Result<SourceData> {
        if !self.path.is_file() {
            info!(path = %self.path.display(), "No input file, using built-in fallback data");
            return Self::fallback();
        }

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Input file unreadable, using built-in fallback data");
                return Self::fallback();
            },
        };

        let records = parse_records(&bytes, &self.path.display().to_string())?;
        info!(path = %self.path.display(), records = records.len(), "Read input file");

        Ok(SourceData {
            origin: RecordOrigin::File(self.path.clone()),
            records,
        })
    }

    fn fallback() -> Result<SourceData> {
        let records = fallback_records()?;
        info!(records = records.len(), "Loaded built-in fallback data");

        Ok(SourceData {
            origin: RecordOrigin::Fallback,
            records,
        })
    }
}

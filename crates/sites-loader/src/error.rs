//! Error types for the sites loader
//!
//! Each variant is fatal for the run. Variants carry the underlying cause so
//! the binary can print the whole chain.

use crate::pipeline::Stage;
use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug)]
pub enum LoaderError {
    /// Input document exists but is not a JSON array of objects
    #[error("Malformed input in {source_name}: {cause}")]
    MalformedInput {
        source_name: String,
        #[source]
        cause: serde_json::Error,
    },

    /// Store unreachable, credentials rejected, or TLS not available
    #[error("Could not connect to the database: {0}. Check DATABASE_URL, credentials and that the server accepts TLS.")]
    Connection(#[source] sqlx::Error),

    /// Schema creation, validation, insert or commit failed; nothing was committed
    #[error("Load failed during {stage}: {cause}")]
    Load {
        stage: Stage,
        #[source]
        cause: LoadCause,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// What went wrong inside a [`LoaderError::Load`]
#[derive(Error, Debug)]
pub enum LoadCause {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("record {index} has no url")]
    MissingUrl { index: usize },
}

impl LoaderError {
    pub fn malformed(source_name: impl Into<String>, cause: serde_json::Error) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            cause,
        }
    }

    pub fn load(stage: Stage, cause: impl Into<LoadCause>) -> Self {
        Self::Load {
            stage,
            cause: cause.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_message() {
        let err = LoaderError::load(Stage::Normalized, LoadCause::MissingUrl { index: 3 });
        assert_eq!(err.to_string(), "Load failed during normalize: record 3 has no url");
    }

    #[test]
    fn test_malformed_input_names_source() {
        let cause = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = LoaderError::malformed("db.json", cause);
        assert!(err.to_string().starts_with("Malformed input in db.json"));
    }

    #[test]
    fn test_database_cause_is_transparent() {
        let err = LoaderError::load(Stage::Inserting, sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("Load failed during insert: "));
        assert!(matches!(
            err,
            LoaderError::Load {
                cause: LoadCause::Database(sqlx::Error::RowNotFound),
                ..
            }
        ));
    }
}

//! Sites Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and logging for the sites loader workspace.
//!
//! # Overview
//!
//! - **Types**: the harvested [`SiteRecord`] and its [`Platform`] links, with
//!   deserialization that tolerates missing and mistyped fields
//! - **Logging**: centralized `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use sites_common::SiteRecord;
//!
//! fn parse(json: &str) -> serde_json::Result<Vec<SiteRecord>> {
//!     serde_json::from_str(json)
//! }
//! ```

pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{Platform, SiteRecord};

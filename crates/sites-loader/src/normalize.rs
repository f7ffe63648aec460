//! Record normalization
//!
//! Maps a [`SiteRecord`] onto the fixed column order of the `sites` table.
//! Normalization cannot fail: absent scalars become NULL and absent lists
//! become empty containers, so no row ever holds a NULL where a list is
//! expected.

use crate::error::LoadCause;
use sites_common::{Platform, SiteRecord};

/// Insert columns of the `sites` table, in bind order
pub const SITE_COLUMNS: [&str; 12] = [
    "url",
    "title",
    "type",
    "language",
    "country",
    "platforms",
    "data_formats",
    "emails",
    "html_path",
    "md_path",
    "wayback_status",
    "notes",
];

/// One destination row, ready to bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRow {
    pub url: Option<String>,
    pub title: Option<String>,
    pub site_type: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub platforms: Vec<Platform>,
    pub data_formats: Vec<String>,
    pub emails: Vec<String>,
    pub html_path: Option<String>,
    pub md_path: Option<String>,
    pub wayback_status: Option<String>,
    pub notes: Option<String>,
}

impl SiteRow {
    /// `url` is the only column the table refuses as NULL.
    pub fn validate(&self, index: usize) -> Result<(), LoadCause> {
        match self.url {
            Some(_) => Ok(()),
            None => Err(LoadCause::MissingUrl { index }),
        }
    }
}

impl From<SiteRecord> for SiteRow {
    fn from(record: SiteRecord) -> Self {
        Self {
            url: record.url,
            title: record.title,
            site_type: record.site_type,
            language: record.language,
            country: record.country,
            platforms: record.platforms.unwrap_or_default(),
            data_formats: record.data_formats.unwrap_or_default(),
            emails: record.emails.unwrap_or_default(),
            html_path: record.html_path,
            md_path: record.md_path,
            wayback_status: record.wayback_status,
            notes: record.notes,
        }
    }
}

pub fn normalize(record: SiteRecord) -> SiteRow {
    SiteRow::from(record)
}

//! Harvested site records
//!
//! A [`SiteRecord`] is one entry produced by the crawl: a website or channel,
//! its metadata, and the social platforms it links to. Harvest output is
//! hand-edited JSON, so deserialization is deliberately forgiving:
//!
//! - unknown keys are ignored
//! - missing keys and `null` become `None`
//! - numbers and booleans given for a text field are stringified
//! - arrays or objects given for a text field become `None`
//! - a list field holding something other than an array becomes `None`
//! - list items of the wrong type, and platform entries that are not
//!   `{name, url}` objects, are dropped
//! - NUL characters are stripped from every string, since PostgreSQL text
//!   cannot hold them
//!
//! Every coercion is reported with `tracing::warn!`. The only shape that
//! fails to deserialize is a record that is not a JSON object at all.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A named external social/media presence of a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub url: String,
}

impl Platform {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One harvested site entry.
///
/// List fields are `None` when the source did not provide a usable list;
/// turning that into an empty container is the loader's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteRecord {
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub site_type: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub platforms: Option<Vec<Platform>>,
    pub data_formats: Option<Vec<String>>,
    pub emails: Option<Vec<String>>,
    pub html_path: Option<String>,
    pub md_path: Option<String>,
    pub wayback_status: Option<String>,
    pub notes: Option<String>,
}

impl SiteRecord {
    /// Record with only the url set
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Build a record from the keys of a JSON object, coercing mistyped values.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let url = text_field(&mut fields, "url", None);
        let label = url.as_deref();

        Self {
            title: text_field(&mut fields, "title", label),
            site_type: text_field(&mut fields, "type", label),
            language: text_field(&mut fields, "language", label),
            country: text_field(&mut fields, "country", label),
            platforms: platforms_field(&mut fields, label),
            data_formats: string_list_field(&mut fields, "data_formats", label),
            emails: string_list_field(&mut fields, "emails", label),
            html_path: text_field(&mut fields, "html_path", label),
            md_path: text_field(&mut fields, "md_path", label),
            wayback_status: text_field(&mut fields, "wayback_status", label),
            notes: text_field(&mut fields, "notes", label),
            url,
        }
    }
}

impl<'de> Deserialize<'de> for SiteRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_fields(fields))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn strip_nul(s: String, record: Option<&str>, field: &str) -> String {
    if !s.contains('\0') {
        return s;
    }
    warn!(record = ?record, field, "Stripped NUL characters");
    s.replace('\0', "")
}

fn text_field(fields: &mut Map<String, Value>, key: &str, record: Option<&str>) -> Option<String> {
    match fields.remove(key)? {
        Value::Null => None,
        Value::String(s) => Some(strip_nul(s, record, key)),
        value @ (Value::Bool(_) | Value::Number(_)) => {
            warn!(record = ?record, field = key, found = kind(&value), "Stringified non-text value");
            Some(value.to_string())
        },
        value => {
            warn!(record = ?record, field = key, found = kind(&value), "Discarded non-scalar value for text field");
            None
        },
    }
}

fn string_list_field(
    fields: &mut Map<String, Value>,
    key: &str,
    record: Option<&str>,
) -> Option<Vec<String>> {
    let items = match fields.remove(key)? {
        Value::Null => return None,
        Value::Array(items) => items,
        value => {
            warn!(record = ?record, field = key, found = kind(&value), "Discarded non-array value for list field");
            return None;
        },
    };

    let mut strings = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => strings.push(strip_nul(s, record, key)),
            other => {
                warn!(record = ?record, field = key, found = kind(&other), "Dropped non-string list item");
            },
        }
    }
    Some(strings)
}

fn platforms_field(fields: &mut Map<String, Value>, record: Option<&str>) -> Option<Vec<Platform>> {
    let items = match fields.remove("platforms")? {
        Value::Null => return None,
        Value::Array(items) => items,
        value => {
            warn!(record = ?record, found = kind(&value), "Discarded non-array value for platforms");
            return None;
        },
    };

    let mut platforms = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<Platform>(item) {
            Ok(Platform { name, url }) => platforms.push(Platform {
                name: strip_nul(name, record, "platforms.name"),
                url: strip_nul(url, record, "platforms.url"),
            }),
            Err(e) => warn!(record = ?record, error = %e, "Dropped malformed platform entry"),
        }
    }
    Some(platforms)
}

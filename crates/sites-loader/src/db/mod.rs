//! Connection management
//!
//! A run uses exactly one dedicated connection. It is not pooled: the
//! pipeline owns it from [`connect`] until it is closed.

pub mod schema;

use crate::error::{LoaderError, Result};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use tracing::{debug, info};

pub use schema::{ensure_schema, CREATE_SITES_TABLE_SQL, SITES_TABLE};

#[derive(Clone)]
pub struct DbConfig {
    pub url: String,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Read the connection string from `DATABASE_URL`, falling back to `NEON_URL`.
    pub fn from_env() -> Result<Self> {
        std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("NEON_URL"))
            .map(Self::new)
            .map_err(|_| LoaderError::config("DATABASE_URL not set"))
    }

    /// Parse the connection string, enforcing encrypted transport.
    ///
    /// `verify-ca` and `verify-full` are kept as requested; any weaker mode is
    /// raised to `require`.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let options = PgConnectOptions::from_str(&self.url)
            .map_err(|e| LoaderError::config(format!("invalid connection string: {}", e)))?;

        Ok(match options.get_ssl_mode() {
            PgSslMode::Require | PgSslMode::VerifyCa | PgSslMode::VerifyFull => options,
            _ => options.ssl_mode(PgSslMode::Require),
        })
    }

    /// Connection string with passwords masked, safe for logs.
    ///
    /// Masks both `user:password@` credentials and `password=` query parameters.
    pub fn redacted_url(&self) -> String {
        let (base, query) = match self.url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.url.as_str(), None),
        };

        let mut redacted = redact_userinfo(base);
        if let Some(query) = query {
            let params: Vec<String> = query
                .split('&')
                .map(|param| match param.split_once('=') {
                    Some((key, _)) if key.eq_ignore_ascii_case("password") => format!("{}=***", key),
                    _ => param.to_string(),
                })
                .collect();
            redacted.push('?');
            redacted.push_str(&params.join("&"));
        }
        redacted
    }
}

fn redact_userinfo(base: &str) -> String {
    let Some(scheme_end) = base.find("://") else {
        return base.to_string();
    };
    let authority_start = scheme_end + 3;
    let authority_end = base[authority_start..]
        .find('/')
        .map_or(base.len(), |i| authority_start + i);
    let authority = &base[authority_start..authority_end];

    match authority.rfind('@') {
        Some(at) if authority[..at].contains(':') => {
            let user = authority[..at].split(':').next().unwrap_or_default();
            format!("{}{}:***{}", &base[..authority_start], user, &base[authority_start + at..])
        },
        _ => base.to_string(),
    }
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig").field("url", &self.redacted_url()).finish()
    }
}

/// Open the run's connection. Failure is fatal; there is no retry.
pub async fn connect(config: &DbConfig) -> Result<PgConnection> {
    connect_with(config.connect_options()?).await
}

/// Open a connection from already-resolved options.
///
/// Unreachable hosts, rejected credentials and failed TLS negotiation all
/// surface as [`LoaderError::Connection`].
pub async fn connect_with(options: PgConnectOptions) -> Result<PgConnection> {
    info!(
        host = options.get_host(),
        port = options.get_port(),
        database = options.get_database().unwrap_or_default(),
        "Connecting to database"
    );

    let mut conn = options.connect().await.map_err(LoaderError::Connection)?;

    let (database, schema): (String, Option<String>) =
        sqlx::query_as("SELECT current_database()::text, current_schema()::text")
            .fetch_one(&mut conn)
            .await
            .map_err(LoaderError::Connection)?;
    debug!(database = %database, schema = ?schema, "Connected");

    Ok(conn)
}

/// Close the connection, logging instead of failing when the goodbye is lost.
pub async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Connection did not close cleanly");
    }
}

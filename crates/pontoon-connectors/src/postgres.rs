//! PostgreSQL connectors
//!
//! The source streams `pg_dump` stdout; the destination feeds `psql`
//! stdin. Dumps are taken with `--clean --if-exists` so a full reapply
//! drops and recreates every object instead of appending, which is what
//! makes restore retries from chunk 0 safe.

use async_trait::async_trait;

use pontoon_core::Result;

use crate::process::{CommandSpec, SubprocessSink, SubprocessSource};
use crate::traits::{DestinationConnector, SourceConnector};
use crate::uri::DbUri;

const SCHEMES: &[&str] = &["postgres", "postgresql"];
const DEFAULT_PORT: u16 = 5432;

fn common_env(uri: &DbUri) -> Vec<(&'static str, String)> {
    match &uri.password {
        Some(password) => vec![("PGPASSWORD", password.clone())],
        None => vec![],
    }
}

fn dump_args(uri: &DbUri) -> Vec<String> {
    vec![
        "--clean".to_string(),
        "--if-exists".to_string(),
        "--no-owner".to_string(),
        "-h".to_string(),
        uri.host.clone(),
        "-p".to_string(),
        uri.port.to_string(),
        "-U".to_string(),
        uri.user.clone(),
        "-d".to_string(),
        uri.database.clone(),
    ]
}

fn apply_args(uri: &DbUri) -> Vec<String> {
    vec![
        "--quiet".to_string(),
        "--single-transaction".to_string(),
        "-v".to_string(),
        "ON_ERROR_STOP=1".to_string(),
        "-h".to_string(),
        uri.host.clone(),
        "-p".to_string(),
        uri.port.to_string(),
        "-U".to_string(),
        uri.user.clone(),
        "-d".to_string(),
        uri.database.clone(),
    ]
}

/// Dumps a PostgreSQL database via `pg_dump`.
pub struct PostgresSource {
    inner: SubprocessSource,
}

impl PostgresSource {
    /// Build a source from a `postgres://` connection URI.
    pub fn new(connection_uri: &str) -> Result<Self> {
        let uri = DbUri::parse(connection_uri, SCHEMES, DEFAULT_PORT)?;
        let spec = CommandSpec {
            program: "pg_dump",
            args: dump_args(&uri),
            env: common_env(&uri),
        };
        Ok(Self {
            inner: SubprocessSource::new(uri.endpoint(), spec),
        })
    }
}

#[async_trait]
impl SourceConnector for PostgresSource {
    async fn open(&mut self) -> Result<()> {
        self.inner.open().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf).await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }
}

/// Applies a dump to a PostgreSQL database via `psql`.
pub struct PostgresDestination {
    inner: SubprocessSink,
}

impl PostgresDestination {
    /// Build a destination from a `postgres://` connection URI.
    pub fn new(connection_uri: &str) -> Result<Self> {
        let uri = DbUri::parse(connection_uri, SCHEMES, DEFAULT_PORT)?;
        let spec = CommandSpec {
            program: "psql",
            args: apply_args(&uri),
            env: common_env(&uri),
        };
        Ok(Self {
            inner: SubprocessSink::new(uri.endpoint(), spec),
        })
    }
}

#[async_trait]
impl DestinationConnector for PostgresDestination {
    async fn open(&mut self) -> Result<()> {
        self.inner.open().await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write(buf).await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }
}

//! MySQL connectors
//!
//! The source streams `mysqldump` stdout; the destination feeds the
//! `mysql` client's stdin. `mysqldump` emits `DROP TABLE IF EXISTS`
//! ahead of each `CREATE TABLE` by default, which keeps a full reapply
//! safe.

use async_trait::async_trait;

use pontoon_core::Result;

use crate::process::{CommandSpec, SubprocessSink, SubprocessSource};
use crate::traits::{DestinationConnector, SourceConnector};
use crate::uri::DbUri;

const SCHEMES: &[&str] = &["mysql"];
const DEFAULT_PORT: u16 = 3306;

fn common_env(uri: &DbUri) -> Vec<(&'static str, String)> {
    match &uri.password {
        Some(password) => vec![("MYSQL_PWD", password.clone())],
        None => vec![],
    }
}

fn connection_args(uri: &DbUri) -> Vec<String> {
    vec![
        "-h".to_string(),
        uri.host.clone(),
        "-P".to_string(),
        uri.port.to_string(),
        "-u".to_string(),
        uri.user.clone(),
    ]
}

fn dump_args(uri: &DbUri) -> Vec<String> {
    let mut args = vec![
        "--single-transaction".to_string(),
        "--quick".to_string(),
        "--add-drop-table".to_string(),
    ];
    args.extend(connection_args(uri));
    args.push(uri.database.clone());
    args
}

fn apply_args(uri: &DbUri) -> Vec<String> {
    let mut args = connection_args(uri);
    args.push(uri.database.clone());
    args
}

/// Dumps a MySQL database via `mysqldump`.
pub struct MysqlSource {
    inner: SubprocessSource,
}

impl MysqlSource {
    /// Build a source from a `mysql://` connection URI.
    pub fn new(connection_uri: &str) -> Result<Self> {
        let uri = DbUri::parse(connection_uri, SCHEMES, DEFAULT_PORT)?;
        let spec = CommandSpec {
            program: "mysqldump",
            args: dump_args(&uri),
            env: common_env(&uri),
        };
        Ok(Self {
            inner: SubprocessSource::new(uri.endpoint(), spec),
        })
    }
}

#[async_trait]
impl SourceConnector for MysqlSource {
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

/// Applies a dump to a MySQL database via the `mysql` client.
pub struct MysqlDestination {
    inner: SubprocessSink,
}

impl MysqlDestination {
    /// Build a destination from a `mysql://` connection URI.
    pub fn new(connection_uri: &str) -> Result<Self> {
        let uri = DbUri::parse(connection_uri, SCHEMES, DEFAULT_PORT)?;
        let spec = CommandSpec {
            program: "mysql",
            args: apply_args(&uri),
            env: common_env(&uri),
        };
        Ok(Self {
            inner: SubprocessSink::new(uri.endpoint(), spec),
        })
    }
}

#[async_trait]
impl DestinationConnector for MysqlDestination {
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

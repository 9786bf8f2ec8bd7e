//! Database connectors
//!
//! Pluggable capability implementations the pipelines drive: a
//! [`SourceConnector`] produces one full logical dump as a lazy byte
//! stream, a [`DestinationConnector`] applies one. Concrete connectors
//! shell out to the database's own dump/restore tooling (`pg_dump` /
//! `psql`, `mysqldump` / `mysql`) and stream through the child's stdio,
//! so no dump is ever materialised on local disk.
//!
//! Configuration selects implementations by `type` string through the
//! [`ConnectorRegistry`].

mod mysql;
mod postgres;
mod process;
mod registry;
mod traits;
mod uri;

pub use mysql::{MysqlDestination, MysqlSource};
pub use postgres::{PostgresDestination, PostgresSource};
pub use registry::{ConnectorRegistry, DestinationFactory, SourceFactory};
pub use traits::{DestinationConnector, SourceConnector};
pub use uri::DbUri;

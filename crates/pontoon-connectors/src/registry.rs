//! Connector registry
//!
//! Maps a configuration `type` string to a constructor function, so
//! adding a connector is one `register_*` call rather than a new enum
//! arm threaded through the pipelines.

use std::collections::HashMap;

use pontoon_core::config::{DestinationEntry, SourceEntry};
use pontoon_core::{Error, Result};

use crate::mysql::{MysqlDestination, MysqlSource};
use crate::postgres::{PostgresDestination, PostgresSource};
use crate::traits::{DestinationConnector, SourceConnector};

/// Constructor for a source connector.
pub type SourceFactory = fn(&SourceEntry) -> Result<Box<dyn SourceConnector>>;

/// Constructor for a destination connector.
pub type DestinationFactory = fn(&DestinationEntry) -> Result<Box<dyn DestinationConnector>>;

/// Registry of connector constructors keyed by `type` name.
pub struct ConnectorRegistry {
    sources: HashMap<String, SourceFactory>,
    destinations: HashMap<String, DestinationFactory>,
}

impl ConnectorRegistry {
    /// An empty registry with no connectors.
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
            destinations: HashMap::new(),
        }
    }

    /// A registry with the built-in postgres and mysql connectors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.register_source("postgres", |entry| {
            Ok(Box::new(PostgresSource::new(&entry.connection_uri)?))
        });
        registry.register_destination("postgres", |entry| {
            Ok(Box::new(PostgresDestination::new(&entry.connection_uri)?))
        });

        registry.register_source("mysql", |entry| {
            Ok(Box::new(MysqlSource::new(&entry.connection_uri)?))
        });
        registry.register_destination("mysql", |entry| {
            Ok(Box::new(MysqlDestination::new(&entry.connection_uri)?))
        });

        registry
    }

    /// Register (or replace) a source constructor.
    pub fn register_source(&mut self, name: impl Into<String>, factory: SourceFactory) {
        self.sources.insert(name.into(), factory);
    }

    /// Register (or replace) a destination constructor.
    pub fn register_destination(&mut self, name: impl Into<String>, factory: DestinationFactory) {
        self.destinations.insert(name.into(), factory);
    }

    /// Build a fresh source connector for one dump run.
    ///
    /// Sources are non-restartable, so every run constructs a new one.
    pub fn source(&self, entry: &SourceEntry) -> Result<Box<dyn SourceConnector>> {
        let factory = self
            .sources
            .get(&entry.connector)
            .ok_or_else(|| Error::invalid_connector(entry.connector.as_str()))?;
        factory(entry)
    }

    /// Build a fresh destination connector for one restore run.
    pub fn destination(&self, entry: &DestinationEntry) -> Result<Box<dyn DestinationConnector>> {
        let factory = self
            .destinations
            .get(&entry.connector)
            .ok_or_else(|| Error::invalid_connector(entry.connector.as_str()))?;
        factory(entry)
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

//! Error types for pontoon-core

use thiserror::Error;

/// Result type alias using pontoon-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Pontoon
#[derive(Error, Debug)]
pub enum Error {
    /// Cannot open a source, destination, or bridge endpoint
    #[error("Connection failed for {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    /// The source stream died mid-read (distinct from clean end-of-stream)
    #[error("Source stream interrupted: {message}")]
    StreamInterrupted { message: String },

    /// Bridge write failure for a single object
    #[error("Upload failed for {key}: {message}")]
    Upload { key: String, message: String },

    /// Bridge read failure for a single object
    #[error("Download failed for {key}: {message}")]
    Download { key: String, message: String },

    /// Object missing from the bridge
    #[error("Object not found in bridge: {key}")]
    NotFound { key: String },

    /// Checksum mismatch detected on restore
    #[error("Checksum mismatch for chunk {seq}: expected {expected}, computed {computed}")]
    Integrity {
        seq: u64,
        expected: String,
        computed: String,
    },

    /// Structurally invalid manifest (gaps, duplicates, bad ordering)
    #[error("Manifest {id} is corrupt: {message}")]
    ManifestCorrupt { id: String, message: String },

    /// No eligible manifest exists for a restore job
    #[error("No complete manifest found for job: {job}")]
    NoManifest { job: String },

    /// The run was cancelled by a stop request
    #[error("Run cancelled")]
    Cancelled,

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration content
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown connector type in configuration
    #[error("Unknown connector type: {connector}. Valid types: postgres, mysql")]
    InvalidConnector { connector: String },

    /// Invalid cron schedule expression
    #[error("Invalid cron expression {expression:?}: {message}")]
    InvalidSchedule {
        expression: String,
        message: String,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a connection error
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a stream interrupted error
    pub fn stream_interrupted(message: impl Into<String>) -> Self {
        Self::StreamInterrupted {
            message: message.into(),
        }
    }

    /// Create an upload error
    pub fn upload(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upload {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a download error
    pub fn download(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an integrity error
    pub fn integrity(seq: u64, expected: impl Into<String>, computed: impl Into<String>) -> Self {
        Self::Integrity {
            seq,
            expected: expected.into(),
            computed: computed.into(),
        }
    }

    /// Create a manifest corrupt error
    pub fn manifest_corrupt(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ManifestCorrupt {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a no manifest error
    pub fn no_manifest(job: impl Into<String>) -> Self {
        Self::NoManifest { job: job.into() }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid connector error
    pub fn invalid_connector(connector: impl Into<String>) -> Self {
        Self::InvalidConnector {
            connector: connector.into(),
        }
    }

    /// Create an invalid schedule error
    pub fn invalid_schedule(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Whether this error represents a transient I/O condition worth
    /// retrying on a single chunk operation.
    ///
    /// Configuration and auth failures, integrity violations, and
    /// cancellation are never retried; only bridge I/O and raw IO
    /// failures qualify.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Upload { .. } | Self::Download { .. } | Self::Io(_)
        )
    }
}

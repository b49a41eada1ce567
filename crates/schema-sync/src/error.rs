//! Error types for the schema synchronization engine.

use thiserror::Error;

/// Exit code for configuration and dialect-selection errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for collection definitions the dialect cannot map.
pub const EXIT_DEFINITION_ERROR: u8 = 2;
/// Exit code for DDL operations the dialect cannot express.
pub const EXIT_UNSUPPORTED: u8 = 3;
/// Exit code for errors raised by the database driver.
pub const EXIT_DRIVER_ERROR: u8 = 4;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Error raised by an injected database driver.
///
/// Drivers convert their native error types into this one so the engine can
/// pass it through untouched. The original error is kept as the source.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct DriverError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    /// Create a driver error from a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a native driver error, keeping it as the source.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// The driver's error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for schema synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A property type has no dialect mapping and no registered custom type.
    #[error("Unknown type for property '{property}'")]
    UnknownPropertyType { collection: String, property: String },

    /// The target dialect cannot express the requested DDL operation.
    #[error("{dialect} does not support {operation}")]
    Unsupported {
        dialect: &'static str,
        operation: String,
    },

    /// Error surfaced by the driver's query execution, passed through verbatim.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// No adapter is registered for the driver's dialect string.
    #[error("Unknown dialect: '{0}'. Supported dialects: mysql, postgres, sqlite, redshift")]
    DialectNotFound(String),

    /// A property descriptor is malformed.
    #[error("Invalid property '{property}' on collection '{collection}': {message}")]
    InvalidProperty {
        collection: String,
        property: String,
        message: String,
    },

    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create an Unsupported error for a dialect operation.
    pub fn unsupported(dialect: &'static str, operation: impl Into<String>) -> Self {
        SyncError::Unsupported {
            dialect,
            operation: operation.into(),
        }
    }

    /// Create an UnknownPropertyType error.
    pub fn unknown_type(collection: impl Into<String>, property: impl Into<String>) -> Self {
        SyncError::UnknownPropertyType {
            collection: collection.into(),
            property: property.into(),
        }
    }

    /// Create an InvalidProperty error.
    pub fn invalid_property(
        collection: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SyncError::InvalidProperty {
            collection: collection.into(),
            property: property.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_)
            | SyncError::DialectNotFound(_)
            | SyncError::Yaml(_)
            | SyncError::Json(_) => EXIT_CONFIG_ERROR,
            SyncError::UnknownPropertyType { .. } | SyncError::InvalidProperty { .. } => {
                EXIT_DEFINITION_ERROR
            }
            SyncError::Unsupported { .. } => EXIT_UNSUPPORTED,
            SyncError::Driver(_) => EXIT_DRIVER_ERROR,
            SyncError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;

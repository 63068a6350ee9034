//! Error types for the introspection library.

use thiserror::Error;

/// Exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for connectivity and pool errors.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code for catalog query failures.
pub const EXIT_QUERY_ERROR: u8 = 3;
/// Exit code for schema mapping errors (unsupported types, unknown models).
pub const EXIT_SCHEMA_ERROR: u8 = 4;
/// Exit code for lifecycle misuse (reads after disposal, reads before prepare).
pub const EXIT_LIFECYCLE_ERROR: u8 = 5;
/// Exit code for IO errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for introspection operations.
#[derive(Error, Debug)]
pub enum IntrospectError {
    /// Missing or malformed connection configuration.
    #[error("Configuration error: {0}")]
    ConfigurationInvalid(String),

    /// Server address or user identity could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The connectivity check run during prepare failed.
    #[error("Connectivity check failed: {0}")]
    ConnectivityFailed(String),

    /// No pooled connection could be handed out.
    #[error("Connection unavailable: {message}\n  Context: {context}")]
    ConnectionUnavailable { message: String, context: String },

    /// A catalog metadata query failed.
    #[error("Catalog query failed ({context}): {message}")]
    QueryFailed { context: String, message: String },

    /// The column's vendor type has no canonical mapping.
    #[error("Unsupported data type {data_type} for {model}.{column}")]
    UnsupportedType {
        model: String,
        column: String,
        data_type: String,
    },

    /// A detail lookup ran before the model's columns or references were listed.
    #[error("Model {model} has no cached {detail}; list them before resolving")]
    ModelNotIntrospected { model: String, detail: &'static str },

    /// The model is not present in the catalog listing.
    #[error("Unknown model {0}")]
    UnknownModel(String),

    /// The property is not a column of the model.
    #[error("Unable to find column definition for {model}.{property}")]
    UnknownProperty { model: String, property: String },

    /// The reference is not a foreign key of the model.
    #[error("Unable to find reference {reference} on {model}")]
    UnknownReference { model: String, reference: String },

    /// The session was disposed.
    #[error("Session closed")]
    SessionClosed,

    /// A read was issued before the loader was prepared.
    #[error("Not connected: prepare must run before reading the catalog")]
    NotConnected,

    /// A single catalog row could not be decoded.
    #[error("Row decode error in {context}: {message}")]
    RowDecode { context: String, message: String },

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

impl IntrospectError {
    /// Create a ConnectionUnavailable error with context about where it occurred
    pub fn unavailable(message: impl ToString, context: impl Into<String>) -> Self {
        IntrospectError::ConnectionUnavailable {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a QueryFailed error
    pub fn query(context: impl Into<String>, message: impl ToString) -> Self {
        IntrospectError::QueryFailed {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a RowDecode error
    pub fn row(context: impl Into<String>, message: impl ToString) -> Self {
        IntrospectError::RowDecode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create an UnsupportedType error
    pub fn unsupported_type(
        model: impl Into<String>,
        column: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        IntrospectError::UnsupportedType {
            model: model.into(),
            column: column.into(),
            data_type: data_type.into(),
        }
    }

    /// Whether the caller may retry the operation that produced this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IntrospectError::ConnectivityFailed(_)
                | IntrospectError::ConnectionUnavailable { .. }
                | IntrospectError::QueryFailed { .. }
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            IntrospectError::ConfigurationInvalid(_)
            | IntrospectError::InvalidAddress(_)
            | IntrospectError::Yaml(_)
            | IntrospectError::Json(_) => EXIT_CONFIG_ERROR,
            IntrospectError::ConnectivityFailed(_)
            | IntrospectError::ConnectionUnavailable { .. } => EXIT_CONNECTION_ERROR,
            IntrospectError::QueryFailed { .. } | IntrospectError::RowDecode { .. } => {
                EXIT_QUERY_ERROR
            }
            IntrospectError::UnsupportedType { .. }
            | IntrospectError::UnknownModel(_)
            | IntrospectError::UnknownProperty { .. }
            | IntrospectError::UnknownReference { .. } => EXIT_SCHEMA_ERROR,
            IntrospectError::ModelNotIntrospected { .. }
            | IntrospectError::SessionClosed
            | IntrospectError::NotConnected => EXIT_LIFECYCLE_ERROR,
            IntrospectError::Io(_) => EXIT_IO_ERROR,
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

/// Result type alias for introspection operations.
pub type Result<T> = std::result::Result<T, IntrospectError>;

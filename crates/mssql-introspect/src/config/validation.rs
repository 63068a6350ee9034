//! Configuration validation.

use serde_json::Value;

use super::LoaderConfig;
use crate::error::{IntrospectError, Result};

/// Keys the host must supply as non-empty strings.
const REQUIRED_STRING_OPTIONS: [&str; 4] = ["server", "databaseName", "userName", "password"];

/// Check that every required option is present and is a non-empty string.
pub fn validate_options(options: &Value) -> Result<()> {
    let map = options.as_object().ok_or_else(|| {
        IntrospectError::ConfigurationInvalid("options must be an object".into())
    })?;

    for key in REQUIRED_STRING_OPTIONS {
        match map.get(key) {
            Some(Value::String(s)) if !s.is_empty() => {}
            _ => {
                return Err(IntrospectError::ConfigurationInvalid(format!(
                    "options.{} is required and should be a string",
                    key
                )));
            }
        }
    }

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &LoaderConfig) -> Result<()> {
    if config.server.is_empty() {
        return Err(IntrospectError::ConfigurationInvalid(
            "server is required".into(),
        ));
    }
    if config.database_name.is_empty() {
        return Err(IntrospectError::ConfigurationInvalid(
            "databaseName is required".into(),
        ));
    }
    if config.user_name.is_empty() {
        return Err(IntrospectError::ConfigurationInvalid(
            "userName is required".into(),
        ));
    }
    if config.password.is_empty() {
        return Err(IntrospectError::ConfigurationInvalid(
            "password is required".into(),
        ));
    }

    if config.pool.max_connections == 0 {
        return Err(IntrospectError::ConfigurationInvalid(
            "pool.maxConnections must be at least 1".into(),
        ));
    }
    if config.pool.min_connections > config.pool.max_connections {
        return Err(IntrospectError::ConfigurationInvalid(format!(
            "pool.minConnections ({}) cannot exceed pool.maxConnections ({})",
            config.pool.min_connections, config.pool.max_connections
        )));
    }
    if config.pool.acquire_timeout_secs == 0 {
        return Err(IntrospectError::ConfigurationInvalid(
            "pool.acquireTimeoutSecs must be at least 1".into(),
        ));
    }

    Ok(())
}

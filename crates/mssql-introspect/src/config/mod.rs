//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use serde_json::Value;

use crate::address::ConnectionParameters;
use crate::error::{IntrospectError, Result};

impl LoaderConfig {
    /// Build a configuration from the host's free-form options map.
    ///
    /// Required keys are checked before deserialization so that a missing or
    /// non-string value is reported by name.
    pub fn from_options(options: &Value) -> Result<Self> {
        validation::validate_options(options)?;
        let config: LoaderConfig = serde_json::from_value(options.clone())
            .map_err(|e| IntrospectError::ConfigurationInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let options: Value = serde_yaml::from_str(yaml)?;
        Self::from_options(&options)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Parse the server address and user identity.
    pub fn connection_parameters(&self) -> Result<ConnectionParameters> {
        ConnectionParameters::parse(&self.server, &self.user_name, &self.database_name)
    }
}

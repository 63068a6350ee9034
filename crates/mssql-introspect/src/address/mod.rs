//! Server address and user identity parsing.
//!
//! SQL Server addresses come in several shapes:
//!
//! - `host` (default port 1433)
//! - `host:port` / `host,port`
//! - `host\instance` (named instance resolved through SQL Browser)
//!
//! User identities are either `user` or `DOMAIN\user`.

use serde::Serialize;

use crate::error::{IntrospectError, Result};

/// Standard SQL Server TCP port.
pub const DEFAULT_MSSQL_PORT: u16 = 1433;

/// Delimiters that separate the host from its qualifier.
const ADDRESS_DELIMITERS: [char; 3] = [':', ',', '\\'];

/// Structured connection parameters derived from the raw address and identity.
///
/// At most one of `port` and `instance_name` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    pub domain: Option<String>,
    pub user_name: String,
    pub database_name: String,
}

impl ConnectionParameters {
    /// Parse a raw server address and user identity.
    ///
    /// When the address carries both a port and an instance name
    /// (`host:1234\instance`), only the first qualifier is honoured and the
    /// instance name is dropped.
    pub fn parse(address: &str, user_identity: &str, database_name: &str) -> Result<Self> {
        if address.is_empty() {
            return Err(IntrospectError::InvalidAddress(
                "server address is empty".into(),
            ));
        }
        if user_identity.is_empty() {
            return Err(IntrospectError::InvalidAddress(
                "user identity is empty".into(),
            ));
        }

        let mut parts = address.split(&ADDRESS_DELIMITERS[..]);
        let host = parts.next().unwrap_or_default().to_string();

        let (port, instance_name) = match parts.next() {
            // An empty qualifier (`db:`) counts as absent
            Some(qualifier) if !qualifier.is_empty() => match qualifier.parse::<u16>() {
                Ok(port) => (Some(port), None),
                Err(_) => (None, Some(qualifier.to_string())),
            },
            _ => (Some(DEFAULT_MSSQL_PORT), None),
        };

        let (domain, user_name) = parse_identity(user_identity);

        Ok(Self {
            host,
            port,
            instance_name,
            domain,
            user_name,
            database_name: database_name.to_string(),
        })
    }

    /// Login name as sent to the server (`DOMAIN\user` for NTLM logins).
    pub fn login_name(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}\\{}", domain, self.user_name),
            None => self.user_name.clone(),
        }
    }

    /// Human-readable target for log lines.
    pub fn display_target(&self) -> String {
        match (&self.port, &self.instance_name) {
            (_, Some(instance)) => format!("{}\\{}/{}", self.host, instance, self.database_name),
            (Some(port), None) => format!("{}:{}/{}", self.host, port, self.database_name),
            (None, None) => format!("{}/{}", self.host, self.database_name),
        }
    }
}

/// Split `DOMAIN\user` into its parts.
fn parse_identity(user_identity: &str) -> (Option<String>, String) {
    let parts: Vec<&str> = user_identity.split('\\').collect();
    if parts.len() > 1 {
        (Some(parts[0].to_string()), parts[1].to_string())
    } else {
        (None, parts[0].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(address: &str) -> ConnectionParameters {
        ConnectionParameters::parse(address, "testUser", "testDatabase").unwrap()
    }

    #[test]
    fn test_host_only_defaults_port() {
        let params = parse("localhost");
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, Some(1433));
        assert_eq!(params.instance_name, None);
        assert_eq!(params.database_name, "testDatabase");
    }

    #[test]
    fn test_colon_port() {
        let params = parse("db:1433");
        assert_eq!(params.host, "db");
        assert_eq!(params.port, Some(1433));
        assert_eq!(params.instance_name, None);
    }

    #[test]
    fn test_comma_port() {
        let params = parse("localhost,1234");
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, Some(1234));
        assert_eq!(params.instance_name, None);
    }

    #[test]
    fn test_named_instance() {
        let params = parse("db\\INST1");
        assert_eq!(params.host, "db");
        assert_eq!(params.port, None);
        assert_eq!(params.instance_name.as_deref(), Some("INST1"));
    }

    #[test]
    fn test_port_and_instance_drops_instance() {
        let params = parse("db:1433\\INST1");
        assert_eq!(params.host, "db");
        assert_eq!(params.port, Some(1433));
        assert_eq!(params.instance_name, None);
    }

    #[test]
    fn test_empty_qualifier_defaults_port() {
        for address in ["db:", "db,", "db\\"] {
            let params = parse(address);
            assert_eq!(params.host, "db");
            assert_eq!(params.port, Some(1433));
            assert_eq!(params.instance_name, None);
        }
        assert_eq!(parse("db:").display_target(), "db:1433/testDatabase");
    }

    #[test]
    fn test_domain_identity() {
        let params = ConnectionParameters::parse("db", "CORP\\alice", "sales").unwrap();
        assert_eq!(params.domain.as_deref(), Some("CORP"));
        assert_eq!(params.user_name, "alice");
        assert_eq!(params.login_name(), "CORP\\alice");
    }

    #[test]
    fn test_plain_identity() {
        let params = ConnectionParameters::parse("db", "alice", "sales").unwrap();
        assert_eq!(params.domain, None);
        assert_eq!(params.user_name, "alice");
        assert_eq!(params.login_name(), "alice");
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(matches!(
            ConnectionParameters::parse("", "alice", "sales"),
            Err(IntrospectError::InvalidAddress(_))
        ));
        assert!(matches!(
            ConnectionParameters::parse("db", "", "sales"),
            Err(IntrospectError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_display_target() {
        assert_eq!(parse("db,1500").display_target(), "db:1500/testDatabase");
        assert_eq!(parse("db\\SQLEXPRESS").display_target(), "db\\SQLEXPRESS/testDatabase");
    }
}

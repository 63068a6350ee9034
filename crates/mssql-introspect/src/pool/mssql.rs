//! bb8 connection manager for SQL Server via Tiberius.

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::address::ConnectionParameters;
use crate::config::LoaderConfig;
use crate::error::{IntrospectError, Result};

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
pub struct TiberiusConnectionManager {
    params: ConnectionParameters,
    password: String,
    encrypt: bool,
    trust_server_cert: bool,
    app_name: String,
}

impl TiberiusConnectionManager {
    /// Fails with `ConfigurationInvalid` for a domain login on a target
    /// without NTLM support.
    pub fn new(params: ConnectionParameters, config: &LoaderConfig) -> Result<Self> {
        if params.domain.is_some() && !cfg!(windows) {
            return Err(IntrospectError::ConfigurationInvalid(
                "domain logins require Windows authentication support".to_string(),
            ));
        }

        Ok(Self {
            params,
            password: config.password.clone(),
            encrypt: config.encrypt,
            trust_server_cert: config.trust_server_cert,
            app_name: config.app_name.clone(),
        })
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.params.host);
        if let Some(port) = self.params.port {
            config.port(port);
        }
        if let Some(instance) = &self.params.instance_name {
            config.instance_name(instance);
        }
        config.database(&self.params.database_name);
        config.application_name(&self.app_name);

        config.authentication(self.auth_method());

        if self.encrypt {
            if self.trust_server_cert {
                config.trust_cert();
            }
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }

        config
    }

    // Domain logins go through NTLM
    #[cfg(windows)]
    fn auth_method(&self) -> AuthMethod {
        match &self.params.domain {
            Some(_) => AuthMethod::windows(self.params.login_name(), &self.password),
            None => AuthMethod::sql_server(&self.params.user_name, &self.password),
        }
    }

    #[cfg(not(windows))]
    fn auth_method(&self) -> AuthMethod {
        AuthMethod::sql_server(&self.params.user_name, &self.password)
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();

        // Named instances resolve their port through SQL Browser
        let tcp = if self.params.instance_name.is_some() {
            TcpStream::connect_named(&config).await?
        } else {
            TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| tiberius::error::Error::Io {
                    kind: e.kind(),
                    message: e.to_string(),
                })?
        };

        tcp.set_nodelay(true).ok();

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

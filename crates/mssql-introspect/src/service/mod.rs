//! Introspection session lifecycle and the public read surface.
//!
//! A session moves through `Created -> Prepared -> Active -> Disposed`:
//!
//! - `prepare` validates configuration, opens the pool and checks connectivity
//! - the first read moves the session to `Active`
//! - `finalize` drains the pool and clears the cache; the session cannot be reused
//!
//! Detail lookups (`resolve_property_type`, `resolve_reference`) only read the
//! cache. The matching listing call must run first, so every catalog query is
//! issued by an explicit listing call.

mod types;

pub use types::*;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::SchemaCache;
use crate::catalog::{CatalogReader, Connector, MssqlConnector, TableRecord};
use crate::config::LoaderConfig;
use crate::error::{IntrospectError, Result};
use crate::sink::SharedSink;
use crate::typemap::{map_column, CanonicalPropertyType};

/// Schema loader contract consumed by the host framework.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Validate the host's options and open the session.
    async fn prepare(&self, options: &Value) -> Result<()>;

    /// Model names in catalog order. A table name found in more than one
    /// schema is returned once per schema as `schema.table`.
    async fn list_model_names(&self) -> Result<Vec<String>>;

    /// Property names of a model in column order.
    async fn list_property_names(&self, model: &str) -> Result<Vec<String>>;

    async fn resolve_property_type(
        &self,
        model: &str,
        property: &str,
    ) -> Result<CanonicalPropertyType>;

    /// Foreign key names of a model.
    async fn list_reference_names(&self, model: &str) -> Result<Vec<String>>;

    async fn resolve_reference(&self, model: &str, reference: &str) -> Result<ModelReference>;

    async fn model_metadata(&self, model: &str) -> Result<ModelMetadata>;

    /// Release all resources. Safe to call more than once.
    async fn finalize(&self) -> Result<()>;
}

struct Session<R> {
    reader: R,
    cache: SchemaCache,
}

enum SessionState<R> {
    Created,
    Prepared(Arc<Session<R>>),
    Active(Arc<Session<R>>),
    Disposed,
}

impl<R> SessionState<R> {
    fn session(&self) -> Result<Arc<Session<R>>> {
        match self {
            SessionState::Prepared(session) | SessionState::Active(session) => {
                Ok(Arc::clone(session))
            }
            SessionState::Created => Err(IntrospectError::NotConnected),
            SessionState::Disposed => Err(IntrospectError::SessionClosed),
        }
    }

    fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Created => SessionPhase::Created,
            SessionState::Prepared(_) => SessionPhase::Prepared,
            SessionState::Active(_) => SessionPhase::Active,
            SessionState::Disposed => SessionPhase::Disposed,
        }
    }
}

/// Schema introspection over one database session.
pub struct IntrospectionService<C: Connector> {
    connector: C,
    sink: SharedSink,
    state: RwLock<SessionState<C::Reader>>,
}

impl IntrospectionService<MssqlConnector> {
    /// Service backed by SQL Server.
    pub fn mssql(sink: SharedSink) -> Self {
        Self::new(MssqlConnector, sink)
    }
}

impl<C: Connector> IntrospectionService<C> {
    pub fn new(connector: C, sink: SharedSink) -> Self {
        Self {
            connector,
            sink,
            state: RwLock::new(SessionState::Created),
        }
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase()
    }

    /// Open the session from a parsed configuration.
    pub async fn prepare_with(&self, config: &LoaderConfig) -> Result<()> {
        let mut state = self.state.write().await;
        match &*state {
            SessionState::Created => {}
            SessionState::Prepared(_) | SessionState::Active(_) => {
                return Err(IntrospectError::ConfigurationInvalid(
                    "loader is already prepared".into(),
                ))
            }
            SessionState::Disposed => return Err(IntrospectError::SessionClosed),
        }

        config.validate()?;
        let target = config.connection_parameters()?.display_target();

        let reader = self
            .connector
            .connect(config, Arc::clone(&self.sink))
            .await?;

        if let Err(e) = reader.check_connectivity().await {
            reader.close().await;
            self.sink.error("Unable to connect to", &target);
            return Err(IntrospectError::ConnectivityFailed(format!(
                "{}: {}",
                target, e
            )));
        }

        info!("Prepared introspection session for {}", target);
        self.sink.log(&format!("Connected to {}", target));
        *state = SessionState::Prepared(Arc::new(Session {
            reader,
            cache: SchemaCache::new(),
        }));
        Ok(())
    }

    /// Get the live session, marking it active.
    async fn session(&self) -> Result<Arc<Session<C::Reader>>> {
        {
            let state = self.state.read().await;
            if let SessionState::Active(session) = &*state {
                return Ok(Arc::clone(session));
            }
        }

        let mut state = self.state.write().await;
        let session = state.session()?;
        if matches!(*state, SessionState::Prepared(_)) {
            debug!("Introspection session active");
            *state = SessionState::Active(Arc::clone(&session));
        }
        Ok(session)
    }

    /// Look up a model that a prior `list_model_names` cached.
    fn cached_table(session: &Session<C::Reader>, model: &str) -> Result<TableRecord> {
        match session.cache.get(model) {
            Some(table) => Ok(table),
            None if session.cache.is_empty() => Err(IntrospectError::ModelNotIntrospected {
                model: model.to_string(),
                detail: "table listing",
            }),
            None => Err(IntrospectError::UnknownModel(model.to_string())),
        }
    }

    /// Introspect every model and return the full schema.
    ///
    /// Columns with unsupported types are reported to the sink and listed
    /// separately instead of failing the snapshot.
    pub async fn snapshot(&self) -> Result<SchemaSnapshot> {
        let names = self.list_model_names().await?;
        let mut models = Vec::with_capacity(names.len());

        for name in names {
            let mut properties = IndexMap::new();
            let mut unsupported_properties = Vec::new();

            for property in self.list_property_names(&name).await? {
                match self.resolve_property_type(&name, &property).await {
                    Ok(property_type) => {
                        properties.insert(property, property_type);
                    }
                    Err(IntrospectError::UnsupportedType {
                        column, data_type, ..
                    }) => {
                        warn!("Skipping {}.{}: unsupported type {}", name, column, data_type);
                        self.sink.error(
                            "Unsupported data type:",
                            &format!("{} for {}.{}", data_type, name, column),
                        );
                        unsupported_properties.push(UnsupportedProperty {
                            name: column,
                            data_type,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }

            let mut references = IndexMap::new();
            for reference in self.list_reference_names(&name).await? {
                let resolved = self.resolve_reference(&name, &reference).await?;
                references.insert(reference, resolved);
            }

            let metadata = self.model_metadata(&name).await?;
            models.push(ModelSnapshot {
                name,
                properties,
                unsupported_properties,
                references,
                metadata,
            });
        }

        info!("Introspected {} models", models.len());
        Ok(SchemaSnapshot { models })
    }
}

#[async_trait]
impl<C: Connector> Loader for IntrospectionService<C> {
    async fn prepare(&self, options: &Value) -> Result<()> {
        let config = LoaderConfig::from_options(options)?;
        self.prepare_with(&config).await
    }

    async fn list_model_names(&self) -> Result<Vec<String>> {
        let session = self.session().await?;
        let tables = session.reader.list_tables().await?;

        // Tables sharing a name across schemas are told apart by schema
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for table in &tables {
            *seen.entry(table.name.as_str()).or_default() += 1;
        }
        let names: Vec<String> = tables
            .iter()
            .map(|t| match seen.get(t.name.as_str()) {
                Some(&count) if count > 1 => t.full_name(),
                _ => t.name.clone(),
            })
            .collect();

        for (name, table) in names.iter().zip(tables) {
            session.cache.put(name.clone(), table);
        }
        Ok(names)
    }

    async fn list_property_names(&self, model: &str) -> Result<Vec<String>> {
        let session = self.session().await?;
        let table = Self::cached_table(&session, model)?;

        let columns = session.reader.list_columns(&table).await?;
        let names = columns.iter().map(|c| c.name.clone()).collect();

        // Cleared by a concurrent finalize
        if !session.cache.update_columns(model, columns) {
            return Err(IntrospectError::SessionClosed);
        }
        Ok(names)
    }

    async fn resolve_property_type(
        &self,
        model: &str,
        property: &str,
    ) -> Result<CanonicalPropertyType> {
        let session = self.session().await?;
        let table = Self::cached_table(&session, model)?;

        if table.columns.is_none() {
            return Err(IntrospectError::ModelNotIntrospected {
                model: model.to_string(),
                detail: "columns",
            });
        }
        let column = table
            .column(property)
            .ok_or_else(|| IntrospectError::UnknownProperty {
                model: model.to_string(),
                property: property.to_string(),
            })?;

        map_column(model, column)
    }

    async fn list_reference_names(&self, model: &str) -> Result<Vec<String>> {
        let session = self.session().await?;
        let table = Self::cached_table(&session, model)?;

        let references = session.reader.list_references(&table).await?;
        let names = references.keys().cloned().collect();

        if !session.cache.update_references(model, references) {
            return Err(IntrospectError::SessionClosed);
        }
        Ok(names)
    }

    async fn resolve_reference(&self, model: &str, reference: &str) -> Result<ModelReference> {
        let session = self.session().await?;
        let table = Self::cached_table(&session, model)?;

        let references = table
            .references
            .as_ref()
            .ok_or_else(|| IntrospectError::ModelNotIntrospected {
                model: model.to_string(),
                detail: "references",
            })?;
        references
            .get(reference)
            .map(ModelReference::from)
            .ok_or_else(|| IntrospectError::UnknownReference {
                model: model.to_string(),
                reference: reference.to_string(),
            })
    }

    async fn model_metadata(&self, model: &str) -> Result<ModelMetadata> {
        let session = self.session().await?;
        let table = Self::cached_table(&session, model)?;
        Ok(ModelMetadata::from(&table))
    }

    async fn finalize(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let previous = std::mem::replace(&mut *state, SessionState::Disposed);

        match previous {
            SessionState::Prepared(session) | SessionState::Active(session) => {
                session.reader.close().await;
                session.cache.clear();
                info!("Introspection session finalized");
            }
            SessionState::Created => debug!("Finalizing a session that was never prepared"),
            SessionState::Disposed => debug!("Session already finalized"),
        }
        Ok(())
    }
}

//! # mssql-introspect
//!
//! Schema introspection for Microsoft SQL Server.
//!
//! This library reads a database's catalog and turns it into a vendor-neutral
//! schema model:
//!
//! - **Address parsing** for `host`, `host:port`, `host,port` and `host\instance`
//! - **Pooled catalog reads** over Tiberius connections managed by bb8
//! - **Type mapping** of SQL Server column definitions to canonical property types
//! - **Composite foreign keys** grouped into single references
//! - **Session lifecycle** with a per-session schema cache
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mssql_introspect::{IntrospectionService, Loader, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> mssql_introspect::Result<()> {
//!     let service = IntrospectionService::mssql(Arc::new(TracingSink));
//!     service
//!         .prepare(&serde_json::json!({
//!             "server": "localhost,1433",
//!             "databaseName": "sales",
//!             "userName": "sa",
//!             "password": "secret",
//!         }))
//!         .await?;
//!
//!     let snapshot = service.snapshot().await?;
//!     println!("Introspected {} models", snapshot.models.len());
//!     service.finalize().await
//! }
//! ```

pub mod address;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pool;
pub mod service;
pub mod sink;
pub mod typemap;

// Re-exports for convenient access
pub use address::ConnectionParameters;
pub use cache::SchemaCache;
pub use catalog::{
    CatalogReader, ColumnRecord, Connector, MssqlConnector, ReferenceRecord, TableRecord,
};
pub use config::{LoaderConfig, PoolConfig};
pub use error::{IntrospectError, Result};
pub use pool::ConnectionPool;
pub use service::{
    IntrospectionService, Loader, ModelMetadata, ModelReference, SchemaSnapshot, SessionPhase,
};
pub use sink::{LogSink, MemorySink, SharedSink, TracingSink};
pub use typemap::{map_column, parse_default, CanonicalPropertyType, PropertyKind, TypeFamily};

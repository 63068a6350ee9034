//! Catalog metadata readers.
//!
//! - [`CatalogReader`]: read-only metadata queries (tables, columns, foreign keys)
//! - [`Connector`]: builds a reader from loader configuration
//! - [`MssqlCatalogReader`]: SQL Server implementation over a bb8 pool
//! - `MemoryCatalog`: in-memory implementation with failure injection, test builds only
//!
//! Every reader call runs exactly one query on one pooled connection.

#[cfg(test)]
mod memory;
mod mssql;
mod types;

#[cfg(test)]
pub use memory::{MemoryCatalog, MemoryConnector};
pub use mssql::{MssqlCatalogReader, MssqlConnector};
pub use types::*;

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::warn;

use crate::config::LoaderConfig;
use crate::error::Result;
use crate::sink::{LogSink, SharedSink};

/// Read catalog metadata from a database.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Acquire and immediately release a connection.
    async fn check_connectivity(&self) -> Result<()>;

    /// List user tables ordered by name.
    async fn list_tables(&self) -> Result<Vec<TableRecord>>;

    /// List the columns of a table.
    async fn list_columns(&self, table: &TableRecord) -> Result<Vec<ColumnRecord>>;

    /// List the raw foreign key rows of a table, one row per column pair.
    async fn list_foreign_keys(&self, table: &TableRecord) -> Result<Vec<ForeignKeyRow>>;

    /// List foreign keys grouped into references.
    async fn list_references(
        &self,
        table: &TableRecord,
    ) -> Result<IndexMap<String, ReferenceRecord>> {
        let rows = self.list_foreign_keys(table).await?;
        Ok(group_foreign_keys(rows))
    }

    /// Release all connections. Later calls fail with `SessionClosed`.
    async fn close(&self);
}

/// Build a [`CatalogReader`] from configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    type Reader: CatalogReader + 'static;

    /// Open the reader. Does not verify connectivity.
    async fn connect(&self, config: &LoaderConfig, sink: SharedSink) -> Result<Self::Reader>;
}

/// Decode rows, logging and skipping the ones that fail.
pub(crate) fn decode_rows<R, T, F>(
    rows: impl IntoIterator<Item = R>,
    context: &str,
    sink: &dyn LogSink,
    mut decode: F,
) -> Vec<T>
where
    F: FnMut(&R) -> Result<T>,
{
    let mut decoded = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        match decode(&row) {
            Ok(value) => decoded.push(value),
            Err(e) => {
                warn!("Skipping {} row {}: {}", context, idx, e);
                sink.error(&format!("Skipping {} row {}", context, idx), &e.to_string());
            }
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntrospectError;
    use crate::sink::MemorySink;

    #[test]
    fn test_decode_rows_skips_bad_rows() {
        let sink = MemorySink::new();
        let rows = vec!["1", "x", "3"];

        let decoded = decode_rows(rows, "columns", &sink, |raw| {
            raw.parse::<i32>()
                .map_err(|e| IntrospectError::row("max_length", e))
        });

        assert_eq!(decoded, vec![1, 3]);
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "Skipping columns row 1");
        assert!(errors[0].1.contains("max_length"));
    }
}

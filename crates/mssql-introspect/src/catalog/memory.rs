//! In-memory catalog.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::{CatalogReader, ColumnRecord, Connector, ForeignKeyRow, TableRecord};
use crate::config::LoaderConfig;
use crate::error::{IntrospectError, Result};
use crate::sink::SharedSink;

#[derive(Debug, Clone)]
struct MemoryTable {
    record: TableRecord,
    columns: Vec<ColumnRecord>,
    foreign_keys: Vec<ForeignKeyRow>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: RwLock<Vec<MemoryTable>>,
    latency: RwLock<Duration>,
    queries: AtomicUsize,
    unreachable: AtomicBool,
    failing: AtomicBool,
    closed: AtomicBool,
}

/// Catalog held in memory.
///
/// Clones share state, so a test can keep a handle after giving one to a
/// [`MemoryConnector`] and still add tables, inject failures and count queries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `dbo` table. Object ids are assigned in insertion order.
    pub fn with_table(
        self,
        name: &str,
        columns: Vec<ColumnRecord>,
        foreign_keys: Vec<ForeignKeyRow>,
    ) -> Self {
        self.with_schema_table("dbo", name, columns, foreign_keys)
    }

    pub fn with_schema_table(
        self,
        schema: &str,
        name: &str,
        columns: Vec<ColumnRecord>,
        foreign_keys: Vec<ForeignKeyRow>,
    ) -> Self {
        {
            let mut tables = self.write_tables();
            let object_id = tables.len() as i32 + 1;
            tables.push(MemoryTable {
                record: TableRecord::new(object_id, name, schema),
                columns,
                foreign_keys,
            });
        }
        self
    }

    /// Append a column to an existing table.
    pub fn add_column(&self, table: &str, column: ColumnRecord) {
        let mut tables = self.write_tables();
        if let Some(entry) = tables.iter_mut().find(|t| t.record.name == table) {
            entry.columns.push(column);
        }
    }

    /// Make every call fail as if no connection could be opened.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make every query fail after a connection was acquired.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay applied to every call.
    pub fn set_latency(&self, latency: Duration) {
        *self
            .inner
            .latency
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = latency;
    }

    /// Number of metadata queries served so far.
    pub fn query_count(&self) -> usize {
        self.inner.queries.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn write_tables(&self) -> std::sync::RwLockWriteGuard<'_, Vec<MemoryTable>> {
        self.inner
            .tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_tables(&self) -> Vec<MemoryTable> {
        self.inner
            .tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Simulate acquiring a connection.
    async fn acquire(&self) -> Result<()> {
        if self.is_closed() {
            return Err(IntrospectError::SessionClosed);
        }

        let latency = *self
            .inner
            .latency
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(IntrospectError::unavailable(
                "connection refused",
                "acquiring pooled connection",
            ));
        }
        Ok(())
    }

    /// Simulate running one query.
    async fn query(&self, context: &str) -> Result<Vec<MemoryTable>> {
        self.acquire().await?;
        self.inner.queries.fetch_add(1, Ordering::SeqCst);
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(IntrospectError::query(context, "simulated failure"));
        }
        Ok(self.read_tables())
    }
}

fn find(tables: Vec<MemoryTable>, object_id: i32) -> Option<MemoryTable> {
    tables.into_iter().find(|t| t.record.object_id == object_id)
}

#[async_trait]
impl CatalogReader for MemoryCatalog {
    async fn check_connectivity(&self) -> Result<()> {
        self.acquire().await
    }

    async fn list_tables(&self) -> Result<Vec<TableRecord>> {
        let mut tables: Vec<TableRecord> = self
            .query("tables")
            .await?
            .into_iter()
            .map(|t| t.record)
            .collect();
        tables.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.schema_name.cmp(&b.schema_name))
        });
        Ok(tables)
    }

    async fn list_columns(&self, table: &TableRecord) -> Result<Vec<ColumnRecord>> {
        let tables = self.query("columns").await?;
        Ok(find(tables, table.object_id)
            .map(|t| t.columns)
            .unwrap_or_default())
    }

    async fn list_foreign_keys(&self, table: &TableRecord) -> Result<Vec<ForeignKeyRow>> {
        let tables = self.query("foreign keys").await?;
        Ok(find(tables, table.object_id)
            .map(|t| t.foreign_keys)
            .unwrap_or_default())
    }

    async fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out a shared [`MemoryCatalog`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    catalog: MemoryCatalog,
}

impl MemoryConnector {
    pub fn new(catalog: MemoryCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Reader = MemoryCatalog;

    async fn connect(&self, config: &LoaderConfig, _sink: SharedSink) -> Result<MemoryCatalog> {
        config.connection_parameters()?;
        // A new session gets a fresh pool
        self.catalog.inner.closed.store(false, Ordering::SeqCst);
        Ok(self.catalog.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(name: &str, local: &str, table: &str, target: &str) -> ForeignKeyRow {
        ForeignKeyRow {
            constraint_name: name.to_string(),
            local_column: local.to_string(),
            ref_table: table.to_string(),
            ref_column: target.to_string(),
        }
    }

    #[tokio::test]
    async fn test_tables_sorted_by_name() {
        let catalog = MemoryCatalog::new()
            .with_table("b", vec![], vec![])
            .with_table("B", vec![], vec![])
            .with_table("a", vec![], vec![]);

        let names: Vec<String> = catalog
            .list_tables()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["B", "a", "b"]);
        assert_eq!(catalog.query_count(), 1);
    }

    #[tokio::test]
    async fn test_references_grouped_by_default_method() {
        let catalog = MemoryCatalog::new().with_table(
            "OrderLines",
            vec![ColumnRecord::new("OrderId", "int")],
            vec![
                fk("FK_Order", "OrderId", "Orders", "Id"),
                fk("FK_Order", "Region", "Orders", "Region"),
            ],
        );
        let table = catalog.list_tables().await.unwrap().remove(0);

        let refs = catalog.list_references(&table).await.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs["FK_Order"].columns.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection_and_close() {
        let catalog = MemoryCatalog::new().with_table("t", vec![], vec![]);

        catalog.set_unreachable(true);
        let err = catalog.check_connectivity().await.unwrap_err();
        assert!(matches!(err, IntrospectError::ConnectionUnavailable { .. }));

        catalog.set_unreachable(false);
        catalog.set_failing(true);
        let err = catalog.list_tables().await.unwrap_err();
        assert!(matches!(err, IntrospectError::QueryFailed { .. }));

        catalog.close().await;
        assert!(catalog.is_closed());
        assert!(matches!(
            catalog.list_tables().await,
            Err(IntrospectError::SessionClosed)
        ));
    }
}

//! Session-scoped schema cache.
//!
//! Maps model name to its [`TableRecord`]. Entries are added when tables are
//! listed and enriched in place as columns and references are fetched. There
//! is no eviction and no TTL; the cache lives exactly as long as its session.
//!
//! The model name is the bare table name. When several schemas hold a table
//! of the same name, the service keys each of them by `schema.table` instead,
//! so no entry overwrites another.
//!
//! Writers to different models never contend (DashMap shards by key). Two
//! writers updating the same model race and the last write wins. Catalog data
//! is stable within a session, so both writers store the same content.

use dashmap::DashMap;
use indexmap::IndexMap;

use crate::catalog::{ColumnRecord, ReferenceRecord, TableRecord};

/// Per-session store of table records.
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: DashMap<String, TableRecord>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of a cached record.
    pub fn get(&self, model: &str) -> Option<TableRecord> {
        self.tables.get(model).map(|entry| entry.value().clone())
    }

    /// Insert or overwrite a record under a model name.
    pub fn put(&self, model: impl Into<String>, table: TableRecord) {
        self.tables.insert(model.into(), table);
    }

    /// Store a model's columns. Returns `false` when the model is not cached.
    pub fn update_columns(&self, model: &str, columns: Vec<ColumnRecord>) -> bool {
        match self.tables.get_mut(model) {
            Some(mut entry) => {
                entry.columns = Some(columns);
                true
            }
            None => false,
        }
    }

    /// Store a model's references. Returns `false` when the model is not cached.
    pub fn update_references(
        &self,
        model: &str,
        references: IndexMap<String, ReferenceRecord>,
    ) -> bool {
        match self.tables.get_mut(model) {
            Some(mut entry) => {
                entry.references = Some(references);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, model: &str) -> bool {
        self.tables.contains_key(model)
    }

    /// Cached model names, sorted.
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn clear(&self) {
        self.tables.clear();
    }
}

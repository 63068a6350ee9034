//! Types produced by the introspection service.

use indexmap::IndexMap;
use serde::Serialize;

use crate::catalog::{ColumnPair, ReferenceRecord, TableRecord};
use crate::typemap::CanonicalPropertyType;

/// Lifecycle phase of an introspection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Created,
    Prepared,
    Active,
    Disposed,
}

/// Target model and column mapping of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReference {
    pub target_model: String,
    pub columns: Vec<ColumnPair>,
}

impl ModelReference {
    /// Local property names joined with commas, e.g. `OrderId,Region`.
    pub fn local_property(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.local_column.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<&ReferenceRecord> for ModelReference {
    fn from(reference: &ReferenceRecord) -> Self {
        Self {
            target_model: reference.ref_table.clone(),
            columns: reference.columns.clone(),
        }
    }
}

/// Raw SQL facts about a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub sql_data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_default: Option<String>,
}

/// Free-form metadata about a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub schema_name: String,
    pub table_name: String,
    /// Present once the model's columns were listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, ColumnMetadata>>,
}

impl From<&TableRecord> for ModelMetadata {
    fn from(table: &TableRecord) -> Self {
        let properties = table.columns.as_ref().map(|columns| {
            columns
                .iter()
                .map(|c| {
                    (
                        c.name.clone(),
                        ColumnMetadata {
                            sql_data_type: c.data_type.clone(),
                            sql_default: c.default_definition.clone(),
                        },
                    )
                })
                .collect()
        });

        Self {
            schema_name: table.schema_name.clone(),
            table_name: table.name.clone(),
            properties,
        }
    }
}

/// A column whose type has no canonical mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsupportedProperty {
    pub name: String,
    pub data_type: String,
}

/// Everything known about one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSnapshot {
    pub name: String,
    pub properties: IndexMap<String, CanonicalPropertyType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsupported_properties: Vec<UnsupportedProperty>,
    pub references: IndexMap<String, ModelReference>,
    pub metadata: ModelMetadata,
}

/// The whole introspected schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    pub models: Vec<ModelSnapshot>,
}

impl SchemaSnapshot {
    pub fn model(&self, name: &str) -> Option<&ModelSnapshot> {
        self.models.iter().find(|m| m.name == name)
    }
}

//! Catalog record types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A table from `sys.tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    /// `sys.tables.object_id`.
    pub object_id: i32,

    /// Table name.
    pub name: String,

    /// Schema name.
    pub schema_name: String,

    /// Columns, once listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnRecord>>,

    /// Foreign keys by constraint name, once listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<IndexMap<String, ReferenceRecord>>,
}

impl TableRecord {
    pub fn new(object_id: i32, name: impl Into<String>, schema_name: impl Into<String>) -> Self {
        Self {
            object_id,
            name: name.into(),
            schema_name: schema_name.into(),
            columns: None,
            references: None,
        }
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.name)
    }

    /// Find a cached column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnRecord> {
        self.columns.as_ref()?.iter().find(|c| c.name == name)
    }
}

/// Column metadata from `sys.columns` and its joined catalog views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRecord {
    /// Column name.
    pub name: String,

    /// Data type as reported by `TYPE_NAME` (e.g. "int", "nvarchar").
    pub data_type: String,

    /// Storage length in bytes (-1 for max).
    pub max_length: i16,

    /// Numeric precision.
    pub precision: u8,

    /// Numeric scale.
    pub scale: u8,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,

    /// Whether the column is an identity column.
    pub is_identity: bool,

    /// Identity seed.
    pub seed_value: Option<i64>,

    /// Identity increment.
    pub increment_value: Option<i64>,

    /// Default constraint definition as stored, e.g. `((0))`.
    pub default_definition: Option<String>,
}

impl ColumnRecord {
    /// A nullable, non-key column with no length, precision or default.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            max_length: 0,
            precision: 0,
            scale: 0,
            is_nullable: true,
            is_primary_key: false,
            is_identity: false,
            seed_value: None,
            increment_value: None,
            default_definition: None,
        }
    }
}

/// One row of the foreign key query: a single column pair of a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub local_column: String,
    pub ref_table: String,
    pub ref_column: String,
}

/// A local column paired with the column it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPair {
    pub local_column: String,
    pub ref_column: String,
}

/// A foreign key constraint with its ordered column pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub name: String,
    pub ref_table: String,
    pub columns: Vec<ColumnPair>,
}

impl ReferenceRecord {
    /// Local column names in constraint order.
    pub fn local_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.local_column.as_str()).collect()
    }

    /// Whether the key spans more than one column.
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }
}

/// Group foreign key rows into one reference per constraint.
///
/// Constraint order follows first appearance; column pairs keep row order.
/// The target table of each group is taken from its first row.
pub fn group_foreign_keys(rows: Vec<ForeignKeyRow>) -> IndexMap<String, ReferenceRecord> {
    let mut references: IndexMap<String, ReferenceRecord> = IndexMap::new();

    for row in rows {
        let reference = references
            .entry(row.constraint_name.clone())
            .or_insert_with(|| ReferenceRecord {
                name: row.constraint_name.clone(),
                ref_table: row.ref_table.clone(),
                columns: Vec::new(),
            });
        reference.columns.push(ColumnPair {
            local_column: row.local_column,
            ref_column: row.ref_column,
        });
    }

    references
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

    #[test]
    fn test_composite_key_is_one_reference() {
        let rows = vec![
            fk("FK_Line_Order", "OrderId", "Orders", "Id"),
            fk("FK_Line_Order", "OrderRegion", "Orders", "Region"),
        ];
        let refs = group_foreign_keys(rows);

        assert_eq!(refs.len(), 1);
        let reference = &refs["FK_Line_Order"];
        assert_eq!(reference.ref_table, "Orders");
        assert!(reference.is_composite());
        assert_eq!(reference.local_columns(), vec!["OrderId", "OrderRegion"]);
        assert_eq!(reference.columns[1].ref_column, "Region");
    }

    #[test]
    fn test_constraints_keep_first_seen_order() {
        let rows = vec![
            fk("FK_B", "CustomerId", "Customers", "Id"),
            fk("FK_A", "ProductId", "Products", "Id"),
            fk("FK_B", "CustomerSite", "Customers", "Site"),
        ];
        let refs = group_foreign_keys(rows);

        let names: Vec<&str> = refs.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["FK_B", "FK_A"]);
        assert_eq!(refs["FK_B"].columns.len(), 2);
        assert_eq!(refs["FK_A"].columns.len(), 1);
    }

    #[test]
    fn test_no_rows_no_references() {
        assert!(group_foreign_keys(Vec::new()).is_empty());
    }

    #[test]
    fn test_table_column_lookup() {
        let mut table = TableRecord::new(7, "Orders", "dbo");
        assert!(table.column("Id").is_none());
        assert_eq!(table.full_name(), "dbo.Orders");

        table.columns = Some(vec![ColumnRecord {
            name: "Id".into(),
            data_type: "int".into(),
            max_length: 4,
            precision: 10,
            scale: 0,
            is_nullable: false,
            is_primary_key: true,
            is_identity: true,
            seed_value: Some(1),
            increment_value: Some(1),
            default_definition: None,
        }]);
        assert!(table.column("Id").unwrap().is_primary_key);
    }
}

//! Mapping of SQL Server column definitions to canonical property types.

use serde::Serialize;

use crate::catalog::ColumnRecord;
use crate::error::{IntrospectError, Result};

/// Default value reported for columns that default to the current timestamp.
pub const NOW_SENTINEL: &str = "NOW";

/// Functions that SQL Server evaluates to the current timestamp.
const NOW_FUNCTIONS: [&str; 4] = ["getdate()", "getutcdate()", "sysdatetime()", "sysutcdatetime()"];

/// Vendor type families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeFamily {
    Boolean,
    Binary,
    Integer,
    Decimal,
    DateTime,
    String,
    UnicodeString,
    UniqueIdentifier,
}

impl TypeFamily {
    /// Classify a vendor type name (case-insensitive).
    pub fn classify(data_type: &str) -> Option<Self> {
        let family = match data_type.to_lowercase().as_str() {
            "bit" => TypeFamily::Boolean,

            "binary" | "varbinary" | "image" => TypeFamily::Binary,

            "tinyint" | "smallint" | "int" | "bigint" => TypeFamily::Integer,

            // Currency and floating point map to Decimal too
            "decimal" | "numeric" | "smallmoney" | "money" | "real" | "float" => {
                TypeFamily::Decimal
            }

            "date" | "datetime" | "datetime2" | "datetimeoffset" | "smalldatetime" | "time" => {
                TypeFamily::DateTime
            }

            "char" | "varchar" | "text" => TypeFamily::String,
            "nchar" | "nvarchar" | "ntext" => TypeFamily::UnicodeString,

            "uniqueidentifier" => TypeFamily::UniqueIdentifier,

            _ => return None,
        };
        Some(family)
    }
}

/// Identity column settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Autogenerate {
    pub seed: i64,
    pub increment: i64,
}

/// Type-specific facets of a canonical property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum PropertyKind {
    Integer {
        autogenerate: Option<Autogenerate>,
        default: Option<String>,
    },
    Decimal {
        precision: u8,
        scale: u8,
        default: Option<String>,
    },
    /// `max_length` is in characters; `None` means unbounded.
    String {
        max_length: Option<i32>,
        default: Option<String>,
    },
    Binary {
        max_length: Option<i32>,
        default: Option<String>,
    },
    /// `default` is [`NOW_SENTINEL`] for current-timestamp defaults.
    DateTime { default: Option<String> },
    Boolean { default: Option<bool> },
    UniqueIdentifier { has_generated_default: bool },
}

/// Vendor-neutral description of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPropertyType {
    pub nullable: bool,
    pub is_primary_key: bool,
    #[serde(flatten)]
    pub kind: PropertyKind,
}

impl CanonicalPropertyType {
    /// Name of the canonical type, e.g. "Integer".
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            PropertyKind::Integer { .. } => "Integer",
            PropertyKind::Decimal { .. } => "Decimal",
            PropertyKind::String { .. } => "String",
            PropertyKind::Binary { .. } => "Binary",
            PropertyKind::DateTime { .. } => "DateTime",
            PropertyKind::Boolean { .. } => "Boolean",
            PropertyKind::UniqueIdentifier { .. } => "UniqueIdentifier",
        }
    }

    /// The normalized default expression, when the kind carries one.
    pub fn default_expression(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Integer { default, .. }
            | PropertyKind::Decimal { default, .. }
            | PropertyKind::String { default, .. }
            | PropertyKind::Binary { default, .. }
            | PropertyKind::DateTime { default } => default.as_deref(),
            PropertyKind::Boolean { .. } | PropertyKind::UniqueIdentifier { .. } => None,
        }
    }
}

/// Map a column of `model` to its canonical property type.
pub fn map_column(model: &str, column: &ColumnRecord) -> Result<CanonicalPropertyType> {
    let family = TypeFamily::classify(&column.data_type).ok_or_else(|| {
        IntrospectError::unsupported_type(model, &column.name, &column.data_type)
    })?;

    let default = column.default_definition.as_deref();
    let kind = match family {
        TypeFamily::Boolean => PropertyKind::Boolean {
            default: parse_default(default).map(|value| value == "1"),
        },

        TypeFamily::Binary => PropertyKind::Binary {
            max_length: (column.max_length > 0).then_some(i32::from(column.max_length)),
            default: parse_default(default),
        },

        TypeFamily::Integer => PropertyKind::Integer {
            autogenerate: column.is_identity.then(|| Autogenerate {
                seed: non_zero_or_one(column.seed_value),
                increment: non_zero_or_one(column.increment_value),
            }),
            default: parse_default(default),
        },

        TypeFamily::Decimal => PropertyKind::Decimal {
            precision: column.precision,
            scale: column.scale,
            default: parse_default(default),
        },

        TypeFamily::DateTime => PropertyKind::DateTime {
            default: parse_datetime_default(default),
        },

        TypeFamily::String | TypeFamily::UnicodeString => PropertyKind::String {
            max_length: string_length(family, column.max_length),
            default: parse_default(default),
        },

        TypeFamily::UniqueIdentifier => PropertyKind::UniqueIdentifier {
            has_generated_default: default.is_some(),
        },
    };

    Ok(CanonicalPropertyType {
        nullable: column.is_nullable,
        is_primary_key: column.is_primary_key,
        kind,
    })
}

/// Strip enclosing parentheses from a stored default expression.
///
/// SQL Server stores defaults wrapped one or more times, e.g. `((0))`. Only a
/// pair that encloses the whole expression is removed, so `(1)+(2)` is kept.
/// Parens inside string literals are not counted.
pub fn parse_default(definition: Option<&str>) -> Option<String> {
    let mut result = definition?;
    while let Some(inner) = strip_outer_parens(result) {
        result = inner;
    }
    Some(result.to_string())
}

fn strip_outer_parens(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    if inner.is_empty() {
        return None;
    }

    // The opening paren must close at the very end. Parens inside
    // '...' literals don't count; '' escapes toggle twice.
    let mut depth = 0i32;
    let mut in_literal = false;
    for ch in inner.chars() {
        match ch {
            '\'' => in_literal = !in_literal,
            _ if in_literal => {}
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0 && !in_literal).then_some(inner)
}

fn parse_datetime_default(definition: Option<&str>) -> Option<String> {
    let value = parse_default(definition)?;
    let lowered = value.to_lowercase();
    if NOW_FUNCTIONS.contains(&lowered.as_str()) {
        Some(NOW_SENTINEL.to_string())
    } else {
        Some(value)
    }
}

/// Convert byte length to character length. -1 means unbounded.
fn string_length(family: TypeFamily, max_length: i16) -> Option<i32> {
    match max_length {
        -1 => None,
        len if len > 0 && family == TypeFamily::UnicodeString => Some(i32::from(len) / 2),
        len => Some(i32::from(len)),
    }
}

fn non_zero_or_one(value: Option<i64>) -> i64 {
    match value {
        Some(0) | None => 1,
        Some(v) => v,
    }
}

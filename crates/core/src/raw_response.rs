use std::fmt;

use serde::{Deserialize, Serialize};

/// One positional value as sent by the query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawValue {
    Str(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    ObjectPath(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) | Self::ObjectPath(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
        }
    }
}

impl RawValue {
    fn write_dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value:?}"),
            Self::ObjectPath(value) => write!(f, "ObjectPath({value:?})"),
            other => write!(f, "{other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    #[serde(default)]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub size: i32,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(type_name: impl Into<String>, name: impl Into<String>, size: i32) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            size,
        }
    }
}

/// Unparsed three-segment recordset reply: column metadata, positional data
/// rows described by `signature`, and a parallel null mask.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawResponse {
    pub columns: Vec<ColumnMeta>,
    pub signature: String,
    #[serde(default)]
    pub rows: Vec<Vec<RawValue>>,
    #[serde(default)]
    pub nulls: Vec<Vec<bool>>,
}

impl RawResponse {
    #[must_use]
    pub fn new(
        columns: Vec<ColumnMeta>,
        signature: impl Into<String>,
        rows: Vec<Vec<RawValue>>,
        nulls: Vec<Vec<bool>>,
    ) -> Self {
        Self {
            columns,
            signature: signature.into(),
            rows,
            nulls,
        }
    }

    /// Signature with the surrounding struct parentheses removed.
    #[must_use]
    pub fn type_codes(&self) -> &str {
        self.signature.trim_matches(|c| c == '(' || c == ')')
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Columns([")?;
        for (index, column) in self.columns.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "({:?}, {:?}, {})",
                column.type_name, column.name, column.size
            )?;
        }
        write!(f, "]), Rows(signature={:?}, [", self.signature)?;
        for (row_index, row) in self.rows.iter().enumerate() {
            if row_index > 0 {
                f.write_str(", ")?;
            }
            f.write_str("(")?;
            for (index, value) in row.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                value.write_dump(f)?;
            }
            f.write_str(")")?;
        }
        f.write_str("]), Nulls([")?;
        for (row_index, row) in self.nulls.iter().enumerate() {
            if row_index > 0 {
                f.write_str(", ")?;
            }
            f.write_str("(")?;
            for (index, is_null) in row.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{is_null}")?;
            }
            f.write_str(")")?;
        }
        f.write_str("])")
    }
}

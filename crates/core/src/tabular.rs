use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::raw_response::{RawResponse, RawValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    String,
    Bool,
    Integer,
    LongInteger,
    Float,
    Object,
}

impl ColumnKind {
    /// Maps a single signature character to a column kind. Unknown codes
    /// yield `None`; callers decide the fallback.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            's' => Some(Self::String),
            'b' => Some(Self::Bool),
            'o' => Some(Self::Object),
            'n' | 'i' | 'q' | 'u' => Some(Self::Integer),
            'x' | 't' => Some(Self::LongInteger),
            'd' => Some(Self::Float),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::LongInteger => "long",
            Self::Float => "float",
            Self::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub title: String,
    pub kind: ColumnKind,
}

/// Typed cell kept until the rendering boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Bool(bool),
    Integer(i64),
    UInteger(u64),
    Float(f64),
    Object(String),
}

impl CellValue {
    fn from_raw(kind: ColumnKind, value: &RawValue) -> Self {
        match (kind, value) {
            (ColumnKind::Bool, RawValue::Bool(value)) => Self::Bool(*value),
            (ColumnKind::Integer | ColumnKind::LongInteger, RawValue::Int(value)) => {
                Self::Integer(*value)
            }
            (ColumnKind::Integer | ColumnKind::LongInteger, RawValue::UInt(value)) => {
                Self::UInteger(*value)
            }
            (ColumnKind::Float, RawValue::Double(value)) => Self::Float(*value),
            (ColumnKind::Object, RawValue::ObjectPath(value) | RawValue::Str(value)) => {
                Self::Object(value.clone())
            }
            (_, other) => Self::Text(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(value) | Self::Object(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::UInteger(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed response: signature declares {signature} columns but metadata lists {titles}")]
    ColumnCountMismatch { signature: usize, titles: usize },
    #[error("malformed response: row {row} has {actual} values, expected {expected}")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("malformed response: null mask has {actual} rows, expected {expected}")]
    NullMaskRowCount { expected: usize, actual: usize },
    #[error("malformed response: null mask row {row} has {actual} flags, expected {expected}")]
    NullMaskWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

impl ParseError {
    /// Every parse failure is a malformed-response failure today.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::ColumnCountMismatch { .. }
                | Self::RowWidthMismatch { .. }
                | Self::NullMaskRowCount { .. }
                | Self::NullMaskWidthMismatch { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("result table has no next row")]
    OutOfRange,
}

/// Parsed, immutable table built from one [`RawResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct TabularResult {
    columns: Vec<ColumnSpec>,
    cells: Vec<Vec<CellValue>>,
    original: RawResponse,
}

impl TabularResult {
    pub fn parse(raw: &RawResponse) -> Result<Self, ParseError> {
        let kinds = decode_kinds(raw.type_codes());
        if kinds.len() != raw.columns.len() {
            return Err(ParseError::ColumnCountMismatch {
                signature: kinds.len(),
                titles: raw.columns.len(),
            });
        }

        let columns = raw
            .columns
            .iter()
            .zip(&kinds)
            .map(|(meta, kind)| ColumnSpec {
                title: meta.name.clone(),
                kind: *kind,
            })
            .collect::<Vec<_>>();

        let mut cells = Vec::with_capacity(raw.rows.len());
        for (row_index, row) in raw.rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ParseError::RowWidthMismatch {
                    row: row_index,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            cells.push(
                row.iter()
                    .zip(&kinds)
                    .map(|(value, kind)| CellValue::from_raw(*kind, value))
                    .collect::<Vec<_>>(),
            );
        }

        if raw.nulls.len() != raw.rows.len() {
            return Err(ParseError::NullMaskRowCount {
                expected: raw.rows.len(),
                actual: raw.nulls.len(),
            });
        }
        for (row_index, (mask, row)) in raw.nulls.iter().zip(cells.iter_mut()).enumerate() {
            if mask.len() != columns.len() {
                return Err(ParseError::NullMaskWidthMismatch {
                    row: row_index,
                    expected: columns.len(),
                    actual: mask.len(),
                });
            }
            for (cell, is_null) in row.iter_mut().zip(mask) {
                if *is_null {
                    *cell = CellValue::Null;
                }
            }
        }

        Ok(Self {
            columns,
            cells,
            original: raw.clone(),
        })
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    #[must_use]
    pub fn column_titles(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.title.clone())
            .collect()
    }

    #[must_use]
    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        self.columns.iter().map(|column| column.kind).collect()
    }

    /// One `String` kind per column, for display layers that render every
    /// column as text.
    #[must_use]
    pub fn column_kinds_as_text(&self) -> Vec<ColumnKind> {
        vec![ColumnKind::String; self.columns.len()]
    }

    #[must_use]
    pub fn cells(&self) -> &[Vec<CellValue>] {
        &self.cells
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<Vec<String>> {
        self.cells
            .get(index)
            .map(|row| row.iter().map(CellValue::display).collect())
    }

    /// Display grid: every cell stringified, nulls as the empty string.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(CellValue::display).collect())
            .collect()
    }

    #[must_use]
    pub fn original(&self) -> &RawResponse {
        &self.original
    }

    #[must_use]
    pub fn cursor(&self) -> RowCursor<'_> {
        RowCursor::new(self)
    }
}

fn decode_kinds(codes: &str) -> Vec<ColumnKind> {
    codes
        .chars()
        .enumerate()
        .map(|(index, code)| {
            ColumnKind::from_code(code).unwrap_or_else(|| {
                warn!(%code, column = index, "unknown column type code, defaulting to string");
                ColumnKind::String
            })
        })
        .collect()
}

/// Forward-only cursor over the display rows of a [`TabularResult`].
///
/// `current` is the index of the row most recently returned; `None` means
/// nothing has been consumed yet.
#[derive(Debug, Clone)]
pub struct RowCursor<'a> {
    result: &'a TabularResult,
    current: Option<usize>,
}

impl<'a> RowCursor<'a> {
    #[must_use]
    pub fn new(result: &'a TabularResult) -> Self {
        Self {
            result,
            current: None,
        }
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_index() < self.result.row_count()
    }

    pub fn next_row(&mut self) -> Result<Vec<String>, CursorError> {
        if !self.has_next() {
            return Err(CursorError::OutOfRange);
        }
        let index = self.next_index();
        self.current = Some(index);
        self.result.row(index).ok_or(CursorError::OutOfRange)
    }

    /// Repositions the cursor so the following `next_row` returns the row
    /// after `row`. Positions past the end simply exhaust the cursor.
    pub fn set_current(&mut self, row: usize) {
        self.current = Some(row);
    }

    pub fn rewind(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    fn next_index(&self) -> usize {
        self.current.map_or(0, |current| current.saturating_add(1))
    }
}

impl Iterator for RowCursor<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().ok()
    }
}

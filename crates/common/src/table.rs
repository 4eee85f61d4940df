//! Materialized query results and statement parameters.
//!
//! A [`Table`] is what the executor hands back and what the cache stores: the
//! column names plus every row, fully read out of SQLite so no connection or
//! statement outlives the call that produced it.

use std::fmt;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// One value read from a result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    fn from_value_ref(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Int(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            // Blobs never appear in reddit_activity; keep them readable anyway.
            ValueRef::Blob(b) => Self::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

/// A bound statement parameter. Hashable so it can be part of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlParam {
    Int(i64),
    /// Bit pattern of an `f64`, which has no `Eq`/`Hash` of its own.
    Real(u64),
    Text(String),
}

impl SqlParam {
    pub fn real(value: f64) -> Self {
        Self::Real(value.to_bits())
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Int(i) => i.to_sql(),
            Self::Real(bits) => Ok(ToSqlOutput::from(f64::from_bits(*bits))),
            Self::Text(s) => s.to_sql(),
        }
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A Moon Week identifier exactly as the store holds it.
///
/// Weeks are usually integers but nothing in the schema forces that, so the
/// original storage type is kept and bound back unchanged. Whole-valued reals
/// are folded into integers so `3.0` and `3` name the same week.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoonWeek(SqlParam);

impl MoonWeek {
    pub fn from_cell(cell: &Cell, column: &str) -> Result<Self> {
        match cell {
            Cell::Int(i) => Ok(Self(SqlParam::Int(*i))),
            Cell::Text(s) => Ok(Self(SqlParam::Text(s.clone()))),
            #[allow(clippy::cast_possible_truncation)]
            Cell::Real(f) if f.fract() == 0.0 => Ok(Self(SqlParam::Int(*f as i64))),
            Cell::Real(f) => Ok(Self(SqlParam::real(*f))),
            Cell::Null => Err(StoreError::Decode {
                column: column.to_string(),
                expected: "a moon week",
            }),
        }
    }

    pub fn as_param(&self) -> SqlParam {
        self.0.clone()
    }
}

impl From<i64> for MoonWeek {
    fn from(value: i64) -> Self {
        Self(SqlParam::Int(value))
    }
}

impl fmt::Display for MoonWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            SqlParam::Int(i) => write!(f, "{i}"),
            SqlParam::Real(bits) => write!(f, "{}", f64::from_bits(*bits)),
            SqlParam::Text(s) => f.write_str(s),
        }
    }
}

/// Column names plus ordered rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Drain a prepared statement into a table.
    pub fn collect(stmt: &mut rusqlite::Statement<'_>, params: &[SqlParam]) -> Result<Self> {
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        while let Some(row) = cursor.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(Cell::from_value_ref(row.get_ref(i)?));
            }
            rows.push(cells);
        }

        Ok(Self { columns, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| StoreError::Decode {
                column: name.to_string(),
                expected: "present in the result",
            })
    }

    pub fn cell(&self, row: usize, column: &str) -> Result<&Cell> {
        let idx = self.column_index(column)?;
        self.rows
            .get(row)
            .and_then(|r| r.get(idx))
            .ok_or_else(|| StoreError::Decode {
                column: column.to_string(),
                expected: "present in the row",
            })
    }

    /// Numeric value; SQL NULL reads as zero so missing sums default to 0.
    pub fn f64(&self, row: usize, column: &str) -> Result<f64> {
        match self.cell(row, column)? {
            Cell::Null => Ok(0.0),
            #[allow(clippy::cast_precision_loss)]
            Cell::Int(i) => Ok(*i as f64),
            Cell::Real(f) => Ok(*f),
            Cell::Text(_) => Err(StoreError::Decode {
                column: column.to_string(),
                expected: "numeric",
            }),
        }
    }

    /// Integer value; SQL NULL reads as zero.
    pub fn i64(&self, row: usize, column: &str) -> Result<i64> {
        match self.cell(row, column)? {
            Cell::Null => Ok(0),
            Cell::Int(i) => Ok(*i),
            #[allow(clippy::cast_possible_truncation)]
            Cell::Real(f) if f.fract() == 0.0 => Ok(*f as i64),
            _ => Err(StoreError::Decode {
                column: column.to_string(),
                expected: "an integer",
            }),
        }
    }

    pub fn text(&self, row: usize, column: &str) -> Result<String> {
        match self.cell(row, column)? {
            Cell::Text(s) => Ok(s.clone()),
            Cell::Int(i) => Ok(i.to_string()),
            Cell::Real(f) => Ok(f.to_string()),
            Cell::Null => Err(StoreError::Decode {
                column: column.to_string(),
                expected: "text",
            }),
        }
    }

    pub fn opt_text(&self, row: usize, column: &str) -> Result<Option<String>> {
        match self.cell(row, column)? {
            Cell::Null => Ok(None),
            _ => self.text(row, column).map(Some),
        }
    }
}

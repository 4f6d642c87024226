//! Result sets and rows.
//!
//! A [`Recordset`] holds the rows returned by the server and decodes each
//! one into a [`Record`] only when iteration reaches it.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dbkit_core::{FromValue, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::{DbError, Result};

/// Name and native type of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name or alias.
    pub name: String,
    /// Native type name as reported by the driver.
    pub type_name: String,
}

/// Raw rows of one result, per backend.
pub(crate) enum Rows {
    MySql(Vec<MySqlRow>),
    Postgres(Vec<PgRow>),
    Sqlite(Vec<SqliteRow>),
}

fn column_info<R: Row>(rows: &[R]) -> Vec<ColumnInfo> {
    rows.first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name().to_string(),
                    type_name: c.type_info().name().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

// Manual impl: `SqliteRow` does not implement `Debug`.
impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self {
            Self::MySql(_) => "MySql",
            Self::Postgres(_) => "Postgres",
            Self::Sqlite(_) => "Sqlite",
        };
        f.debug_struct("Rows")
            .field("backend", &backend)
            .field("len", &self.len())
            .finish()
    }
}

impl Rows {
    fn len(&self) -> usize {
        match self {
            Self::MySql(rows) => rows.len(),
            Self::Postgres(rows) => rows.len(),
            Self::Sqlite(rows) => rows.len(),
        }
    }

    fn columns(&self) -> Vec<ColumnInfo> {
        match self {
            Self::MySql(rows) => column_info(rows),
            Self::Postgres(rows) => column_info(rows),
            Self::Sqlite(rows) => column_info(rows),
        }
    }

    fn decode(&self, index: usize, columns: &[ColumnInfo]) -> Result<Record> {
        let mut values = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let decoded = match self {
                Self::MySql(rows) => decode_mysql(&rows[index], i),
                Self::Postgres(rows) => decode_postgres(&rows[index], i),
                Self::Sqlite(rows) => decode_sqlite(&rows[index], i),
            };
            let value = decoded.map_err(|e| DbError::Decode {
                column: column.name.clone(),
                message: e.to_string(),
            })?;
            values.push((column.name.clone(), value));
        }
        Ok(Record { values })
    }
}

/// Null flag and upper-cased type name of one value.
fn inspect_raw<R>(row: &R, index: usize) -> std::result::Result<(bool, String), sqlx::Error>
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
{
    let raw = row.try_get_raw(index)?;
    let null = raw.is_null();
    let name = raw.type_info().name().to_ascii_uppercase();
    Ok((null, name))
}

fn decode_sqlite(row: &SqliteRow, i: usize) -> std::result::Result<Value, sqlx::Error> {
    let (null, type_name) = inspect_raw(row, i)?;
    if null {
        return Ok(Value::Null);
    }
    Ok(match type_name.as_str() {
        "INTEGER" | "BIGINT" | "BOOLEAN" => Value::Int(row.try_get_unchecked::<i64, _>(i)?),
        "REAL" | "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked::<f64, _>(i)?),
        "BLOB" => Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(i)?),
        _ => Value::Text(row.try_get_unchecked::<String, _>(i)?),
    })
}

fn decode_mysql(row: &MySqlRow, i: usize) -> std::result::Result<Value, sqlx::Error> {
    let (null, type_name) = inspect_raw(row, i)?;
    if null {
        return Ok(Value::Null);
    }
    let base = type_name.split_whitespace().next().unwrap_or_default();
    Ok(match base {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Int(row.try_get_unchecked::<i64, _>(i)?)
        }
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<bool, _>(i)?),
        "FLOAT" => Value::Float(f64::from(row.try_get_unchecked::<f32, _>(i)?)),
        "DOUBLE" => Value::Float(row.try_get_unchecked::<f64, _>(i)?),
        "DATE" => Value::Text(row.try_get_unchecked::<NaiveDate, _>(i)?.to_string()),
        "TIME" => Value::Text(row.try_get_unchecked::<NaiveTime, _>(i)?.to_string()),
        "DATETIME" | "TIMESTAMP" => Value::Text(
            row.try_get_unchecked::<NaiveDateTime, _>(i)?
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT"
        | "GEOMETRY" => Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(i)?),
        // DECIMAL travels as text in both protocols
        _ => Value::Text(row.try_get_unchecked::<String, _>(i)?),
    })
}

fn decode_postgres(row: &PgRow, i: usize) -> std::result::Result<Value, sqlx::Error> {
    let (null, type_name) = inspect_raw(row, i)?;
    if null {
        return Ok(Value::Null);
    }
    Ok(match type_name.as_str() {
        "INT2" => Value::Int(i64::from(row.try_get::<i16, _>(i)?)),
        "INT4" => Value::Int(i64::from(row.try_get::<i32, _>(i)?)),
        "INT8" => Value::Int(row.try_get::<i64, _>(i)?),
        "FLOAT4" => Value::Float(f64::from(row.try_get::<f32, _>(i)?)),
        "FLOAT8" => Value::Float(row.try_get::<f64, _>(i)?),
        "BOOL" => Value::Bool(row.try_get::<bool, _>(i)?),
        "BYTEA" => Value::Blob(row.try_get::<Vec<u8>, _>(i)?),
        "DATE" => Value::Text(row.try_get::<NaiveDate, _>(i)?.to_string()),
        "TIME" => Value::Text(row.try_get::<NaiveTime, _>(i)?.to_string()),
        "TIMESTAMP" => Value::Text(
            row.try_get::<NaiveDateTime, _>(i)?
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
        "TIMESTAMPTZ" => Value::Text(
            row.try_get::<DateTime<Utc>, _>(i)?
                .format("%Y-%m-%d %H:%M:%S%:z")
                .to_string(),
        ),
        "NUMERIC" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(i)?;
            Value::Text(numeric_text(&bytes).ok_or_else(|| {
                sqlx::Error::Decode("malformed NUMERIC value".into())
            })?)
        }
        _ => Value::Text(row.try_get_unchecked::<String, _>(i)?),
    })
}

/// Renders PostgreSQL's binary NUMERIC: a header of ndigits, weight, sign
/// and display scale, followed by base-10000 digits.
fn numeric_text(bytes: &[u8]) -> Option<String> {
    let word = |n: usize| -> Option<u16> {
        let b = bytes.get(n * 2..n * 2 + 2)?;
        Some(u16::from_be_bytes([b[0], b[1]]))
    };
    let ndigits = usize::from(word(0)?);
    let weight = i32::from(i16::from_be_bytes(word(1)?.to_be_bytes()));
    let sign = word(2)?;
    let dscale = usize::from(word(3)?);
    if sign == 0xC000 {
        return Some(String::from("NaN"));
    }
    let digits = (0..ndigits)
        .map(|n| word(4 + n))
        .collect::<Option<Vec<u16>>>()?;
    let digit = |position: i32| -> u16 {
        usize::try_from(position)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == 0x4000 {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        for position in 0..=weight {
            if position == 0 {
                text.push_str(&digit(position).to_string());
            } else {
                text.push_str(&format!("{:04}", digit(position)));
            }
        }
    }
    if dscale > 0 {
        let mut fraction = String::new();
        let mut position = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(position)));
            position += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }
    Some(text)
}

/// One decoded row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<(String, Value)>,
}

impl Record {
    /// Builds a record from name/value pairs.
    #[must_use]
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    /// The value of column `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether the row has a column called `name`.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Typed access to column `name`.
    ///
    /// # Errors
    ///
    /// [`DbError::Decode`] when the column is missing, [`DbError::Value`]
    /// when the value does not convert.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.field(name).ok_or_else(|| DbError::Decode {
            column: name.to_string(),
            message: String::from("no such column"),
        })?;
        Ok(T::from_value(value)?)
    }

    /// The value at position `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.values.get(index).map(|(_, v)| v)
    }

    /// Column/value pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies the row into a map keyed by column name.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.values.iter().cloned().collect()
    }
}

/// Forward-only cursor over a query result.
///
/// Iterating yields `Result<Record>` since decoding happens per row.
/// Running past the end yields `None`, never an error.
#[derive(Debug)]
pub struct Recordset {
    columns: Vec<ColumnInfo>,
    rows: Rows,
    index: usize,
    current: Option<Record>,
}

impl Recordset {
    pub(crate) fn new(rows: Rows) -> Self {
        Self {
            columns: rows.columns(),
            rows,
            index: 0,
            current: None,
        }
    }

    /// Total number of rows, however far iteration has gone.
    ///
    /// Not `count`: `Iterator::count` would consume the recordset.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column metadata. Empty when the result has no rows.
    #[must_use]
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Whether another row remains.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.index < self.rows.len()
    }

    /// The row most recently returned by `next`.
    #[must_use]
    pub const fn current(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Decodes every remaining row at once.
    ///
    /// # Errors
    ///
    /// Fails on the first row that cannot be decoded.
    pub fn rows(self) -> Result<Vec<Record>> {
        self.collect()
    }

    /// The next row, if any.
    ///
    /// # Errors
    ///
    /// Fails when the row cannot be decoded.
    pub fn first(mut self) -> Result<Option<Record>> {
        self.next().transpose()
    }
}

impl Iterator for Recordset {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        let record = self.rows.decode(self.index, &self.columns);
        self.index += 1;
        if let Ok(record) = &record {
            self.current = Some(record.clone());
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(ndigits: u16, weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for word in [ndigits, u16::from_be_bytes(weight.to_be_bytes()), sign, dscale] {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        for digit in digits {
            bytes.extend_from_slice(&digit.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn test_numeric_text() {
        // 12345.67
        assert_eq!(
            numeric_text(&numeric(3, 1, 0, 2, &[1, 2345, 6700])).as_deref(),
            Some("12345.67")
        );
        // -0.05
        assert_eq!(
            numeric_text(&numeric(1, -1, 0x4000, 2, &[500])).as_deref(),
            Some("-0.05")
        );
        // 0
        assert_eq!(numeric_text(&numeric(0, 0, 0, 0, &[])).as_deref(), Some("0"));
        // 20000 stored as one digit with weight 1
        assert_eq!(
            numeric_text(&numeric(1, 1, 0, 0, &[2])).as_deref(),
            Some("20000")
        );
        assert_eq!(numeric_text(&[0, 1]), None);
    }

    #[test]
    fn test_record_access() {
        let record = Record::new(vec![
            (String::from("id"), Value::Int(7)),
            (String::from("name"), Value::Text(String::from("ann"))),
            (String::from("note"), Value::Null),
        ]);
        assert!(record.exists("name"));
        assert!(!record.exists("missing"));
        assert_eq!(record.get::<i64>("id").unwrap(), 7);
        assert_eq!(record.get::<Option<String>>("note").unwrap(), None);
        assert!(matches!(
            record.get::<i64>("missing"),
            Err(DbError::Decode { .. })
        ));
        assert!(matches!(record.get::<i64>("note"), Err(DbError::Value(_))));
        assert_eq!(record.to_map().len(), 3);
        assert_eq!(record.at(1), Some(&Value::Text(String::from("ann"))));
    }
}

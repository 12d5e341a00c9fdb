//! Tabular data model
//!
//! A `Table` is an ordered set of uniquely named columns plus rows of scalar `Value`s.
//! Peers return tables from `get_data`; the aggregator joins them and the analytics
//! operations compute statistics over the joined result.

use crate::error::{CarrierError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single scalar cell
///
/// Deserializes from plain JSON scalars (`null`, `true`, `1`, `1.5`, `"a"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Hashable form of a non-missing value, used for join keys
///
/// Integral floats collapse to `Int` so that `1` and `1.0` match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
}

impl Value {
    /// Null and NaN are both treated as missing
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the value (booleans count as 0/1)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Whether the value is numeric or boolean
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Float(_))
    }

    /// Key representation, `None` for missing values (they never match)
    pub fn key_part(&self) -> Option<KeyPart> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(KeyPart::Bool(*b)),
            Value::Int(i) => Some(KeyPart::Int(*i)),
            Value::Float(f) if f.is_nan() => None,
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(KeyPart::Int(*f as i64))
                } else {
                    Some(KeyPart::Float(f.to_bits()))
                }
            }
            Value::Text(s) => Some(KeyPart::Text(s.clone())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Serialized table shape, validated on the way in
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawTable> for Table {
    type Error = CarrierError;

    fn try_from(raw: RawTable) -> Result<Self> {
        Table::new(raw.columns, raw.rows)
    }
}

/// Ordered columns and rows aligned with them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table, rejecting duplicate column names and ragged rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(CarrierError::InvalidTable(format!("duplicate column '{}'", column)));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(CarrierError::InvalidTable(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    /// Build a table column by column
    ///
    /// All columns must have the same length.
    pub fn from_columns(columns: Vec<(&str, Vec<Value>)>) -> Result<Self> {
        let num_rows = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != num_rows) {
            return Err(CarrierError::InvalidTable(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                num_rows
            )));
        }

        let names = columns.iter().map(|(name, _)| name.to_string()).collect();
        let rows = (0..num_rows)
            .map(|i| columns.iter().map(|(_, values)| values[i].clone()).collect())
            .collect();

        Self::new(names, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Cell lookup by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Append a row
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(CarrierError::InvalidTable(format!(
                "row has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Copy of the table without the named columns
    pub fn drop_columns(&self, names: &[String]) -> Table {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i]))
            .collect();

        Table {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Append a column; `values` must have one entry per row
    pub fn with_column(mut self, name: &str, values: Vec<Value>) -> Result<Table> {
        if self.has_column(name) {
            return Err(CarrierError::InvalidTable(format!("duplicate column '{}'", name)));
        }
        if values.len() != self.rows.len() {
            return Err(CarrierError::InvalidTable(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(self)
    }

    /// Extract named columns as an `f64` matrix (row-major), missing values as NaN
    ///
    /// Fails on absent columns and on text values.
    pub fn numeric_matrix(&self, names: &[String]) -> Result<Vec<Vec<f64>>> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| CarrierError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                indices
                    .iter()
                    .zip(names)
                    .map(|(&i, name)| match &row[i] {
                        v if v.is_missing() => Ok(f64::NAN),
                        v => v.as_f64().ok_or_else(|| CarrierError::NonNumericColumn {
                            column: name.clone(),
                            row: r,
                        }),
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let result = Table::new(vec!["a".into(), "a".into()], vec![]);
        assert!(matches!(result, Err(CarrierError::InvalidTable(_))));
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let result = Table::new(vec!["a".into(), "b".into()], vec![vec![Value::Int(1)]]);
        assert!(matches!(result, Err(CarrierError::InvalidTable(_))));
    }

    #[test]
    fn test_from_columns() {
        let table = Table::from_columns(vec![
            ("id", vec![1.into(), 2.into()]),
            ("name", vec!["x".into(), "y".into()]),
        ])
        .unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.columns(), &["id".to_string(), "name".to_string()]);
        assert_eq!(table.get(1, "name"), Some(&Value::from("y")));
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{"columns": ["id", "score", "label"], "rows": [[1, 0.5, "a"], [2, null, "b"]]}"#;
        let table: Table = serde_json::from_str(json).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.get(0, "score"), Some(&Value::Float(0.5)));
        assert!(table.get(1, "score").unwrap().is_missing());
    }

    #[test]
    fn test_deserialize_rejects_ragged() {
        let json = r#"{"columns": ["id", "score"], "rows": [[1]]}"#;
        assert!(serde_json::from_str::<Table>(json).is_err());
    }

    #[test]
    fn test_key_part_integral_float_matches_int() {
        assert_eq!(Value::Float(11.0).key_part(), Value::Int(11).key_part());
        assert_ne!(Value::Float(11.5).key_part(), Value::Int(11).key_part());
        assert_eq!(Value::Float(f64::NAN).key_part(), None);
        assert_eq!(Value::Null.key_part(), None);
    }

    #[test]
    fn test_key_part_out_of_range_float_stays_float() {
        let two_pow_63 = 9_223_372_036_854_775_808.0_f64;
        assert_ne!(Value::Float(two_pow_63).key_part(), Value::Int(i64::MAX).key_part());
        assert_eq!(Value::Float(-two_pow_63).key_part(), Value::Int(i64::MIN).key_part());
    }

    #[test]
    fn test_drop_and_add_columns() {
        let table = Table::from_columns(vec![
            ("a", vec![1.into()]),
            ("b", vec![2.into()]),
        ])
        .unwrap();

        let table = table.drop_columns(&["a".to_string()]);
        assert_eq!(table.columns(), &["b".to_string()]);

        let table = table.with_column("c", vec![3.into()]).unwrap();
        assert_eq!(table.get(0, "c"), Some(&Value::Int(3)));
        assert!(table.clone().with_column("c", vec![4.into()]).is_err());
    }

    #[test]
    fn test_numeric_matrix() {
        let table = Table::from_columns(vec![
            ("x", vec![1.into(), Value::Null]),
            ("y", vec![true.into(), 2.5.into()]),
            ("s", vec!["a".into(), "b".into()]),
        ])
        .unwrap();

        let m = table.numeric_matrix(&["x".to_string(), "y".to_string()]).unwrap();
        assert_eq!(m[0], vec![1.0, 1.0]);
        assert!(m[1][0].is_nan());
        assert_eq!(m[1][1], 2.5);

        assert!(matches!(
            table.numeric_matrix(&["s".to_string()]),
            Err(CarrierError::NonNumericColumn { row: 0, .. })
        ));
        assert!(matches!(
            table.numeric_matrix(&["z".to_string()]),
            Err(CarrierError::MissingColumn(_))
        ));
    }
}

//! Relational join of per-peer tables
//!
//! Tables are merged pairwise, left to right, with an inner join. A row survives only if
//! its key is present in every table merged so far.
//!
//! # Key matching
//!
//! A composite key matches only when *all* of its columns are equal. Two people sharing a
//! birth date but living at different house numbers are two different keys. Rows with a
//! missing value in any key column never match.
//!
//! # Column collisions
//!
//! Non-key columns present on both sides are kept twice, as `<name>_x` (left) and
//! `<name>_y` (right).

use crate::error::{CarrierError, Result};
use crate::table::{KeyPart, Table, Value};
use std::collections::HashMap;
use tracing::debug;

/// Suffix for a colliding left-hand column
pub const LEFT_SUFFIX: &str = "_x";

/// Suffix for a colliding right-hand column
pub const RIGHT_SUFFIX: &str = "_y";

/// Inner-join all tables on `keys`
///
/// With no keys, each pairwise merge joins on the columns the two sides have in common.
/// Explicit keys are checked against every table before anything is merged.
pub fn join_tables(tables: Vec<Table>, keys: &[String]) -> Result<Table> {
    if tables.is_empty() {
        return Err(CarrierError::InsufficientData { rows: 0, min: 1 });
    }

    for (idx, table) in tables.iter().enumerate() {
        if let Some(key) = keys.iter().find(|k| !table.has_column(k)) {
            return Err(CarrierError::MissingJoinKey {
                key: key.clone(),
                table: idx,
            });
        }
    }

    let mut tables = tables.into_iter().enumerate();
    let (_, mut joined) = tables.next().ok_or(CarrierError::InsufficientData { rows: 0, min: 1 })?;

    for (idx, right) in tables {
        let merge_keys = if keys.is_empty() {
            let common = common_columns(&joined, &right);
            if common.is_empty() {
                return Err(CarrierError::NoCommonColumns {
                    left: idx - 1,
                    right: idx,
                });
            }
            common
        } else {
            keys.to_vec()
        };

        debug!(table = idx, keys = ?merge_keys, "Merging table");
        joined = inner_join(&joined, &right, &merge_keys)?;
    }

    Ok(joined)
}

/// Columns of `left` that also appear in `right`, in left order
pub fn common_columns(left: &Table, right: &Table) -> Vec<String> {
    left.columns()
        .iter()
        .filter(|c| right.has_column(c))
        .cloned()
        .collect()
}

/// Inner join of two tables on the given key columns
///
/// Output columns: all left columns, then the non-key right columns. Output rows follow
/// left row order; several right matches for one left row follow right row order.
pub fn inner_join(left: &Table, right: &Table, keys: &[String]) -> Result<Table> {
    let left_keys = key_indices(left, keys, 0)?;
    let right_keys = key_indices(right, keys, 1)?;

    let right_values: Vec<usize> = (0..right.num_columns())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let columns = output_columns(left, right, keys, &right_values);

    // Hash the right side by full key
    let mut index: HashMap<Vec<KeyPart>, Vec<usize>> = HashMap::new();
    for (r, row) in right.rows().iter().enumerate() {
        if let Some(key) = row_key(row, &right_keys) {
            index.entry(key).or_default().push(r);
        }
    }

    let mut rows = Vec::new();
    for row in left.rows() {
        let Some(key) = row_key(row, &left_keys) else {
            continue;
        };
        let Some(matches) = index.get(&key) else {
            continue;
        };

        for &r in matches {
            let right_row = &right.rows()[r];
            let mut out: Vec<Value> = row.clone();
            out.extend(right_values.iter().map(|&i| right_row[i].clone()));
            rows.push(out);
        }
    }

    Table::new(columns, rows)
}

fn key_indices(table: &Table, keys: &[String], side: usize) -> Result<Vec<usize>> {
    keys.iter()
        .map(|k| {
            table.column_index(k).ok_or_else(|| CarrierError::MissingJoinKey {
                key: k.clone(),
                table: side,
            })
        })
        .collect()
}

/// Full key of a row, `None` if any key column is missing
fn row_key(row: &[Value], indices: &[usize]) -> Option<Vec<KeyPart>> {
    indices.iter().map(|&i| row[i].key_part()).collect()
}

/// Left columns then right value columns, colliding names suffixed on both sides
fn output_columns(left: &Table, right: &Table, keys: &[String], right_values: &[usize]) -> Vec<String> {
    let right_names: Vec<&String> = right_values.iter().map(|&i| &right.columns()[i]).collect();
    let collides = |name: &String| !keys.contains(name) && right_names.contains(&name) && left.has_column(name);

    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .map(|c| {
            if collides(c) {
                format!("{}{}", c, LEFT_SUFFIX)
            } else {
                c.clone()
            }
        })
        .collect();

    columns.extend(right_names.iter().map(|c| {
        if collides(*c) {
            format!("{}{}", c, RIGHT_SUFFIX)
        } else {
            (*c).clone()
        }
    }));

    columns
}

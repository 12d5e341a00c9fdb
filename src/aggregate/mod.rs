//! Result aggregation
//!
//! Combines the per-peer payloads of a completed task into one value.
//!
//! # Modes
//!
//! - **Union**: column-name lists flattened into a deduplicated set (schema discovery)
//! - **Join**: per-peer tables inner-joined on a key set (see `join`)
//!
//! Aggregation is all or nothing: a single payload of the wrong shape fails the call.

pub mod join;

use crate::client::Payload;
use crate::error::{CarrierError, Result};
use crate::table::Table;
use std::collections::BTreeSet;

pub use join::{common_columns, inner_join, join_tables};

/// Union of all peer-reported column names
pub fn union_column_names(payloads: &[Payload]) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();

    for (index, payload) in payloads.iter().enumerate() {
        match payload {
            Payload::ColumnNames(columns) => names.extend(columns.iter().cloned()),
            other => {
                return Err(CarrierError::UnexpectedPayload {
                    index,
                    expected: "column names",
                    found: other.kind(),
                })
            }
        }
    }

    Ok(names)
}

/// Unwrap table payloads, failing on any other shape
pub fn tables_from_payloads(payloads: Vec<Payload>) -> Result<Vec<Table>> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(index, payload)| match payload {
            Payload::Table(table) => Ok(table),
            other => Err(CarrierError::UnexpectedPayload {
                index,
                expected: "table",
                found: other.kind(),
            }),
        })
        .collect()
}

/// Join mode over raw payloads
///
/// `keys` empty means natural join.
pub fn join_results(payloads: Vec<Payload>, keys: &[String]) -> Result<Table> {
    join_tables(tables_from_payloads(payloads)?, keys)
}

/// Reject tables with fewer than `min` rows
pub fn ensure_min_rows(table: &Table, min: usize) -> Result<()> {
    if table.num_rows() < min {
        return Err(CarrierError::InsufficientData {
            rows: table.num_rows(),
            min,
        });
    }
    Ok(())
}

//! Node-side methods
//!
//! These are the computations a peer runs over its own local table when the master
//! dispatches a task to it. What they return is all the master ever sees of a peer's data.

use crate::client::Payload;
use crate::error::{CarrierError, Result};
use crate::table::Table;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Method name for schema discovery
pub const METHOD_COLUMN_NAMES: &str = "column_names";

/// Method name for fetching the local table
pub const METHOD_GET_DATA: &str = "get_data";

/// Methods a node knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMethod {
    /// List the names of the table columns
    ColumnNames,
    /// Return the local table
    GetData,
}

impl NodeMethod {
    pub fn name(&self) -> &'static str {
        match self {
            NodeMethod::ColumnNames => METHOD_COLUMN_NAMES,
            NodeMethod::GetData => METHOD_GET_DATA,
        }
    }

    /// Run the method over a node's local data
    pub fn run(&self, data: &Table) -> Payload {
        match self {
            NodeMethod::ColumnNames => {
                debug!("Retrieving column names");
                Payload::ColumnNames(data.columns().to_vec())
            }
            NodeMethod::GetData => {
                debug!(rows = data.num_rows(), "Returning local table");
                Payload::Table(data.clone())
            }
        }
    }
}

impl FromStr for NodeMethod {
    type Err = CarrierError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            METHOD_COLUMN_NAMES => Ok(NodeMethod::ColumnNames),
            METHOD_GET_DATA => Ok(NodeMethod::GetData),
            other => Err(CarrierError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for NodeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Dispatch a method by name
pub fn run_method(method: &str, data: &Table) -> Result<Payload> {
    Ok(method.parse::<NodeMethod>()?.run(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Table {
        Table::from_columns(vec![
            ("column1", vec![1.into(), 3.into()]),
            ("column2", vec![2.into(), 4.into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_column_names_returns_names() {
        let result = run_method("column_names", &data()).unwrap();
        assert_eq!(
            result,
            Payload::ColumnNames(vec!["column1".to_string(), "column2".to_string()])
        );
    }

    #[test]
    fn test_get_data_returns_table() {
        let result = run_method("get_data", &data()).unwrap();
        assert_eq!(result, Payload::Table(data()));
    }

    #[test]
    fn test_unknown_method() {
        assert!(matches!(
            run_method("drop_tables", &data()),
            Err(CarrierError::UnknownMethod(m)) if m == "drop_tables"
        ));
    }
}

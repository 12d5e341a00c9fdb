//! Identifier hashing
//!
//! Peers replace their personal identifiers with a salted SHA-512 digest before any
//! table leaves the node, so tables can still be joined on the digest column.
//!
//! # Example
//!
//! ```
//! use fedcarrier::encryption::salthash;
//!
//! let salt = "a".repeat(128);
//! let digest = salthash(&salt, "hash me please").unwrap();
//! assert_eq!(digest.len(), 88);
//! ```

use crate::error::{CarrierError, Result};
use crate::table::{Table, Value};
use base64::prelude::{Engine, BASE64_STANDARD};
use sha2::{Digest, Sha512};

/// Required salt length in characters
pub const SALT_LENGTH: usize = 128;

/// Column holding the hashed identifier
pub const ENCRYPTED_IDENTIFIER: &str = "encrypted_identifier";

/// Base64 of SHA-512 over `salt ++ input`
pub fn salthash(salt: &str, input: &str) -> Result<String> {
    let length = salt.chars().count();
    if length != SALT_LENGTH {
        return Err(CarrierError::InvalidSalt(length));
    }

    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hasher.update(input.as_bytes());
    Ok(BASE64_STANDARD.encode(hasher.finalize()))
}

/// Replace the identifier columns of `table` by one hashed identifier column
///
/// Each row's identifier values are concatenated in the order given, with all spaces
/// removed, then hashed with `salt`.
pub fn encrypt_identifiers(table: &Table, salt: &str, identifiers: &[String]) -> Result<Table> {
    let indices = identifiers
        .iter()
        .map(|name| {
            table.column_index(name).ok_or_else(|| CarrierError::MissingJoinKey {
                key: name.clone(),
                table: 0,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let hashed = table
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let mut joined = String::new();
            for (&i, name) in indices.iter().zip(identifiers) {
                if row[i].is_missing() {
                    return Err(CarrierError::NullIdentifierValue {
                        column: name.clone(),
                        row: row_index,
                    });
                }
                joined.push_str(&row[i].to_string());
            }
            joined.retain(|c| c != ' ');
            salthash(salt, &joined).map(Value::Text)
        })
        .collect::<Result<Vec<_>>>()?;

    table
        .drop_columns(identifiers)
        .with_column(ENCRYPTED_IDENTIFIER, hashed)
}

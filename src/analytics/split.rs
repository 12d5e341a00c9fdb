//! Seeded train/test split
//!
//! Row indices are shuffled with a seeded Xoshiro256++ generator so the same seed always
//! holds out the same rows. The first `ceil(n * test_fraction)` shuffled indices form
//! the held-out partition, the rest are used for fitting.

use crate::error::{CarrierError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Default share of rows held out for scoring
pub const DEFAULT_TEST_FRACTION: f64 = 1.0 / 3.0;

/// Disjoint row partitions of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split `n` row indices into train and test partitions
///
/// Both partitions must end up non-empty.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<Split> {
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(CarrierError::InsufficientData { rows: n, min: 2 });
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(Split {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(10, DEFAULT_TEST_FRACTION, 42).unwrap();
        assert_eq!(split.test.len(), 4);
        assert_eq!(split.train.len(), 6);
    }

    #[test]
    fn test_split_disjoint_and_complete() {
        let split = train_test_split(25, 0.2, 7).unwrap();

        let train: HashSet<_> = split.train.iter().copied().collect();
        let test: HashSet<_> = split.test.iter().copied().collect();

        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 25);
        assert!(train.union(&test).all(|&i| i < 25));
    }

    #[test]
    fn test_split_seeded() {
        // Same seed, same partitions
        let a = train_test_split(50, 0.3, 12345).unwrap();
        let b = train_test_split(50, 0.3, 12345).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_too_small() {
        assert!(matches!(
            train_test_split(1, 0.5, 1),
            Err(CarrierError::InsufficientData { rows: 1, .. })
        ));
        assert!(train_test_split(0, 0.5, 1).is_err());
        assert!(train_test_split(2, 0.5, 1).is_ok());
    }
}

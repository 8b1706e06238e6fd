//! Row splitters: stratified k-fold and (optionally stratified) train/test split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplitError {
    #[error("n_splits must be at least 2, got {0}")]
    InvalidSplits(usize),
    #[error("cannot split {n_samples} rows into {n_splits} folds")]
    TooFewSamples { n_samples: usize, n_splits: usize },
    #[error("n_splits={n_splits} is greater than the number of members in every class")]
    TooFewMembers { n_splits: usize },
    #[error("test_size must be in (0, 1), got {0}")]
    InvalidTestSize(f64),
    #[error("test_size={test_size} leaves an empty train or test set for {n_samples} rows")]
    EmptySplit { test_size: f64, n_samples: usize },
    #[error("class {class} has only {count} member; stratified split needs at least 2")]
    ClassTooSmall { class: u8, count: usize },
    #[error("stratify labels have {got} entries, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Row indices grouped by class value, classes in ascending order.
fn group_by_class(y: &[u8]) -> BTreeMap<u8, Vec<usize>> {
    let mut groups: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &class) in y.iter().enumerate() {
        groups.entry(class).or_default().push(i);
    }
    groups
}

/// K-fold splitter that keeps each class's share roughly equal across folds.
///
/// Members of every class are dealt round-robin onto the folds, continuing the
/// count from one class to the next so fold sizes differ by at most one.
/// With shuffling enabled, members are permuted per class by a seeded RNG first.
#[derive(Clone, Debug, PartialEq)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle_seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle_seed: None,
        }
    }

    /// Shuffle members within each class using `seed`.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// `(train, test)` index pairs, one per fold. Both lists are sorted.
    pub fn split(&self, y: &[u8]) -> Result<Vec<(Vec<usize>, Vec<usize>)>, SplitError> {
        let k = self.n_splits;
        if k < 2 {
            return Err(SplitError::InvalidSplits(k));
        }
        if y.len() < k {
            return Err(SplitError::TooFewSamples {
                n_samples: y.len(),
                n_splits: k,
            });
        }

        let mut groups = group_by_class(y);
        if groups.values().all(|members| members.len() < k) {
            return Err(SplitError::TooFewMembers { n_splits: k });
        }
        if let Some((class, members)) = groups.iter().find(|(_, m)| m.len() < k) {
            warn!(
                class,
                members = members.len(),
                n_splits = k,
                "least populated class has fewer members than folds"
            );
        }

        let mut rng = self.shuffle_seed.map(StdRng::seed_from_u64);
        let mut fold_of = vec![0usize; y.len()];
        let mut counter = 0usize;
        for members in groups.values_mut() {
            if let Some(rng) = rng.as_mut() {
                members.shuffle(rng);
            }
            for &row in members.iter() {
                fold_of[row] = counter % k;
                counter += 1;
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..y.len()).partition(|&row| fold_of[row] == fold);
                (train, test)
            })
            .collect())
    }
}

/// Splits `n_samples` rows into `(train, test)` index lists, both sorted.
///
/// The test set holds `ceil(test_size * n_samples)` rows. With `stratify`, each
/// class contributes to the test set in proportion to its size (largest
/// remainder rounding) and every class must have at least two members.
pub fn train_test_split(
    n_samples: usize,
    test_size: f64,
    seed: u64,
    stratify: Option<&[u8]>,
) -> Result<(Vec<usize>, Vec<usize>), SplitError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SplitError::InvalidTestSize(test_size));
    }
    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(SplitError::EmptySplit {
            test_size,
            n_samples,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut test = match stratify {
        None => {
            let mut order: Vec<usize> = (0..n_samples).collect();
            order.shuffle(&mut rng);
            order.truncate(n_test);
            order
        }
        Some(y) => {
            if y.len() != n_samples {
                return Err(SplitError::LengthMismatch {
                    expected: n_samples,
                    got: y.len(),
                });
            }
            stratified_test_rows(y, n_test, &mut rng)?
        }
    };
    test.sort_unstable();

    let mut in_test = vec![false; n_samples];
    for &row in &test {
        in_test[row] = true;
    }
    let train = (0..n_samples).filter(|&row| !in_test[row]).collect();
    Ok((train, test))
}

fn stratified_test_rows(
    y: &[u8],
    n_test: usize,
    rng: &mut StdRng,
) -> Result<Vec<usize>, SplitError> {
    let mut groups = group_by_class(y);
    if let Some((&class, members)) = groups.iter().find(|(_, m)| m.len() < 2) {
        return Err(SplitError::ClassTooSmall {
            class,
            count: members.len(),
        });
    }

    let n = y.len() as f64;
    let quotas: Vec<f64> = groups
        .values()
        .map(|m| n_test as f64 * m.len() as f64 / n)
        .collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let mut remaining = n_test.saturating_sub(counts.iter().sum());

    // Largest fractional remainder first; ties go to the smaller class value.
    let mut by_remainder: Vec<usize> = (0..quotas.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &i in by_remainder.iter().cycle().take(by_remainder.len() * 2) {
        if remaining == 0 {
            break;
        }
        let size = groups.values().nth(i).map_or(0, Vec::len);
        if counts[i] + 1 < size {
            counts[i] += 1;
            remaining -= 1;
        }
    }

    let mut test = Vec::with_capacity(n_test);
    for (members, &count) in groups.values_mut().zip(&counts) {
        members.shuffle(rng);
        // keep one member of every class in the training rows
        test.extend(members.iter().take(count.min(members.len() - 1)));
    }
    Ok(test)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<u8> {
        // 12 negatives, 8 positives
        (0..20).map(|i| u8::from(i % 5 < 2)).collect()
    }

    #[test]
    fn test_kfold_partitions_every_row_once() {
        let y = labels();
        let folds = StratifiedKFold::new(5).split(&y).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0; y.len()];
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), y.len());
            for &row in test {
                seen[row] += 1;
                assert!(!train.contains(&row));
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_kfold_keeps_class_balance() {
        let y = labels();
        for (_, test) in StratifiedKFold::new(4).with_shuffle(42).split(&y).unwrap() {
            let positives = test.iter().filter(|&&row| y[row] == 1).count();
            assert_eq!(test.len(), 5);
            assert_eq!(positives, 2);
        }
    }

    #[test]
    fn test_kfold_shuffle_is_seeded() {
        let y = labels();
        let a = StratifiedKFold::new(5).with_shuffle(42).split(&y).unwrap();
        let b = StratifiedKFold::new(5).with_shuffle(42).split(&y).unwrap();
        let plain = StratifiedKFold::new(5).split(&y).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, plain);
    }

    #[test]
    fn test_kfold_errors() {
        assert_eq!(
            StratifiedKFold::new(1).split(&[0, 1]),
            Err(SplitError::InvalidSplits(1))
        );
        assert_eq!(
            StratifiedKFold::new(5).split(&[0, 1, 0]),
            Err(SplitError::TooFewSamples {
                n_samples: 3,
                n_splits: 5
            })
        );
        assert_eq!(
            StratifiedKFold::new(3).split(&[0, 0, 1, 1]),
            Err(SplitError::TooFewMembers { n_splits: 3 })
        );
    }

    #[test]
    fn test_train_test_split_sizes() {
        let (train, test) = train_test_split(21, 0.2, 42, None).unwrap();
        assert_eq!(test.len(), 5);
        assert_eq!(train.len(), 16);
        assert!(test.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_train_test_split_stratified() {
        let y = labels();
        let (train, test) = train_test_split(y.len(), 0.2, 42, Some(&y)).unwrap();
        assert_eq!(test.len(), 4);
        assert_eq!(train.len(), 16);
        let test_pos = test.iter().filter(|&&row| y[row] == 1).count();
        assert_eq!(test_pos, 2);

        let again = train_test_split(y.len(), 0.2, 42, Some(&y)).unwrap();
        assert_eq!(again, (train, test));
    }

    #[test]
    fn test_train_test_split_errors() {
        assert_eq!(
            train_test_split(10, 1.5, 42, None),
            Err(SplitError::InvalidTestSize(1.5))
        );
        assert_eq!(
            train_test_split(4, 0.2, 42, Some(&[0, 0, 0, 1])),
            Err(SplitError::ClassTooSmall { class: 1, count: 1 })
        );
        assert!(matches!(
            train_test_split(3, 0.2, 42, Some(&[0, 1])),
            Err(SplitError::LengthMismatch { .. })
        ));
    }
}

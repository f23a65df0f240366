use std::collections::{BTreeMap, BTreeSet};

use crate::error::SplitKind;

/// Label universe and per-split label counts.
///
/// Derived from the label arrays and never persisted; rebuild it with
/// [`LabelStatistics::compute`] whenever a split's labels change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelStatistics {
    /// Distinct labels of the train split.
    pub unique_labels: BTreeSet<u8>,
    pub train_counts: BTreeMap<u8, usize>,
    pub test_counts: BTreeMap<u8, usize>,
    /// Smallest per-label count in train; the balanced reduction ceiling.
    pub min_train_count: usize,
    pub min_test_count: usize,
}

impl LabelStatistics {
    /// Tally `train` and `test` against the train label universe.
    ///
    /// A universe label that never occurs in `test` counts as zero there.
    /// Test labels outside the universe are not tallied.
    pub fn compute(train: &[u8], test: &[u8]) -> Self {
        let unique_labels: BTreeSet<u8> = train.iter().copied().collect();
        let train_counts = tally(&unique_labels, train);
        let test_counts = tally(&unique_labels, test);

        Self {
            min_train_count: min_count(&train_counts),
            min_test_count: min_count(&test_counts),
            unique_labels,
            train_counts,
            test_counts,
        }
    }

    pub fn num_labels(&self) -> usize {
        self.unique_labels.len()
    }

    pub fn counts(&self, split: SplitKind) -> &BTreeMap<u8, usize> {
        match split {
            SplitKind::Train => &self.train_counts,
            SplitKind::Test => &self.test_counts,
        }
    }

    pub fn min_count(&self, split: SplitKind) -> usize {
        match split {
            SplitKind::Train => self.min_train_count,
            SplitKind::Test => self.min_test_count,
        }
    }
}

fn tally(universe: &BTreeSet<u8>, labels: &[u8]) -> BTreeMap<u8, usize> {
    let mut counts: BTreeMap<u8, usize> = universe.iter().map(|&l| (l, 0)).collect();
    for label in labels {
        if let Some(c) = counts.get_mut(label) {
            *c += 1;
        }
    }
    counts
}

fn min_count(counts: &BTreeMap<u8, usize>) -> usize {
    counts.values().copied().min().unwrap_or(0)
}

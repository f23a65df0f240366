use std::collections::{BTreeMap, BTreeSet};

use super::labels::LabelStatistics;
use super::model::Split;
use crate::error::{Error, Result, SplitKind};

// ---------------------------------------------------------------------------
// Selection: which sample indices survive a reduction
// ---------------------------------------------------------------------------

/// Indices of the first `per_label` occurrences of every label in `universe`.
///
/// Scans in order and keeps a running counter per label; a sample is kept
/// while its label's counter is below the quota. Labels outside the
/// universe are never kept. Original relative order is preserved.
pub fn balanced_indices(labels: &[u8], universe: &BTreeSet<u8>, per_label: usize) -> Vec<usize> {
    let mut taken: BTreeMap<u8, usize> = universe.iter().map(|&l| (l, 0)).collect();
    let mut keep = Vec::with_capacity(per_label * universe.len());

    for (i, label) in labels.iter().enumerate() {
        if keep.len() == per_label * universe.len() {
            break;
        }
        if let Some(count) = taken.get_mut(label) {
            if *count < per_label {
                *count += 1;
                keep.push(i);
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Reduction of a single split
// ---------------------------------------------------------------------------

/// Check `target` against the limit for `split` without touching any data.
///
/// Balanced targets are a per-label quota capped by the split's smallest
/// label count; unbalanced targets are a prefix length capped by the
/// split's size.
pub fn validate_target(
    split: &Split,
    kind: SplitKind,
    stats: &LabelStatistics,
    target: usize,
    balanced: bool,
) -> Result<()> {
    let limit = if balanced {
        stats.min_count(kind)
    } else {
        split.len()
    };
    if target > limit {
        return Err(Error::SelectionRange {
            split: kind,
            requested: target,
            limit,
            balanced,
        });
    }
    Ok(())
}

/// Reduce `split` to `target` samples (or `target` per label when `balanced`).
///
/// Returns a new split and leaves the input untouched. A zero target
/// always yields an empty split.
pub fn reduce(
    split: &Split,
    kind: SplitKind,
    stats: &LabelStatistics,
    target: usize,
    balanced: bool,
) -> Result<Split> {
    validate_target(split, kind, stats, target, balanced)?;

    if target == 0 {
        return Ok(Split::empty_like(split));
    }

    let keep: Vec<usize> = if balanced {
        balanced_indices(split.labels(), &stats.unique_labels, target)
    } else {
        (0..target).collect()
    };

    log::debug!(
        "reduced {kind} split from {} to {} samples (balanced: {balanced})",
        split.len(),
        keep.len()
    );
    Ok(split.select(&keep))
}

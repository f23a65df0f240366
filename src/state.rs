use crate::data::labels::LabelStatistics;
use crate::data::model::{Dataset, Dimensionality, Split};
use crate::data::reduce::{reduce, validate_target};
use crate::data::shuffle::{shuffle, ShuffleSeeds};
use crate::error::{Error, Result, SplitKind};

// ---------------------------------------------------------------------------
// Dataset state
// ---------------------------------------------------------------------------

/// The loaded splits together with their derived label statistics.
///
/// Shared by every dataset type; the statistics are rebuilt whenever the
/// splits are replaced, so they always describe the held labels.
#[derive(Debug, Clone, Default)]
pub struct DatasetState {
    /// Loaded dataset (None until fetched or loaded).
    dataset: Option<Dataset>,

    /// Label universe and counts for `dataset`.
    stats: LabelStatistics,
}

impl DatasetState {
    /// Ingest a dataset and recompute label statistics.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.stats = LabelStatistics::compute(dataset.train.labels(), dataset.test.labels());
        log::debug!(
            "dataset holds {} train / {} test samples over {} labels",
            dataset.train.len(),
            dataset.test.len(),
            self.stats.num_labels()
        );
        self.dataset = Some(dataset);
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn require(&self) -> Result<&Dataset> {
        self.dataset.as_ref().ok_or(Error::NoData)
    }

    pub fn stats(&self) -> &LabelStatistics {
        &self.stats
    }

    pub fn split(&self, kind: SplitKind) -> Option<&Split> {
        self.dataset.as_ref().map(|d| d.split(kind))
    }

    /// Reduce both splits. Both targets are validated first, so on error
    /// nothing changes.
    pub fn reduce(&mut self, n_train: usize, n_test: usize, balanced: bool) -> Result<()> {
        let dataset = self.require()?;
        validate_target(&dataset.train, SplitKind::Train, &self.stats, n_train, balanced)?;
        validate_target(&dataset.test, SplitKind::Test, &self.stats, n_test, balanced)?;

        let train = reduce(&dataset.train, SplitKind::Train, &self.stats, n_train, balanced)?;
        let test = reduce(&dataset.test, SplitKind::Test, &self.stats, n_test, balanced)?;
        self.set_dataset(Dataset::new(train, test));
        Ok(())
    }

    /// Shuffle each split with its own seed.
    pub fn shuffle(&mut self, seeds: ShuffleSeeds) -> Result<()> {
        let dataset = self.require()?;
        let shuffled = Dataset::new(
            shuffle(&dataset.train, seeds.train),
            shuffle(&dataset.test, seeds.test),
        );
        // Permutations leave label counts untouched.
        self.dataset = Some(shuffled);
        Ok(())
    }

    /// Present the held samples at `dims`.
    pub fn reshape(&mut self, dims: Dimensionality) {
        if let Some(dataset) = self.dataset.take() {
            self.dataset = Some(dataset.reshaped(dims));
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, SplitKind};

// ---------------------------------------------------------------------------
// Dimensionality – how each sample is presented
// ---------------------------------------------------------------------------

/// Sample dimensionality: flattened rows×cols vector, or a rows×cols grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimensionality {
    One,
    Two,
}

impl Dimensionality {
    /// Both representations, in the order snapshots are written.
    pub const ALL: [Dimensionality; 2] = [Dimensionality::One, Dimensionality::Two];

    pub fn as_u8(self) -> u8 {
        match self {
            Dimensionality::One => 1,
            Dimensionality::Two => 2,
        }
    }

    /// The other representation.
    pub fn other(self) -> Self {
        match self {
            Dimensionality::One => Dimensionality::Two,
            Dimensionality::Two => Dimensionality::One,
        }
    }
}

impl TryFrom<u8> for Dimensionality {
    type Error = Error;

    fn try_from(ndims: u8) -> Result<Self> {
        match ndims {
            1 => Ok(Dimensionality::One),
            2 => Ok(Dimensionality::Two),
            other => Err(Error::InvalidDimension(other)),
        }
    }
}

impl fmt::Display for Dimensionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.as_u8())
    }
}

// ---------------------------------------------------------------------------
// Samples – fixed-shape u8 records stored contiguously
// ---------------------------------------------------------------------------

/// An ordered sequence of equally shaped `u8` records.
///
/// The bytes live in one row-major buffer. A 2-D view is a pure reshape of
/// the 1-D view, so switching representation never copies pixel data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Samples {
    rows: usize,
    cols: usize,
    dims: Dimensionality,
    data: Vec<u8>,
}

impl Samples {
    /// Wrap a row-major buffer holding `data.len() / (rows * cols)` samples.
    ///
    /// A trailing partial sample is dropped.
    pub fn new(rows: usize, cols: usize, dims: Dimensionality, mut data: Vec<u8>) -> Self {
        let width = rows * cols;
        if width == 0 {
            data.clear();
        } else {
            data.truncate(data.len() - data.len() % width);
        }
        Self {
            rows,
            cols,
            dims,
            data,
        }
    }

    /// An empty sample array keeping the given shape.
    pub fn empty(rows: usize, cols: usize, dims: Dimensionality) -> Self {
        Self::new(rows, cols, dims, Vec::new())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dims(&self) -> Dimensionality {
        self.dims
    }

    /// Number of values in one sample.
    pub fn width(&self) -> usize {
        self.rows * self.cols
    }

    /// Shape of one sample: `[rows * cols]` or `[rows, cols]`.
    pub fn sample_shape(&self) -> Vec<usize> {
        match self.dims {
            Dimensionality::One => vec![self.width()],
            Dimensionality::Two => vec![self.rows, self.cols],
        }
    }

    pub fn len(&self) -> usize {
        if self.width() == 0 {
            0
        } else {
            self.data.len() / self.width()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw row-major buffer for all samples.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Flattened values of sample `index`.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        let width = self.width();
        let start = index.checked_mul(width)?;
        self.data.get(start..start + width)
    }

    /// Row `row` of sample `index`, meaningful in either representation.
    pub fn row(&self, index: usize, row: usize) -> Option<&[u8]> {
        if row >= self.rows {
            return None;
        }
        let sample = self.get(index)?;
        Some(&sample[row * self.cols..(row + 1) * self.cols])
    }

    /// All rows of sample `index` as separate slices.
    pub fn grid(&self, index: usize) -> Option<Vec<&[u8]>> {
        let sample = self.get(index)?;
        if self.cols == 0 {
            return Some(Vec::new());
        }
        Some(sample.chunks_exact(self.cols).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        // `chunks_exact(0)` panics, and a zero-width array holds no samples.
        self.data.chunks_exact(self.width().max(1)).take(self.len())
    }

    /// Same bytes, presented at another dimensionality.
    pub fn reshaped(mut self, dims: Dimensionality) -> Self {
        self.dims = dims;
        self
    }

    /// New sample array holding the samples at `indices`, in that order.
    pub fn gather(&self, indices: &[usize]) -> Self {
        let width = self.width();
        let mut data = Vec::with_capacity(indices.len() * width);
        for &i in indices {
            data.extend_from_slice(&self.data[i * width..(i + 1) * width]);
        }
        Self {
            rows: self.rows,
            cols: self.cols,
            dims: self.dims,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Split – aligned samples and labels
// ---------------------------------------------------------------------------

/// One partition of a dataset. `labels[i]` describes `samples[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    samples: Samples,
    labels: Vec<u8>,
}

impl Split {
    /// Pair samples with labels, failing if their lengths disagree.
    pub fn new(samples: Samples, labels: Vec<u8>) -> Result<Self> {
        if samples.len() != labels.len() {
            return Err(Error::Misaligned {
                images: samples.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { samples, labels })
    }

    /// A split with no samples that keeps the sample shape of `like`.
    pub fn empty_like(like: &Split) -> Self {
        let s = &like.samples;
        Self {
            samples: Samples::empty(s.rows(), s.cols(), s.dims()),
            labels: Vec::new(),
        }
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(sample, label)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u8)> + '_ {
        self.samples.iter().zip(self.labels.iter().copied())
    }

    /// Apply the same index selection to samples and labels.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            samples: self.samples.gather(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    pub fn reshaped(self, dims: Dimensionality) -> Self {
        Self {
            samples: self.samples.reshaped(dims),
            labels: self.labels,
        }
    }

    pub fn into_parts(self) -> (Samples, Vec<u8>) {
        (self.samples, self.labels)
    }
}

// ---------------------------------------------------------------------------
// Dataset – train and test splits together
// ---------------------------------------------------------------------------

/// A full dataset: exactly one train split and one test split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub train: Split,
    pub test: Split,
}

impl Dataset {
    pub fn new(train: Split, test: Split) -> Self {
        Self { train, test }
    }

    pub fn split(&self, kind: SplitKind) -> &Split {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Test => &self.test,
        }
    }

    /// Dimensionality of the held samples.
    pub fn dims(&self) -> Dimensionality {
        self.train.samples().dims()
    }

    pub fn reshaped(self, dims: Dimensionality) -> Self {
        Self {
            train: self.train.reshaped(dims),
            test: self.test.reshaped(dims),
        }
    }
}

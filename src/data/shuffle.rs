use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::model::Split;

/// Seeds for shuffling the train and test splits independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleSeeds {
    pub train: u64,
    pub test: u64,
}

impl ShuffleSeeds {
    pub fn new(train: u64, test: u64) -> Self {
        Self { train, test }
    }

    /// Derive both seeds from one: train uses `seed` itself, test uses the
    /// first value a ChaCha8 generator seeded with `seed` produces.
    pub fn derive(seed: u64) -> Self {
        let test = ChaCha8Rng::seed_from_u64(seed).next_u64();
        Self { train: seed, test }
    }

    /// Fresh seeds from OS entropy.
    pub fn from_entropy() -> Self {
        Self::derive(rand::random())
    }
}

/// A seeded permutation of `0..len`, identical on every platform.
pub fn permutation(len: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// Shuffle samples and labels of `split` with one joint permutation.
pub fn shuffle(split: &Split, seed: u64) -> Split {
    split.select(&permutation(split.len(), seed))
}

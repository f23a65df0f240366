//! Fetch, parse, cache and reshape the MNIST handwritten digit dataset.
//!
//! ```no_run
//! use rusty_digits::{CsvOptions, LabeledDataset, Mnist};
//!
//! let mut mnist = Mnist::new(1, Some(42))?;
//! mnist.fetch(false)?;
//! mnist.reduce_dataset(100, 20, true)?;
//! mnist.shuffle()?;
//! mnist.dump_csv("mnist_data".as_ref(), CsvOptions::default())?;
//! mnist.save("1d_100")?;
//! # Ok::<(), rusty_digits::Error>(())
//! ```
//!
//! Everything runs synchronously on the calling thread. Two processes
//! working on the same storage root at once are not coordinated.

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod fetch;
pub mod mnist;
pub mod state;

pub use config::StorageConfig;
pub use data::export::CsvOptions;
pub use data::labels::LabelStatistics;
pub use data::model::{Dataset, Dimensionality, Samples, Split};
pub use data::shuffle::ShuffleSeeds;
pub use error::{Error, Result, SplitKind};
pub use mnist::{LabeledDataset, Mnist};

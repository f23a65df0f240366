use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rusty_digits::cache::FetchOptions;
use rusty_digits::fetch::HttpDownloader;
use rusty_digits::{CsvOptions, LabeledDataset, Mnist, SplitKind, StorageConfig};

#[derive(Parser)]
#[command(version, about = "Fetch, cache and export the MNIST dataset", long_about = None)]
struct Cli {
    /// Storage root (overrides RUSTY_DIGITS_HOME and ~/.rusty_digits.json)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the raw archives and build the base snapshots
    Fetch {
        #[arg(long, default_value_t = 1)]
        dims: u8,
        /// Delete cached archives and snapshots first
        #[arg(long)]
        refetch: bool,
        /// Extract the downloaded archives
        #[arg(long)]
        extract: bool,
        /// Keep archives after extracting them
        #[arg(long)]
        keep_archive: bool,
        #[arg(long)]
        quiet: bool,
    },
    /// Reduce, shuffle and write a dataset to disk
    Export {
        #[arg(long, default_value_t = 1)]
        dims: u8,
        /// Load this saved dataset instead of the base snapshot
        #[arg(long)]
        from: Option<String>,
        /// Training samples to keep (per label when balanced)
        #[arg(long)]
        n_train: Option<usize>,
        /// Test samples to keep (per label when balanced)
        #[arg(long)]
        n_test: Option<usize>,
        /// Plain truncation instead of a label-balanced reduction
        #[arg(long)]
        unbalanced: bool,
        /// Shuffle after reducing
        #[arg(long)]
        shuffle: bool,
        #[arg(long)]
        seed: Option<u64>,
        /// Directory for train.csv / test.csv (1D only)
        #[arg(long)]
        csv_dir: Option<PathBuf>,
        #[arg(long)]
        no_header: bool,
        /// Write both splits to this snapshot blob
        #[arg(long)]
        blob: Option<PathBuf>,
        /// Save the result as a named user snapshot
        #[arg(long)]
        save: Option<String>,
    },
    /// List saved datasets
    Saves,
}

fn open(data_dir: &Option<PathBuf>, dims: u8, seed: Option<u64>, verbose: bool) -> Result<Mnist> {
    let storage = match data_dir {
        Some(dir) => StorageConfig::new(dir),
        None => StorageConfig::load().context("resolving storage root")?,
    };
    log::debug!("storage root: {}", storage.base_dir.display());
    Ok(Mnist::with_storage(
        dims,
        seed,
        &storage,
        Box::new(HttpDownloader::new(verbose).context("setting up downloads")?),
    )?)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Fetch {
            dims,
            refetch,
            extract,
            keep_archive,
            quiet,
        } => {
            let mut mnist = open(&cli.data_dir, dims, None, !quiet)?;
            mnist
                .fetch_with(FetchOptions {
                    refetch,
                    extract,
                    keep_archive,
                })
                .context("fetching MNIST")?;
            let stats = mnist.label_stats();
            println!(
                "{} labels; smallest class has {} train / {} test samples",
                stats.num_labels(),
                stats.min_train_count,
                stats.min_test_count
            );
        }
        Commands::Export {
            dims,
            from,
            n_train,
            n_test,
            unbalanced,
            shuffle,
            seed,
            csv_dir,
            no_header,
            blob,
            save,
        } => {
            let mut mnist = open(&cli.data_dir, dims, seed, false)?;
            mnist
                .load(from.as_deref())
                .with_context(|| format!("loading {}", from.as_deref().unwrap_or("base snapshot")))?;

            if n_train.is_some() || n_test.is_some() {
                let balanced = !unbalanced;
                // An omitted target keeps as much of that split as allowed.
                let limit = |kind: SplitKind| {
                    if balanced {
                        mnist.label_stats().min_count(kind)
                    } else {
                        mnist.dataset().map_or(0, |d| d.split(kind).len())
                    }
                };
                let n_train = n_train.unwrap_or_else(|| limit(SplitKind::Train));
                let n_test = n_test.unwrap_or_else(|| limit(SplitKind::Test));
                mnist
                    .reduce_dataset(n_train, n_test, balanced)
                    .context("reducing dataset")?;
            }
            if shuffle {
                mnist.shuffle()?;
            }
            if let Some(dir) = csv_dir {
                let options = CsvOptions {
                    header: !no_header,
                    ..CsvOptions::default()
                };
                mnist
                    .dump_csv(&dir, options)
                    .with_context(|| format!("writing CSV to {}", dir.display()))?;
            }
            if let Some(path) = blob {
                mnist
                    .dump_blob(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            if let Some(name) = save {
                let path = mnist.save(&name)?;
                println!("saved {name} to {}", path.display());
            }
        }
        Commands::Saves => {
            let mnist = open(&cli.data_dir, 1, None, false)?;
            for name in mnist.user_saves()? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

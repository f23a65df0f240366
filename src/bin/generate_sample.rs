//! Writes a small synthetic MNIST-shaped archive set into a `raw/` tier so
//! the cache can be exercised without network access.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rusty_digits::cache::{ensure_dir, CacheLayout};
use rusty_digits::data::idx::{encode_images, encode_labels};
use rusty_digits::mnist::{raw_files, DATASET_NAME};
use rusty_digits::{Dimensionality, Samples, StorageConfig};

#[derive(Parser)]
#[command(about = "Generate synthetic MNIST archives", long_about = None)]
struct Args {
    /// Storage root to populate (defaults to the configured one)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 600)]
    n_train: usize,
    #[arg(long, default_value_t = 100)]
    n_test: usize,
    #[arg(long, default_value_t = 28)]
    side: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// A blocky "digit": a filled square whose position depends on the label,
/// plus light noise.
fn render(label: u8, side: usize, rng: &mut ChaCha8Rng) -> Vec<u8> {
    let block = (side / 4).max(1);
    let x0 = (label as usize % 5) * (side - block) / 4;
    let y0 = (label as usize / 5) * (side - block) / 2;

    let mut pixels = vec![0u8; side * side];
    for (i, px) in pixels.iter_mut().enumerate() {
        let (r, c) = (i / side, i % side);
        let inside = (y0..y0 + block).contains(&r) && (x0..x0 + block).contains(&c);
        *px = if inside {
            rng.gen_range(200..=255)
        } else {
            rng.gen_range(0..16)
        };
    }
    pixels
}

fn generate(n: usize, side: usize, rng: &mut ChaCha8Rng) -> (Samples, Vec<u8>) {
    let mut data = Vec::with_capacity(n * side * side);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        // Round-robin labels keep every class equally represented.
        let label = (i % 10) as u8;
        data.extend(render(label, side, rng));
        labels.push(label);
    }
    (Samples::new(side, side, Dimensionality::One, data), labels)
}

fn write_gz(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    enc.finish()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let storage = match args.data_dir {
        Some(dir) => StorageConfig::new(dir),
        None => StorageConfig::load()?,
    };
    let raw_dir = CacheLayout::new(&storage, DATASET_NAME).raw_dir();
    ensure_dir(&raw_dir)?;

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let (train_x, train_y) = generate(args.n_train, args.side, &mut rng);
    let (test_x, test_y) = generate(args.n_test, args.side, &mut rng);

    let files = raw_files();
    write_gz(&raw_dir.join(&files.train_images.file_name), &encode_images(&train_x))?;
    write_gz(&raw_dir.join(&files.train_labels.file_name), &encode_labels(&train_y))?;
    write_gz(&raw_dir.join(&files.test_images.file_name), &encode_images(&test_x))?;
    write_gz(&raw_dir.join(&files.test_labels.file_name), &encode_labels(&test_y))?;

    println!(
        "Wrote {} train / {} test samples ({}x{}) to {}",
        args.n_train,
        args.n_test,
        args.side,
        args.side,
        raw_dir.display()
    );
    Ok(())
}

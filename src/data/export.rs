use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use super::model::{Dataset, Dimensionality, Samples, Split};
use crate::cache::layout::write_replacing;
use crate::error::{Error, IoContext, Result};

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Options for writing a split as CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Emit a `label,pixel_0,...,pixel_{N-1}` header row.
    pub header: bool,
    /// Write the split this many times in a row, to mimic several epochs.
    pub repeats: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            header: true,
            repeats: 1,
        }
    }
}

/// Header row for samples of `width` values.
pub fn csv_header(width: usize) -> Vec<String> {
    std::iter::once("label".to_string())
        .chain((0..width).map(|i| format!("pixel_{i}")))
        .collect()
}

/// Write `split` to `path`, one `label,v_0,...,v_{N-1}` row per sample.
///
/// Only flattened (1-D) samples can be written.
pub fn write_csv(path: &Path, split: &Split, options: CsvOptions) -> Result<()> {
    if split.samples().dims() != Dimensionality::One {
        return Err(Error::UnsupportedShape);
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    if options.header {
        writer.write_record(csv_header(split.samples().width()))?;
    }

    let mut record = csv::StringRecord::new();
    for _ in 0..options.repeats {
        for (sample, label) in split.iter() {
            record.clear();
            record.push_field(&label.to_string());
            for value in sample {
                record.push_field(&value.to_string());
            }
            writer.write_record(&record)?;
        }
    }

    writer.flush().with_io_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Read a CSV written by [`write_csv`] back into a 1-D split.
///
/// The CSV carries no grid shape, so samples come back as `1 x N`.
pub fn load_csv(path: &Path, has_header: bool) -> Result<Split> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .from_path(path)?;

    let mut data = Vec::new();
    let mut labels = Vec::new();
    let mut width = 0;

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let mut values = record.iter().enumerate().map(|(column, field)| {
            field.trim().parse::<u8>().map_err(|_| Error::CsvValue {
                row: row_no,
                column,
                value: field.to_string(),
            })
        });

        match values.next() {
            Some(label) => labels.push(label?),
            None => continue,
        }
        for value in values {
            data.push(value?);
        }
        width = record.len() - 1;
    }

    let samples = Samples::new(1, width, Dimensionality::One, data);
    Split::new(samples, labels)
}

// ---------------------------------------------------------------------------
// Snapshot blob
// ---------------------------------------------------------------------------

/// Encode a dataset as `[[train_x, train_y], [test_x, test_y]]`.
pub fn write_blob<W: Write>(writer: W, dataset: &Dataset) -> Result<()> {
    let layout = [
        (dataset.train.samples(), dataset.train.labels()),
        (dataset.test.samples(), dataset.test.labels()),
    ];
    bincode::serialize_into(writer, &layout)?;
    Ok(())
}

/// Decode a dataset written by [`write_blob`], re-checking alignment.
pub fn read_blob<R: std::io::Read>(reader: R) -> Result<Dataset> {
    let [(train_x, train_y), (test_x, test_y)]: [(Samples, Vec<u8>); 2] =
        bincode::deserialize_from(reader)?;
    Ok(Dataset::new(
        Split::new(train_x, train_y)?,
        Split::new(test_x, test_y)?,
    ))
}

/// Write a snapshot blob to `path`, replacing any existing file.
///
/// `path` only ever holds a complete blob: a failed write leaves the
/// previous file, or none.
pub fn dump_blob(path: &Path, dataset: &Dataset) -> Result<()> {
    write_replacing(path, |writer| write_blob(writer, dataset))
}

/// Read a snapshot blob from `path`.
pub fn load_blob(path: &Path) -> Result<Dataset> {
    let file = File::open(path).with_io_context(|| format!("opening {}", path.display()))?;
    read_blob(BufReader::new(file))
}

//! Decoder for the IDX binary layout used by the MNIST archives.
//!
//! ```text
//! images: [magic=2051][count][rows][cols][count*rows*cols x u8]
//! labels: [magic=2049][count][count x u8]
//! ```
//!
//! Header fields are big-endian `u32`. Decoding works on bytes the caller
//! has already read; `origin` is only used to label errors.

use std::path::Path;

use super::model::{Dimensionality, Samples, Split};
use crate::error::{Error, Result};

/// Magic number leading every image file.
pub const IMAGES_MAGIC: u32 = 2051;
/// Magic number leading every label file.
pub const LABELS_MAGIC: u32 = 2049;

/// Decoded image file plus the header values it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImages {
    pub samples: Samples,
    pub rows: usize,
    pub cols: usize,
    pub count: usize,
}

/// Read `N` big-endian `u32` fields from the front of `bytes`.
fn read_header<const N: usize>(bytes: &[u8], origin: &Path) -> Result<[u32; N]> {
    let needed = N * 4;
    if bytes.len() < needed {
        return Err(Error::Truncated {
            path: origin.to_path_buf(),
            expected: needed,
            actual: bytes.len(),
        });
    }
    let mut fields = [0u32; N];
    for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
        *field = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(fields)
}

fn check_magic(origin: &Path, expected: u32, actual: u32) -> Result<()> {
    if actual != expected {
        return Err(Error::Format {
            path: origin.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Take exactly `len` payload bytes following a header of `offset` bytes.
fn payload<'a>(bytes: &'a [u8], offset: usize, len: usize, origin: &Path) -> Result<&'a [u8]> {
    let available = bytes.len() - offset;
    if available < len {
        return Err(Error::Truncated {
            path: origin.to_path_buf(),
            expected: offset.saturating_add(len),
            actual: bytes.len(),
        });
    }
    Ok(&bytes[offset..offset + len])
}

/// Decode an image file expecting the standard magic number.
pub fn decode_images(bytes: &[u8], origin: &Path, dims: Dimensionality) -> Result<DecodedImages> {
    decode_images_with_magic(bytes, origin, dims, IMAGES_MAGIC)
}

/// Decode an image file, validating the leading magic number against `expected_magic`.
///
/// Trailing bytes beyond `count * rows * cols` are ignored.
pub fn decode_images_with_magic(
    bytes: &[u8],
    origin: &Path,
    dims: Dimensionality,
    expected_magic: u32,
) -> Result<DecodedImages> {
    let [magic, count, rows, cols] = read_header::<4>(bytes, origin)?;
    check_magic(origin, expected_magic, magic)?;

    let (count, rows, cols) = (count as usize, rows as usize, cols as usize);
    // A header whose product overflows can never be backed by a payload.
    let len = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| Error::Truncated {
            path: origin.to_path_buf(),
            expected: usize::MAX,
            actual: bytes.len(),
        })?;
    let pixels = payload(bytes, 16, len, origin)?;

    Ok(DecodedImages {
        samples: Samples::new(rows, cols, dims, pixels.to_vec()),
        rows,
        cols,
        count,
    })
}

/// Decode a label file expecting the standard magic number.
pub fn decode_labels(bytes: &[u8], origin: &Path) -> Result<Vec<u8>> {
    decode_labels_with_magic(bytes, origin, LABELS_MAGIC)
}

/// Decode a label file, validating the leading magic number against `expected_magic`.
pub fn decode_labels_with_magic(bytes: &[u8], origin: &Path, expected_magic: u32) -> Result<Vec<u8>> {
    let [magic, count] = read_header::<2>(bytes, origin)?;
    check_magic(origin, expected_magic, magic)?;
    Ok(payload(bytes, 8, count as usize, origin)?.to_vec())
}

/// Decode a matching image/label file pair into one aligned split.
pub fn decode_split(
    images: (&[u8], &Path),
    labels: (&[u8], &Path),
    dims: Dimensionality,
) -> Result<Split> {
    let decoded = decode_images(images.0, images.1, dims)?;
    let labels = decode_labels(labels.0, labels.1)?;
    log::debug!(
        "decoded {} images of {}x{} from {}",
        decoded.count,
        decoded.rows,
        decoded.cols,
        images.1.display()
    );
    Split::new(decoded.samples, labels)
}

/// Encode samples back into an IDX image file (used to build fixtures and sample data).
pub fn encode_images(samples: &Samples) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + samples.as_bytes().len());
    for field in [
        IMAGES_MAGIC,
        samples.len() as u32,
        samples.rows() as u32,
        samples.cols() as u32,
    ] {
        out.extend_from_slice(&field.to_be_bytes());
    }
    out.extend_from_slice(samples.as_bytes());
    out
}

/// Encode labels back into an IDX label file.
pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + labels.len());
    out.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}

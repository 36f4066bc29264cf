//! Loader for the IDX image and label files of the MNIST distribution.
//!
//! Both files start with a big endian header:
//! * images: magic `0x0803`, count, rows, columns, then `count * rows * columns` bytes.
//! * labels: magic `0x0801`, count, then `count` bytes.

use std::{
    error::Error,
    fmt::{self, Display},
    fs, io,
    path::Path,
};

use super::Dataset;

const IMAGE_MAGIC: u32 = 0x0803;
const LABEL_MAGIC: u32 = 0x0801;

const MAGIC_SIZE: usize = 4;
const IMAGE_HEADER_SIZE: usize = 16;
const LABEL_HEADER_SIZE: usize = 8;

/// The error type for loading MNIST files.
#[derive(Debug)]
pub enum MnistErr {
    Io(io::Error),
    InvalidMagic {
        file: &'static str,
        expected: u32,
        got: u32,
    },
    Truncated {
        file: &'static str,
        got: usize,
        expected: usize,
    },
    CountMismatch {
        images: usize,
        labels: usize,
    },
    EmptyImage {
        rows: usize,
        cols: usize,
    },
    Oversized {
        count: usize,
        rows: usize,
        cols: usize,
    },
}

impl Display for MnistErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MnistErr::Io(e) => write!(f, "io error: {e}"),
            MnistErr::InvalidMagic {
                file,
                expected,
                got,
            } => write!(
                f,
                "invalid magic number in {file} file, expected {expected:#06x} got {got:#06x}"
            ),
            MnistErr::Truncated {
                file,
                got,
                expected,
            } => write!(
                f,
                "truncated {file} file, got {got} bytes and expected {expected}"
            ),
            MnistErr::CountMismatch { images, labels } => write!(
                f,
                "the image file holds {images} samples but the label file holds {labels}"
            ),
            MnistErr::EmptyImage { rows, cols } => {
                write!(f, "images of {rows}x{cols} pixels hold no data")
            }
            MnistErr::Oversized { count, rows, cols } => write!(
                f,
                "the image header describes {count} images of {rows}x{cols} pixels, too many to address"
            ),
        }
    }
}

impl Error for MnistErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MnistErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MnistErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Reads an image file and its label file into a `Dataset`.
///
/// # Arguments
/// * `images` - The path to the IDX image file.
/// * `labels` - The path to the IDX label file.
///
/// # Returns
/// The loaded dataset or the first problem found in either file.
pub fn load<P, Q>(images: P, labels: Q) -> Result<Dataset, MnistErr>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let images = fs::read(images)?;
    let labels = fs::read(labels)?;
    parse(&images, &labels)
}

/// Parses the raw contents of an image file and its label file.
pub fn parse(images: &[u8], labels: &[u8]) -> Result<Dataset, MnistErr> {
    let (count, image_size, pixels) = parse_images(images)?;
    let (label_count, labels) = parse_labels(labels)?;

    if count != label_count {
        return Err(MnistErr::CountMismatch {
            images: count,
            labels: label_count,
        });
    }

    // SAFETY: The pixel count was checked against the header and images aren't empty.
    Ok(Dataset::new(image_size, pixels.to_vec(), labels.to_vec()).unwrap())
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn check_len(file: &'static str, buf: &[u8], expected: usize) -> Result<(), MnistErr> {
    if buf.len() < expected {
        return Err(MnistErr::Truncated {
            file,
            got: buf.len(),
            expected,
        });
    }

    Ok(())
}

/// Checks the leading magic number, the first thing a swapped or foreign file gets wrong.
fn check_magic(file: &'static str, buf: &[u8], expected: u32) -> Result<(), MnistErr> {
    check_len(file, buf, MAGIC_SIZE)?;

    let got = read_u32(buf, 0);
    if got != expected {
        return Err(MnistErr::InvalidMagic {
            file,
            expected,
            got,
        });
    }

    Ok(())
}

fn parse_images(buf: &[u8]) -> Result<(usize, usize, &[u8]), MnistErr> {
    const FILE: &str = "image";

    check_magic(FILE, buf, IMAGE_MAGIC)?;
    check_len(FILE, buf, IMAGE_HEADER_SIZE)?;

    let count = read_u32(buf, 4) as usize;
    let rows = read_u32(buf, 8) as usize;
    let cols = read_u32(buf, 12) as usize;
    let oversized = || MnistErr::Oversized { count, rows, cols };

    let image_size = rows.checked_mul(cols).ok_or_else(oversized)?;
    if image_size == 0 {
        return Err(MnistErr::EmptyImage { rows, cols });
    }

    let end = count
        .checked_mul(image_size)
        .and_then(|len| len.checked_add(IMAGE_HEADER_SIZE))
        .ok_or_else(oversized)?;
    check_len(FILE, buf, end)?;

    Ok((count, image_size, &buf[IMAGE_HEADER_SIZE..end]))
}

fn parse_labels(buf: &[u8]) -> Result<(usize, &[u8]), MnistErr> {
    const FILE: &str = "label";

    check_magic(FILE, buf, LABEL_MAGIC)?;
    check_len(FILE, buf, LABEL_HEADER_SIZE)?;

    let count = read_u32(buf, 4) as usize;
    let end = LABEL_HEADER_SIZE.saturating_add(count);
    check_len(FILE, buf, end)?;

    Ok((count, &buf[LABEL_HEADER_SIZE..end]))
}

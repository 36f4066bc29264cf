use std::ops::Range;

use crate::{MlErr, Result};

/// The class of a single sample.
pub type Label = u8;

/// An owned set of images with one label each.
///
/// Pixels are kept as raw bytes in row major order, one image after the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    image_size: usize,
    pixels: Vec<u8>,
    labels: Vec<Label>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `image_size` - The amount of pixels per image.
    /// * `pixels` - Every image, one after the other.
    /// * `labels` - The label of each image.
    ///
    /// # Returns
    /// An error if the amount of pixels doesn't match `labels.len() * image_size`.
    pub fn new(image_size: usize, pixels: Vec<u8>, labels: Vec<Label>) -> Result<Self> {
        if image_size == 0 {
            return Err(MlErr::SizeMismatch {
                what: "image size",
                got: 0,
                expected: 1,
            });
        }

        let expected = labels.len() * image_size;
        if pixels.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "dataset pixels",
                got: pixels.len(),
                expected,
            });
        }

        Ok(Self {
            image_size,
            pixels,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    pub fn image(&self, i: usize) -> &[u8] {
        self.as_batch().image(i)
    }

    pub fn label(&self, i: usize) -> Label {
        self.labels[i]
    }

    /// Makes sure every label is a valid class index for a model with `labels` classes.
    pub fn check_labels(&self, labels: usize) -> Result<()> {
        match self
            .labels
            .iter()
            .enumerate()
            .find(|&(_, &label)| label as usize >= labels)
        {
            Some((index, &label)) => Err(MlErr::LabelOutOfRange {
                index,
                label,
                labels,
            }),
            None => Ok(()),
        }
    }

    /// A view over the whole dataset.
    pub fn as_batch(&self) -> Batch<'_> {
        Batch {
            offset: 0,
            image_size: self.image_size,
            pixels: &self.pixels,
            labels: &self.labels,
        }
    }

    /// A view over at most `len` samples starting at `offset`.
    ///
    /// The view is clamped to the end of the dataset and empty if `offset` is past it.
    pub fn batch(&self, offset: usize, len: usize) -> Batch<'_> {
        let start = offset.min(self.len());
        let end = offset.saturating_add(len).min(self.len());
        self.view(start..end)
    }

    /// A view over the samples in `range`.
    ///
    /// # Panics
    /// If `range` is out of bounds.
    pub fn view(&self, range: Range<usize>) -> Batch<'_> {
        self.as_batch().slice(range)
    }
}

/// A borrowed contiguous run of samples of a `Dataset`.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    offset: usize,
    image_size: usize,
    pixels: &'a [u8],
    labels: &'a [Label],
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The index of this batch's first sample in its dataset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    pub fn image(&self, i: usize) -> &'a [u8] {
        let start = i * self.image_size;
        &self.pixels[start..start + self.image_size]
    }

    pub fn label(&self, i: usize) -> Label {
        self.labels[i]
    }

    /// Iterates over every `(image, label)` pair in order.
    pub fn iter(self) -> impl Iterator<Item = (&'a [u8], Label)> + 'a {
        self.pixels
            .chunks_exact(self.image_size)
            .zip(self.labels.iter().copied())
    }

    /// A sub view over the samples in `range`, relative to this batch.
    ///
    /// # Panics
    /// If `range` is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Batch<'a> {
        let pixels = &self.pixels[range.start * self.image_size..range.end * self.image_size];

        Batch {
            offset: self.offset + range.start,
            image_size: self.image_size,
            pixels,
            labels: &self.labels[range],
        }
    }

    /// Copies the samples of this view into a new `Dataset`.
    pub fn to_dataset(&self) -> Dataset {
        Dataset {
            image_size: self.image_size,
            pixels: self.pixels.to_vec(),
            labels: self.labels.to_vec(),
        }
    }
}

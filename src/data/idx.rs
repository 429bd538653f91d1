//! Readers for the IDX binary format used by MNIST and its derivatives
//! (Fashion-MNIST, EMNIST, …).
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-3:   magic 0x00000803 (big-endian u32: uint8 data, 3 dimensions)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-3:   magic 0x00000801 (big-endian u32: uint8 data, 1 dimension)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index
//! ```
use std::path::Path;

use tracing::info;

use crate::error::{NetworkError, Result};

pub const IMAGE_MAGIC: u32 = 0x0000_0803;
pub const LABEL_MAGIC: u32 = 0x0000_0801;

/// Decoded image file. Every image is `rows * cols` pixels scaled to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdxImages {
    pub rows: usize,
    pub cols: usize,
    pub images: Vec<Vec<f64>>,
}

/// Images paired with their labels, ready for training.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub inputs: Vec<Vec<f64>>,
    /// One-hot encoding of `labels`.
    pub targets: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Keeps only the first `n` examples.
    pub fn truncate(&mut self, n: usize) {
        self.inputs.truncate(n);
        self.targets.truncate(n);
        self.labels.truncate(n);
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn dataset_error(msg: String) -> NetworkError {
    NetworkError::Dataset(msg)
}

pub fn parse_idx_images(bytes: &[u8]) -> Result<IdxImages> {
    if bytes.len() < 16 {
        return Err(dataset_error(format!(
            "IDX image file too short: expected at least 16 header bytes, got {}.",
            bytes.len()
        )));
    }
    let magic = read_u32(bytes, 0);
    if magic != IMAGE_MAGIC {
        return Err(dataset_error(format!(
            "IDX image file magic number mismatch: expected {:#010x}, got {:#010x}.",
            IMAGE_MAGIC, magic
        )));
    }

    let n_items = read_u32(bytes, 4) as usize;
    let rows = read_u32(bytes, 8) as usize;
    let cols = read_u32(bytes, 12) as usize;

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        dataset_error(format!("IDX image file: rows * cols overflows usize (rows={}, cols={}).", rows, cols))
    })?;
    let data_len = n_items.checked_mul(n_pixels).ok_or_else(|| {
        dataset_error(format!(
            "IDX image file: n_items * n_pixels overflows usize (n_items={}, n_pixels={}).",
            n_items, n_pixels
        ))
    })?;
    if bytes.len() - 16 < data_len {
        return Err(dataset_error(format!(
            "IDX image file too short: header declares {} items of {}×{} pixels \
             ({} data bytes needed after header), but file is only {} bytes total.",
            n_items, rows, cols, data_len, bytes.len()
        )));
    }
    if n_pixels == 0 && n_items > 0 {
        return Err(dataset_error("IDX image file declares zero-sized images.".to_owned()));
    }

    let images = bytes[16..16 + data_len]
        .chunks_exact(n_pixels.max(1))
        .map(|chunk| chunk.iter().map(|&px| px as f64 / 255.0).collect())
        .collect();

    Ok(IdxImages { rows, cols, images })
}

pub fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < 8 {
        return Err(dataset_error(format!(
            "IDX label file too short: expected at least 8 header bytes, got {}.",
            bytes.len()
        )));
    }
    let magic = read_u32(bytes, 0);
    if magic != LABEL_MAGIC {
        return Err(dataset_error(format!(
            "IDX label file magic number mismatch: expected {:#010x}, got {:#010x}.",
            LABEL_MAGIC, magic
        )));
    }

    let n_items = read_u32(bytes, 4) as usize;
    if bytes.len() - 8 < n_items {
        return Err(dataset_error(format!(
            "IDX label file too short: header declares {} labels but file is only {} bytes.",
            n_items, bytes.len()
        )));
    }
    Ok(bytes[8..8 + n_items].to_vec())
}

/// Pairs decoded images with labels, one-hot encoding each label into
/// `n_classes` entries.
pub fn build_dataset(images: IdxImages, labels: Vec<u8>, n_classes: usize) -> Result<Dataset> {
    if images.images.len() != labels.len() {
        return Err(dataset_error(format!(
            "IDX file mismatch: image file declares {} items but label file declares {}.",
            images.images.len(), labels.len()
        )));
    }
    let targets = labels
        .iter()
        .enumerate()
        .map(|(i, &class)| {
            one_hot(class as usize, n_classes).ok_or_else(|| {
                dataset_error(format!(
                    "IDX label at index {}: class index {} is out of range for n_classes={}.",
                    i, class, n_classes
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Dataset { inputs: images.images, targets, labels })
}

/// Reads an image file and a label file from disk into a `Dataset`.
pub fn load_idx_pair<P, Q>(images_path: P, labels_path: Q, n_classes: usize) -> Result<Dataset>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let images = parse_idx_images(&std::fs::read(images_path.as_ref())?)?;
    let labels = parse_idx_labels(&std::fs::read(labels_path.as_ref())?)?;
    info!(
        images = %images_path.as_ref().display(),
        count = images.images.len(),
        rows = images.rows,
        cols = images.cols,
        "loaded IDX dataset"
    );
    build_dataset(images, labels, n_classes)
}

/// Vector of `n_classes` zeros with a 1 at `class`, or `None` if `class` is
/// out of range.
pub fn one_hot(class: usize, n_classes: usize) -> Option<Vec<f64>> {
    if class >= n_classes {
        return None;
    }
    let mut v = vec![0.0; n_classes];
    v[class] = 1.0;
    Some(v)
}

/// Index of the maximum element in a slice. The first index wins ties;
/// an empty slice gives 0.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &x)| match best {
            Some((_, b)) if b >= x => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_file(count: u32, rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&count.to_be_bytes());
        bytes.extend_from_slice(&rows.to_be_bytes());
        bytes.extend_from_slice(&cols.to_be_bytes());
        bytes.extend_from_slice(pixels);
        bytes
    }

    fn label_file(labels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        bytes.extend_from_slice(labels);
        bytes
    }

    #[test]
    fn parses_and_normalizes_images() {
        let parsed = parse_idx_images(&image_file(2, 1, 2, &[0, 255, 51, 102])).unwrap();
        assert_eq!((parsed.rows, parsed.cols), (1, 2));
        assert_eq!(parsed.images, vec![vec![0.0, 1.0], vec![0.2, 0.4]]);
    }

    #[test]
    fn rejects_wrong_magic_and_truncated_data() {
        let mut bytes = image_file(1, 2, 2, &[1, 2, 3, 4]);
        assert!(parse_idx_images(&bytes[..10]).is_err());
        assert!(parse_idx_images(&bytes[..19]).is_err());
        bytes[3] = 0x01;
        assert!(matches!(parse_idx_images(&bytes), Err(NetworkError::Dataset(_))));
        assert!(parse_idx_labels(&image_file(1, 1, 1, &[0])).is_err());
        let labels = label_file(&[1, 2, 3]);
        assert!(parse_idx_labels(&labels[..10]).is_err());
    }

    #[test]
    fn builds_one_hot_targets() {
        let images = parse_idx_images(&image_file(2, 1, 1, &[0, 255])).unwrap();
        let labels = parse_idx_labels(&label_file(&[2, 0])).unwrap();
        let dataset = build_dataset(images, labels, 3).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.targets, vec![vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0]]);
    }

    #[test]
    fn build_rejects_count_mismatch_and_out_of_range_labels() {
        let images = parse_idx_images(&image_file(2, 1, 1, &[0, 255])).unwrap();
        assert!(build_dataset(images.clone(), vec![0], 10).is_err());
        assert!(build_dataset(images, vec![0, 10], 10).is_err());
    }

    #[test]
    fn load_pair_reads_files() {
        let dir = std::env::temp_dir();
        let id = std::process::id();
        let images_path = dir.join(format!("ffnn-idx-images-{}", id));
        let labels_path = dir.join(format!("ffnn-idx-labels-{}", id));
        std::fs::write(&images_path, image_file(1, 2, 2, &[0, 0, 255, 0])).unwrap();
        std::fs::write(&labels_path, label_file(&[7])).unwrap();

        let mut dataset = load_idx_pair(&images_path, &labels_path, 10).unwrap();
        std::fs::remove_file(&images_path).unwrap();
        std::fs::remove_file(&labels_path).unwrap();

        assert_eq!(dataset.inputs[0], vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(argmax(&dataset.targets[0]), 7);
        dataset.truncate(0);
        assert!(dataset.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_idx_pair("/nonexistent/images", "/nonexistent/labels", 10).unwrap_err();
        assert!(matches!(err, NetworkError::Io(_)));
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9, 0.2]), 1);
        assert_eq!(argmax(&[-3.0]), 0);
        assert_eq!(argmax(&[]), 0);
        assert_eq!(one_hot(3, 3), None);
    }
}

//! Labeled image datasets
//!
//! Reads the IDX files MNIST and Fashion-MNIST ship in (plain or gzipped), or generates a
//! small synthetic image set that needs no download. Pixels are scaled to `[0, 1]` on load
//! and then normalized with statistics fitted on the training split.

use std::{
    fmt::{self, Display},
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use flate2::read::GzDecoder;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;
const IMAGES_HEADER_LEN: usize = 16;
const LABELS_HEADER_LEN: usize = 8;

/// Side length of the generated synthetic images
pub const SYNTHETIC_SIDE: usize = 12;
const SYNTHETIC_CLASSES: usize = 10;

const FASHION_MNIST_CLASSES: [&str; 10] = [
    "T-shirt/top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle boot",
];

/// Errors while reading or assembling a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{path}' starts with magic {found:#010x}, expected {expected:#010x}")]
    BadMagic {
        path: PathBuf,
        expected: u32,
        found: u32,
    },
    #[error("'{path}' is truncated: expected {expected} bytes, got {got}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        got: usize,
    },
    #[error("found {images} images but {labels} labels")]
    CountMismatch { images: usize, labels: usize },
    #[error("image {index} has {got} pixels, expected {expected}")]
    PixelCountMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
    #[error("label {label} is out of range for {num_classes} classes")]
    LabelOutOfRange { label: usize, num_classes: usize },
    #[error("no '{name}' (plain or .gz) in '{dir}'")]
    MissingFile { dir: PathBuf, name: String },
    #[error("'{path}' declares {height}x{width} images")]
    ZeroSizedImages {
        path: PathBuf,
        width: usize,
        height: usize,
    },
    #[error("test images are {test_width}x{test_height}, train images are {train_width}x{train_height}")]
    SplitSizeMismatch {
        train_width: usize,
        train_height: usize,
        test_width: usize,
        test_height: usize,
    },
    #[error("dataset is empty")]
    Empty,
}

/// Toggles between the supported datasets
#[derive(Debug, ValueEnum, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    Mnist,
    FashionMnist,
    Synthetic,
}

impl Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Mnist => write!(f, "mnist"),
            DatasetKind::FashionMnist => write!(f, "fashion-mnist"),
            DatasetKind::Synthetic => write!(f, "synthetic"),
        }
    }
}

impl DatasetKind {
    /// Human readable name for every class index
    pub fn class_names(&self) -> Vec<String> {
        match self {
            DatasetKind::Mnist => (0..10).map(|d| d.to_string()).collect(),
            DatasetKind::FashionMnist => FASHION_MNIST_CLASSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            DatasetKind::Synthetic => (0..SYNTHETIC_CLASSES)
                .map(|k| format!("class {k}"))
                .collect(),
        }
    }
}

/// Which half of an IDX dataset to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn file_prefix(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "t10k",
        }
    }
}

/// A single labeled image, pixels stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
    pub label: usize,
}

/// A collection of same-sized labeled images
#[derive(Debug, Clone)]
pub struct ImageSet {
    pub width: usize,
    pub height: usize,
    pub class_names: Vec<String>,
    pub items: Vec<ImageItem>,
}

impl ImageSet {
    /// Builds a set, checking every image has `width * height` pixels and a known label
    pub fn new(
        width: usize,
        height: usize,
        class_names: Vec<String>,
        items: Vec<ImageItem>,
    ) -> Result<Self, DatasetError> {
        let expected = width * height;
        let num_classes = class_names.len();
        for (index, item) in items.iter().enumerate() {
            if item.pixels.len() != expected {
                return Err(DatasetError::PixelCountMismatch {
                    index,
                    expected,
                    got: item.pixels.len(),
                });
            }
            if item.label >= num_classes {
                return Err(DatasetError::LabelOutOfRange {
                    label: item.label,
                    num_classes,
                });
            }
        }
        Ok(Self {
            width,
            height,
            class_names,
            items,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of input features a flattened image provides
    pub fn input_size(&self) -> usize {
        self.width * self.height
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Keeps at most `n` images
    pub fn truncate(&mut self, n: usize) {
        self.items.truncate(n);
    }
}

/// Per-pixel standardization, `(x - mean) / std`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: f32,
    pub std: f32,
}

impl Normalization {
    const MIN_STD: f32 = 1e-6;

    /// Fits mean and (population) standard deviation over every pixel of the set
    pub fn fit(set: &ImageSet) -> Self {
        let n = set.items.iter().map(|i| i.pixels.len()).sum::<usize>();
        if n == 0 {
            return Self {
                mean: 0.0,
                std: 1.0,
            };
        }
        // accumulate in f64, 60k * 784 f32 additions lose digits otherwise
        let pixels = || set.items.iter().flat_map(|i| i.pixels.iter().copied());
        let mean = pixels().map(f64::from).sum::<f64>() / n as f64;
        let var = pixels()
            .map(|p| (f64::from(p) - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        Self {
            mean: mean as f32,
            std: (var.sqrt() as f32).max(Self::MIN_STD),
        }
    }

    pub fn apply(&self, set: &mut ImageSet) {
        for item in set.items.iter_mut() {
            for p in item.pixels.iter_mut() {
                *p = (*p - self.mean) / self.std;
            }
        }
    }
}

/// Raw images parsed from an IDX3 file
#[derive(Debug, Clone)]
pub struct IdxImages {
    pub width: usize,
    pub height: usize,
    pub images: Vec<Vec<u8>>,
}

/// Options controlling `load_dataset`
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Directory holding the four IDX files (ignored for the synthetic set)
    pub data_dir: PathBuf,
    /// Keep only the first `n` training images
    pub train_limit: Option<usize>,
    /// Training images per class for the synthetic set
    pub synthetic_per_class: usize,
    pub seed: u64,
}

/// Loads `(train, test)` splits, both normalized with statistics fitted on train
pub fn load_dataset(
    kind: DatasetKind,
    options: &LoadOptions,
) -> Result<(ImageSet, ImageSet, Normalization), DatasetError> {
    let (mut train, mut test) = match kind {
        DatasetKind::Mnist | DatasetKind::FashionMnist => (
            load_split(&options.data_dir, Split::Train, kind)?,
            load_split(&options.data_dir, Split::Test, kind)?,
        ),
        DatasetKind::Synthetic => {
            let n = options.synthetic_per_class;
            (
                generate_synthetic(n, SYNTHETIC_CLASSES, SYNTHETIC_SIDE, options.seed),
                generate_synthetic(
                    (n / 5).max(1),
                    SYNTHETIC_CLASSES,
                    SYNTHETIC_SIDE,
                    options.seed.wrapping_add(1),
                ),
            )
        }
    };
    if let Some(limit) = options.train_limit {
        train.truncate(limit);
    }
    if train.is_empty() {
        return Err(DatasetError::Empty);
    }
    if (test.width, test.height) != (train.width, train.height) {
        return Err(DatasetError::SplitSizeMismatch {
            train_width: train.width,
            train_height: train.height,
            test_width: test.width,
            test_height: test.height,
        });
    }

    let normalization = Normalization::fit(&train);
    normalization.apply(&mut train);
    normalization.apply(&mut test);
    log::info!(
        "Loaded {}: {} train / {} test images of {}x{}, normalized with mean {:.4} std {:.4}",
        kind,
        train.len(),
        test.len(),
        train.width,
        train.height,
        normalization.mean,
        normalization.std
    );
    Ok((train, test, normalization))
}

/// Reads one split of an IDX dataset from `dir` using the standard file names,
/// pixels scaled to `[0, 1]`
pub fn load_split(dir: &Path, split: Split, kind: DatasetKind) -> Result<ImageSet, DatasetError> {
    let prefix = split.file_prefix();
    let images_path = find_idx_file(dir, &format!("{prefix}-images-idx3-ubyte"))?;
    let labels_path = find_idx_file(dir, &format!("{prefix}-labels-idx1-ubyte"))?;

    let images = load_idx_images(&images_path)?;
    let labels = load_idx_labels(&labels_path)?;
    if images.images.len() != labels.len() {
        return Err(DatasetError::CountMismatch {
            images: images.images.len(),
            labels: labels.len(),
        });
    }

    let items = images
        .images
        .into_iter()
        .zip(labels)
        .map(|(pixels, label)| ImageItem {
            pixels: pixels.into_iter().map(|p| f32::from(p) / 255.0).collect(),
            label: label as usize,
        })
        .collect();
    ImageSet::new(images.width, images.height, kind.class_names(), items)
}

fn find_idx_file(dir: &Path, name: &str) -> Result<PathBuf, DatasetError> {
    let plain = dir.join(name);
    if plain.is_file() {
        return Ok(plain);
    }
    let gz = dir.join(format!("{name}.gz"));
    if gz.is_file() {
        return Ok(gz);
    }
    Err(DatasetError::MissingFile {
        dir: dir.to_path_buf(),
        name: name.to_string(),
    })
}

/// Reads a whole file, inflating it when the name ends in `.gz`
fn read_maybe_gz(path: &Path) -> Result<Vec<u8>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(file).read_to_end(&mut bytes).map_err(io_err)?;
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes).map_err(io_err)?;
    }
    Ok(bytes)
}

fn read_u32_be(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_be_bytes(buf)
}

fn check_header(
    path: &Path,
    bytes: &[u8],
    header_len: usize,
    magic: u32,
) -> Result<(), DatasetError> {
    if bytes.len() < header_len {
        return Err(DatasetError::Truncated {
            path: path.to_path_buf(),
            expected: header_len,
            got: bytes.len(),
        });
    }
    let found = read_u32_be(bytes, 0);
    if found != magic {
        return Err(DatasetError::BadMagic {
            path: path.to_path_buf(),
            expected: magic,
            found,
        });
    }
    Ok(())
}

/// Parses an IDX3 image file (magic `0x00000803`)
pub fn load_idx_images(path: &Path) -> Result<IdxImages, DatasetError> {
    let bytes = read_maybe_gz(path)?;
    check_header(path, &bytes, IMAGES_HEADER_LEN, IMAGES_MAGIC)?;

    let count = read_u32_be(&bytes, 4) as usize;
    let height = read_u32_be(&bytes, 8) as usize;
    let width = read_u32_be(&bytes, 12) as usize;
    if width == 0 || height == 0 {
        return Err(DatasetError::ZeroSizedImages {
            path: path.to_path_buf(),
            width,
            height,
        });
    }
    let truncated = |expected| DatasetError::Truncated {
        path: path.to_path_buf(),
        expected,
        got: bytes.len(),
    };
    // header fields are untrusted, an overflowing size can never be satisfied
    let image_len = width.checked_mul(height).ok_or(truncated(usize::MAX))?;
    let expected = count
        .checked_mul(image_len)
        .and_then(|n| n.checked_add(IMAGES_HEADER_LEN))
        .ok_or(truncated(usize::MAX))?;
    if bytes.len() < expected {
        return Err(truncated(expected));
    }

    let images = bytes[IMAGES_HEADER_LEN..expected]
        .chunks_exact(image_len)
        .map(|c| c.to_vec())
        .collect();
    log::debug!("Read {} images of {}x{} from '{}'", count, width, height, path.display());
    Ok(IdxImages {
        width,
        height,
        images,
    })
}

/// Parses an IDX1 label file (magic `0x00000801`)
pub fn load_idx_labels(path: &Path) -> Result<Vec<u8>, DatasetError> {
    let bytes = read_maybe_gz(path)?;
    check_header(path, &bytes, LABELS_HEADER_LEN, LABELS_MAGIC)?;

    let count = read_u32_be(&bytes, 4) as usize;
    let expected = LABELS_HEADER_LEN + count;
    if bytes.len() < expected {
        return Err(DatasetError::Truncated {
            path: path.to_path_buf(),
            expected,
            got: bytes.len(),
        });
    }
    Ok(bytes[LABELS_HEADER_LEN..expected].to_vec())
}

/// Generates `side x side` images where each class lights one distinct bar.
///
/// Even classes get a horizontal bar, odd classes a vertical one, so the classes are
/// linearly separable but not trivially so once noise is added. Labels cycle through the
/// classes, so truncating the set keeps it balanced. Deterministic for a given `seed`.
pub fn generate_synthetic(
    n_per_class: usize,
    num_classes: usize,
    side: usize,
    seed: u64,
) -> ImageSet {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let noise = Normal::new(0.0f32, 0.1).unwrap();

    let bars = num_classes.div_ceil(2).max(1);
    let stride = (side / bars).max(1);
    let mut items = Vec::with_capacity(n_per_class * num_classes);

    for i in 0..n_per_class * num_classes {
        let label = i % num_classes;
        let position = ((label / 2) * stride + stride / 2) % side.max(1);
        // jitter the bar brightness a little per image
        let brightness = rng.random_range(0.7f32..1.0);
        let pixels = (0..side * side)
            .map(|idx| {
                let (row, col) = (idx / side, idx % side);
                let on_bar = if label % 2 == 0 {
                    row == position
                } else {
                    col == position
                };
                let base = if on_bar { brightness } else { 0.0 };
                (base + noise.sample(&mut rng)).clamp(0.0, 1.0)
            })
            .collect();
        items.push(ImageItem { pixels, label });
    }

    let class_names = (0..num_classes).map(|k| format!("class {k}")).collect();
    ImageSet {
        width: side,
        height: side,
        class_names,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_eq_float;
    use std::io::Write;

    use flate2::{Compression, write::GzEncoder};
    use tempfile::tempdir;

    fn idx_images(images: &[Vec<u8>], rows: u32, cols: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&(images.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&rows.to_be_bytes());
        bytes.extend_from_slice(&cols.to_be_bytes());
        for image in images {
            bytes.extend_from_slice(image);
        }
        bytes
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        bytes.extend_from_slice(labels);
        bytes
    }

    fn write_gz(path: &Path, bytes: &[u8]) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_load_idx_images() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let path = dir.join("images");
        let images = vec![vec![0, 255, 3, 4, 5, 6], vec![7, 8, 9, 10, 11, 12]];
        std::fs::write(&path, idx_images(&images, 2, 3)).unwrap();

        let parsed = load_idx_images(&path).unwrap();
        assert_eq!(parsed.width, 3);
        assert_eq!(parsed.height, 2);
        assert_eq!(parsed.images, images);
    }

    #[test]
    fn test_load_idx_gz() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let path = dir.join("labels.gz");
        write_gz(&path, &idx_labels(&[3, 1, 4, 1, 5]));

        assert_eq!(load_idx_labels(&path).unwrap(), vec![3, 1, 4, 1, 5]);
    }

    #[test]
    fn test_idx_errors() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();

        // labels file handed to the image parser
        let labels = dir.join("labels");
        std::fs::write(&labels, idx_labels(&[1, 2])).unwrap();
        assert!(matches!(
            load_idx_images(&labels),
            Err(DatasetError::Truncated { expected: 16, got: 10, .. })
        ));
        let mut wrong_magic = idx_images(&[vec![1; 4]], 2, 2);
        wrong_magic[3] = 0x01;
        let path = dir.join("wrong_magic");
        std::fs::write(&path, wrong_magic).unwrap();
        assert!(matches!(
            load_idx_images(&path),
            Err(DatasetError::BadMagic {
                expected: IMAGES_MAGIC,
                found: LABELS_MAGIC,
                ..
            })
        ));

        // header claims 3 labels, only 2 present
        let mut short = idx_labels(&[1, 2]);
        short[7] = 3;
        let path = dir.join("short");
        std::fs::write(&path, short).unwrap();
        assert!(matches!(
            load_idx_labels(&path),
            Err(DatasetError::Truncated { expected: 11, got: 10, .. })
        ));

        assert!(matches!(
            load_idx_labels(&dir.join("missing")),
            Err(DatasetError::Io { .. })
        ));
    }

    #[test]
    fn test_idx_header_sizes() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();

        // count, rows and cols all at u32::MAX
        let mut huge = idx_images(&[], u32::MAX, u32::MAX);
        huge[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        let path = dir.join("huge");
        std::fs::write(&path, huge).unwrap();
        assert!(matches!(
            load_idx_images(&path),
            Err(DatasetError::Truncated { got: 16, .. })
        ));

        let mut zero = idx_images(&[], 0, 28);
        zero[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        let path = dir.join("zero");
        std::fs::write(&path, zero).unwrap();
        assert!(matches!(
            load_idx_images(&path),
            Err(DatasetError::ZeroSizedImages {
                width: 28,
                height: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_load_dataset_split_sizes_differ() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(
            dir.join("train-images-idx3-ubyte"),
            idx_images(&[vec![0; 4], vec![9; 4]], 2, 2),
        )
        .unwrap();
        std::fs::write(dir.join("train-labels-idx1-ubyte"), idx_labels(&[0, 1])).unwrap();
        std::fs::write(
            dir.join("t10k-images-idx3-ubyte"),
            idx_images(&[vec![0; 9]], 3, 3),
        )
        .unwrap();
        std::fs::write(dir.join("t10k-labels-idx1-ubyte"), idx_labels(&[1])).unwrap();

        let options = LoadOptions {
            data_dir: dir.to_path_buf(),
            train_limit: None,
            synthetic_per_class: 0,
            seed: 0,
        };
        assert!(matches!(
            load_dataset(DatasetKind::Mnist, &options),
            Err(DatasetError::SplitSizeMismatch {
                train_width: 2,
                test_width: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_load_split() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let images = vec![vec![0, 255, 51, 102], vec![255, 255, 0, 0]];
        std::fs::write(
            dir.join("t10k-images-idx3-ubyte"),
            idx_images(&images, 2, 2),
        )
        .unwrap();
        write_gz(&dir.join("t10k-labels-idx1-ubyte.gz"), &idx_labels(&[7, 2]));

        let set = load_split(&dir, Split::Test, DatasetKind::Mnist).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.input_size(), 4);
        assert_eq!(set.num_classes(), 10);
        assert_eq!(set.items[0].label, 7);
        assert_eq!(set.items[1].label, 2);
        assert_eq_float!(set.items[0].pixels[1], 1.0);
        assert_eq_float!(set.items[0].pixels[2], 0.2);

        assert!(matches!(
            load_split(&dir, Split::Train, DatasetKind::Mnist),
            Err(DatasetError::MissingFile { .. })
        ));
    }

    #[test]
    fn test_load_split_count_mismatch() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(
            dir.join("train-images-idx3-ubyte"),
            idx_images(&[vec![0; 4], vec![1; 4]], 2, 2),
        )
        .unwrap();
        std::fs::write(dir.join("train-labels-idx1-ubyte"), idx_labels(&[1])).unwrap();

        assert!(matches!(
            load_split(&dir, Split::Train, DatasetKind::FashionMnist),
            Err(DatasetError::CountMismatch {
                images: 2,
                labels: 1
            })
        ));
    }

    #[test]
    fn test_label_out_of_range() {
        let items = vec![ImageItem {
            pixels: vec![0.0; 4],
            label: 10,
        }];
        let set = ImageSet::new(2, 2, DatasetKind::Mnist.class_names(), items);
        assert!(matches!(
            set,
            Err(DatasetError::LabelOutOfRange {
                label: 10,
                num_classes: 10
            })
        ));
    }

    #[test]
    fn test_normalization() {
        let items = vec![
            ImageItem {
                pixels: vec![0.0, 1.0],
                label: 0,
            },
            ImageItem {
                pixels: vec![1.0, 0.0],
                label: 1,
            },
        ];
        let mut set = ImageSet::new(2, 1, vec!["a".into(), "b".into()], items).unwrap();
        let norm = Normalization::fit(&set);
        assert_eq_float!(norm.mean, 0.5);
        assert_eq_float!(norm.std, 0.5);

        norm.apply(&mut set);
        assert_eq_float!(set.items[0].pixels[0], -1.0);
        assert_eq_float!(set.items[0].pixels[1], 1.0);
        assert!(Normalization::fit(&set).mean.abs() < 1e-6);
    }

    #[test]
    fn test_normalization_constant_set() {
        let items = vec![ImageItem {
            pixels: vec![0.3; 4],
            label: 0,
        }];
        let mut set = ImageSet::new(2, 2, vec!["only".into()], items).unwrap();
        let norm = Normalization::fit(&set);
        assert!(norm.std > 0.0);
        norm.apply(&mut set);
        assert!(set.items[0].pixels.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_synthetic() {
        let a = generate_synthetic(3, 10, SYNTHETIC_SIDE, 42);
        let b = generate_synthetic(3, 10, SYNTHETIC_SIDE, 42);
        assert_eq!(a.len(), 30);
        assert_eq!(a.items, b.items);
        assert_eq!(a.input_size(), SYNTHETIC_SIDE * SYNTHETIC_SIDE);
        assert_eq!(
            a.items.iter().take(10).map(|i| i.label).collect::<Vec<_>>(),
            (0..10).collect::<Vec<_>>()
        );
        assert!(a.items.iter().flat_map(|i| &i.pixels).all(|p| (0.0..=1.0).contains(p)));

        // bars sit at 1, 3, 5, ... for side 12 and 10 classes; class 0 lights row 1, class 1 column 1
        let side = SYNTHETIC_SIDE;
        let row_mean = |item: &ImageItem, r: usize| {
            item.pixels[r * side..(r + 1) * side].iter().sum::<f32>() / side as f32
        };
        let col_mean =
            |item: &ImageItem, c: usize| (0..side).map(|r| item.pixels[r * side + c]).sum::<f32>() / side as f32;
        assert!(row_mean(&a.items[0], 1) > 0.5);
        assert!(row_mean(&a.items[0], 6) < 0.5);
        assert!(col_mean(&a.items[1], 1) > 0.5);
        assert!(row_mean(&a.items[1], 6) < 0.5);

        let c = generate_synthetic(3, 10, SYNTHETIC_SIDE, 7);
        assert_ne!(a.items, c.items);
    }

    #[test]
    fn test_load_synthetic_dataset() {
        let options = LoadOptions {
            data_dir: PathBuf::from("unused"),
            train_limit: Some(25),
            synthetic_per_class: 10,
            seed: 1,
        };
        let (train, test, norm) = load_dataset(DatasetKind::Synthetic, &options).unwrap();
        assert_eq!(train.len(), 25);
        assert_eq!(test.len(), 20);
        assert!(norm.std > 0.0);
        let refit = Normalization::fit(&train);
        assert!(refit.mean.abs() < 1e-4);
        assert!((refit.std - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(DatasetKind::Mnist.class_names()[3], "3");
        assert_eq!(DatasetKind::FashionMnist.class_names()[9], "Ankle boot");
        assert_eq!(DatasetKind::Synthetic.class_names().len(), 10);
        assert_eq!(DatasetKind::FashionMnist.to_string(), "fashion-mnist");
    }
}

//! Error types for catalog loading, field reading and compositing.

use {
    crate::experiment::{Experiment, Phase},
    std::path::PathBuf,
    thiserror::Error,
};

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Phase catalog file does not exist
    #[error("missing {phase} catalog for {experiment}: {}", path.display())]
    MissingCatalog {
        experiment: Experiment,
        phase: Phase,
        path: PathBuf,
    },

    /// Row in a phase catalog whose first column is not a member index
    #[error("malformed {phase} catalog for {experiment} at {}:{line}: {content:?}", path.display())]
    MalformedCatalog {
        experiment: Experiment,
        phase: Phase,
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// Offset does not move the secondary indices past the primary ones
    #[error("merge offset {offset} must exceed the largest primary index {max_primary}")]
    InvalidMergeOffset { offset: usize, max_primary: usize },

    #[error("{axis} index {index} is out of range for length {len}")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        len: usize,
    },

    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("percentile {0} is outside [0, 100]")]
    InvalidPercentile(f64),

    #[error("window length must be positive, got {0}")]
    InvalidWindow(usize),

    #[error("no {variable} field for {experiment}")]
    MissingField {
        variable: String,
        experiment: Experiment,
    },

    #[error("level {level} not present in {variable}")]
    MissingLevel { variable: String, level: f64 },

    /// Raw field file with the wrong number of values
    #[error("{} holds {found} values, expected {expected}", path.display())]
    FieldLength {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn out_of_range(axis: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { axis, index, len }
    }

    pub fn shape_mismatch(expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

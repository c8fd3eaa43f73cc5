//! Error types for loading signed distance fields.

use thiserror::Error;

/// Errors produced while reading a binary SDF.
#[derive(Error, Debug)]
pub enum SdfError {
    /// Underlying reader or writer failed.
    #[error("SDF I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream does not start with the SDF magic bytes.
    #[error("Not an SDF file (bad magic {0:?})")]
    BadMagic([u8; 4]),

    /// The file was written by an unknown format revision.
    #[error("Unsupported SDF version {0}")]
    UnsupportedVersion(u32),

    /// The domain is empty, inverted or not finite.
    #[error("Invalid SDF domain")]
    InvalidDomain,

    /// A grid axis has zero cells or the cell size does not match the domain.
    #[error("Invalid SDF grid: {0}")]
    InvalidGrid(String),

    /// Node, cell and cell-map arrays disagree.
    #[error("Inconsistent SDF {what}: expected {expected}, found {found}")]
    Inconsistent {
        /// Which array is wrong.
        what: &'static str,
        /// Expected count or bound.
        expected: usize,
        /// Value found in the file.
        found: usize,
    },
}

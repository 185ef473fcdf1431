use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::Marker;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("error opening file {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("error creating file {}: {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("invalid file format: unknown marker {:?}", String::from_utf8_lossy(.0))]
    InvalidMarker([u8; 2]),

    #[error("invalid file format: expected {expected}, found {found}")]
    WrongFormat { expected: &'static str, found: Marker },

    #[error("invalid file format: {0}")]
    Format(String),

    #[error("invalid file format: unexpected end of file")]
    Truncated,

    #[error("image dimensions {width}x{height} are too large")]
    DimensionsTooLarge { width: u64, height: u64 },

    #[error("image does not fit into memory: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("run tokens describe {actual} pixels, image has {expected}")]
    RunLengthMismatch { expected: usize, actual: usize },

    #[error("compression aborted: output would exceed the original size of {budget} bytes")]
    CompressionOverflow { budget: usize },
}

impl Error {
    /// The encoder gave up because the output would not be smaller than the input.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::CompressionOverflow { .. })
    }

    pub(crate) fn from_read(err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::Truncated,
            _ => Error::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

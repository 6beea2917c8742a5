use std::io;
use thiserror::Error;

/// Every way a pack, parse or extract can fail.
///
/// All kinds are terminal for the command that raised them.  Parsing and
/// extraction are deterministic over an already-loaded buffer, so nothing is
/// ever retried.
#[derive(Error, Debug)]
pub enum PfsError {
    /// The buffer does not start with the `PFS` signature.
    #[error("Invalid format: not a PFS image (signature {found})")]
    InvalidFormat { found: String },

    /// The header or entry table would read past the end of the buffer.
    #[error("Truncated archive: {needed} bytes required, {available} available")]
    TruncatedArchive { needed: u64, available: u64 },

    /// An entry's data range lies (partly) outside the buffer.
    #[error("Partition out of bounds: '{name}' spans {start:#x}..{end:#x} but the image is {available:#x} bytes")]
    PartitionOutOfBounds { name: String, start: u64, end: u64, available: u64 },

    /// The builder could not reserve its output buffer.
    #[error("Allocation failed: could not reserve {bytes} bytes for the image")]
    AllocationFailed { bytes: u64 },

    #[error("Entry name '{name}' is {len} bytes; the name field holds {width}")]
    NameTooLong { name: String, len: usize, width: usize },

    #[error("Too many entries: {0} (the header counts at most 65535)")]
    TooManyEntries(usize),

    /// Cumulative data offset no longer fits the 32-bit offset field.
    #[error("Data segment too large: {0} bytes exceeds the 32-bit offset field")]
    SegmentTooLarge(u64),

    #[error("Invalid name-field width {0}")]
    InvalidNameWidth(usize),

    /// Entry name would be written outside the destination directory.
    #[error("Refusing to extract unsafe entry name '{0}'")]
    UnsafeEntryName(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Partition size {partition} too small for {needed} bytes (payload plus trailer)")]
    PartitionTooSmall { partition: u64, needed: u64 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PfsError>;

/// Attach the offending path to an I/O error.
pub(crate) fn with_path<P: AsRef<std::path::Path>>(path: P) -> impl FnOnce(io::Error) -> PfsError {
    move |e| PfsError::Io(io::Error::new(e.kind(), format!("{}: {e}", path.as_ref().display())))
}

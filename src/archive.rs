//! High-level path-based API, the surface the CLI is built on.
//!
//! ```no_run
//! use pfskit::archive::{self, OpenOptions, PackOptions, PfsImage};
//!
//! // Pack a directory
//! archive::pack_directory("rootfs", "rootfs.pfs", &PackOptions::default())?;
//!
//! // Read it back
//! let img = PfsImage::open("rootfs.pfs", &OpenOptions::default())?;
//! for entry in img.list() {
//!     println!("{} {}", entry.name, entry.size);
//! }
//! img.extract_all("out")?;
//! # Ok::<(), pfskit::PfsError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::builder::ArchiveBuilder;
use crate::collect;
use crate::entry::EntryRecord;
use crate::error::{with_path, PfsError, Result};
use crate::extractor::EntryExtractor;
use crate::layout::{strategy_for, DEFAULT_NAME_WIDTH};
use crate::reader::Archive;

// ── Options ───────────────────────────────────────────────────────────────────

/// Configuration for [`pack_directory`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Descend into subdirectories; entry names become relative paths.
    pub recursive:  bool,
    pub name_width: usize,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self { recursive: false, name_width: DEFAULT_NAME_WIDTH }
    }
}

/// Configuration for [`PfsImage::open`].
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Known name-field width.  `None` infers it from the first entry.
    pub name_width: Option<usize>,
}

// ── Pack ──────────────────────────────────────────────────────────────────────

/// Build an image from in-memory files, in the order given.
pub fn pack_files(files: Vec<(String, Vec<u8>)>, name_width: usize) -> Result<Vec<u8>> {
    let mut builder = ArchiveBuilder::with_name_width(name_width)?;
    for (name, data) in files {
        builder.add_file(name, data)?;
    }
    builder.build()
}

/// Pack the files under `root` into a new image at `output`.
/// Returns the entry table that was written.
pub fn pack_directory<P: AsRef<Path>, Q: AsRef<Path>>(
    root:   P,
    output: Q,
    opts:   &PackOptions,
) -> Result<Vec<EntryRecord>> {
    let root   = root.as_ref();
    let output = output.as_ref();

    let files = collect::collect(root, opts.recursive)?;
    log::info!("packing {} files from {}", files.len(), root.display());

    let mut builder = ArchiveBuilder::with_name_width(opts.name_width)?;
    for (name, data) in files {
        builder.add_file(name, data)?;
    }
    let entries = builder.entries()?;
    let image   = builder.build()?;
    fs::write(output, &image).map_err(with_path(output))?;
    log::info!("wrote {} ({} bytes)", output.display(), image.len());
    Ok(entries)
}

// ── PfsImage ──────────────────────────────────────────────────────────────────

/// An image loaded fully into memory together with its parsed table.
#[derive(Debug)]
pub struct PfsImage {
    path:    Option<PathBuf>,
    bytes:   Vec<u8>,
    archive: Archive,
}

impl PfsImage {
    pub fn open<P: AsRef<Path>>(path: P, opts: &OpenOptions) -> Result<Self> {
        let path  = path.as_ref();
        let bytes = fs::read(path).map_err(with_path(path))?;
        let mut img = Self::from_bytes(bytes, opts)?;
        img.path = Some(path.to_owned());
        Ok(img)
    }

    pub fn from_bytes(bytes: Vec<u8>, opts: &OpenOptions) -> Result<Self> {
        let strategy = strategy_for(opts.name_width);
        let archive  = Archive::parse_with(&bytes, strategy.as_ref())?;
        Ok(Self { path: None, bytes, archive })
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    pub fn bytes(&self) -> &[u8] { &self.bytes }

    pub fn archive(&self) -> &Archive { &self.archive }

    pub fn list(&self) -> &[EntryRecord] { &self.archive.entries }

    fn extractor(&self) -> EntryExtractor<'_> {
        EntryExtractor::new(&self.archive, &self.bytes)
    }

    pub fn read_file(&self, name: &str) -> Result<&[u8]> {
        let entry = self.archive.entry(name)
            .ok_or_else(|| PfsError::EntryNotFound(name.to_owned()))?;
        self.extractor().entry_bytes(entry)
    }

    /// Extract all entries into `dest`, creating it if necessary.
    pub fn extract_all<P: AsRef<Path>>(&self, dest: P) -> Result<Vec<PathBuf>> {
        self.extractor().extract_all(dest.as_ref())
    }

    /// Extract one entry below `dest` under its own name.  Names that would
    /// leave `dest` are refused, as in [`extract_all`](Self::extract_all).
    pub fn extract_entry_into<P: AsRef<Path>>(&self, name: &str, dest: P) -> Result<PathBuf> {
        let entry = self.archive.entry(name)
            .ok_or_else(|| PfsError::EntryNotFound(name.to_owned()))?;
        self.extractor().extract_into(entry, dest.as_ref())
    }

    /// Extract one entry to exactly `output`.
    pub fn extract_entry<P: AsRef<Path>>(&self, name: &str, output: P) -> Result<()> {
        let entry = self.archive.entry(name)
            .ok_or_else(|| PfsError::EntryNotFound(name.to_owned()))?;
        self.extractor().extract_to(entry, output.as_ref())
    }
}

//! Image builder: header, entry table, data segment, in that order.
//!
//! The builder owns the ordered list of pending files; nothing is written
//! until [`ArchiveBuilder::build`] assembles the whole image in one buffer.
//! Offsets are cumulative in insertion order, starting at zero, so entry
//! data is contiguous and never overlaps.

use crate::entry::{EntryRecord, FIXED_FIELDS_SIZE, PLACEHOLDER_TIMESTAMP};
use crate::error::{PfsError, Result};
use crate::header::{ArchiveHeader, HEADER_SIZE};
use crate::extractor::safe_relative_path;
use crate::layout::{check_name_width, DEFAULT_NAME_WIDTH};

pub struct ArchiveBuilder {
    name_width: usize,
    files:      Vec<(String, Vec<u8>)>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self { name_width: DEFAULT_NAME_WIDTH, files: Vec::new() }
    }

    /// Use a name field other than the default 64 bytes.  Must be between 1
    /// and [`MAX_NAME_WIDTH`](crate::layout::MAX_NAME_WIDTH).
    pub fn with_name_width(name_width: usize) -> Result<Self> {
        if name_width == 0 {
            return Err(PfsError::InvalidNameWidth(name_width));
        }
        let name_width = check_name_width(name_width)?;
        Ok(Self { name_width, files: Vec::new() })
    }

    pub fn name_width(&self) -> usize { self.name_width }

    pub fn len(&self) -> usize { self.files.len() }

    pub fn is_empty(&self) -> bool { self.files.is_empty() }

    /// Queue a file.  Names are checked here so a bad one is reported before
    /// any file content is assembled.  A name must fit the field and must be
    /// extractable: empty, `.`, absolute and `..` names are refused.
    pub fn add_file(&mut self, name: impl Into<String>, data: Vec<u8>) -> Result<()> {
        let name = name.into();
        safe_relative_path(&name)?;
        if name.len() > self.name_width {
            return Err(PfsError::NameTooLong {
                len:   name.len(),
                width: self.name_width,
                name,
            });
        }
        if self.files.len() >= u16::MAX as usize {
            return Err(PfsError::TooManyEntries(self.files.len() + 1));
        }
        self.files.push((name, data));
        Ok(())
    }

    /// Entry records in insertion order with cumulative offsets.
    pub fn entries(&self) -> Result<Vec<EntryRecord>> {
        let mut offset: u64 = 0;
        let mut entries = Vec::with_capacity(self.files.len());
        for (name, data) in &self.files {
            let size = data.len() as u64;
            let end  = offset + size;
            if end > u32::MAX as u64 {
                return Err(PfsError::SegmentTooLarge(end));
            }
            entries.push(EntryRecord {
                name:      name.clone(),
                timestamp: PLACEHOLDER_TIMESTAMP,
                offset:    offset as u32,
                size:      size as u32,
            });
            offset = end;
        }
        Ok(entries)
    }

    /// Serialize the image.
    pub fn build(&self) -> Result<Vec<u8>> {
        let entries = self.entries()?;
        let count   = u16::try_from(entries.len())
            .map_err(|_| PfsError::TooManyEntries(entries.len()))?;

        let record_width = self.name_width + FIXED_FIELDS_SIZE;
        let data_len: u64 = entries.iter().map(|e| e.size as u64).sum();
        let total = HEADER_SIZE as u64 + entries.len() as u64 * record_width as u64 + data_len;

        let mut out: Vec<u8> = Vec::new();
        usize::try_from(total)
            .ok()
            .and_then(|n| out.try_reserve_exact(n).ok())
            .ok_or(PfsError::AllocationFailed { bytes: total })?;

        ArchiveHeader::new(count).write(&mut out)?;
        for entry in &entries {
            entry.write(&mut out, self.name_width)?;
        }
        for ((name, data), entry) in self.files.iter().zip(&entries) {
            log::debug!("packing {name} at +{:#x} ({} bytes)", entry.offset, entry.size);
            out.extend_from_slice(data);
        }

        log::debug!(
            "built image: {} entries, record width {}, {} bytes",
            count,
            record_width,
            out.len()
        );
        Ok(out)
    }
}

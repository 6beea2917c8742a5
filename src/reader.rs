//! Image parser.
//!
//! A read walks a fixed sequence of states and never goes back:
//!
//! ```text
//! Unvalidated -> SignatureChecked -> WidthInferred -> TableParsed -> DataChecked -> Ready
//!       \______________\_________________\_______________\_____________\-> Failed
//! ```
//!
//! `DataChecked` means every entry's bytes lie inside the buffer, so an
//! [`Archive`] handed out by the reader never points past the image end.
//!
//! The input buffer is only borrowed.  The resulting [`Archive`] holds the
//! decoded entry table and where the data segment starts; entry bytes stay in
//! the caller's buffer and are sliced out by the
//! [`extractor`](crate::extractor).

use serde::Serialize;

use crate::entry::{EntryRecord, FIXED_FIELDS_SIZE};
use crate::error::{PfsError, Result};
use crate::header::{ArchiveHeader, HEADER_SIZE};
use crate::layout::{check_name_width, InferFromPadding, NameWidthStrategy};

// ── Archive ───────────────────────────────────────────────────────────────────

/// A parsed image.
#[derive(Debug, Clone, Serialize)]
pub struct Archive {
    pub header:            ArchiveHeader,
    pub entries:           Vec<EntryRecord>,
    /// Absolute offset of entry 0's first byte.
    pub data_segment_base: u64,
    /// Name width plus the 12 bytes of fixed fields.
    pub record_width:      usize,
}

impl Archive {
    /// Parse with name-width inference.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        Self::parse_with(buf, &InferFromPadding::default())
    }

    pub fn parse_with(buf: &[u8], strategy: &dyn NameWidthStrategy) -> Result<Self> {
        ArchiveReader::new(strategy).read(buf)
    }

    pub fn name_width(&self) -> usize {
        self.record_width - FIXED_FIELDS_SIZE
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn entry(&self, name: &str) -> Option<&EntryRecord> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Absolute `start..end` of an entry's bytes in the image.
    pub fn data_range(&self, entry: &EntryRecord) -> (u64, u64) {
        let start = self.data_segment_base + entry.offset as u64;
        (start, start + entry.size as u64)
    }
}

// ── ArchiveReader ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unvalidated,
    SignatureChecked,
    WidthInferred,
    TableParsed,
    DataChecked,
    Ready,
    Failed,
}

/// Single-shot parser; `read` consumes it.
pub struct ArchiveReader<'s> {
    strategy: &'s dyn NameWidthStrategy,
    state:    ReaderState,
}

impl<'s> ArchiveReader<'s> {
    pub fn new(strategy: &'s dyn NameWidthStrategy) -> Self {
        Self { strategy, state: ReaderState::Unvalidated }
    }

    pub fn read(mut self, buf: &[u8]) -> Result<Archive> {
        let result = self.run(buf);
        if let Err(ref e) = result {
            log::trace!("pfs reader: {:?} -> Failed ({e})", self.state);
            self.state = ReaderState::Failed;
        }
        result
    }

    fn advance(&mut self, next: ReaderState) {
        log::trace!("pfs reader: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn run(&mut self, buf: &[u8]) -> Result<Archive> {
        let header = ArchiveHeader::parse(buf)?;
        self.advance(ReaderState::SignatureChecked);

        let count = header.entry_count as usize;
        let name_width = check_name_width(if count == 0 {
            self.strategy.fallback_width()
        } else {
            self.strategy.name_width(&buf[HEADER_SIZE..])?
        })?;
        let record_width = name_width + FIXED_FIELDS_SIZE;
        self.advance(ReaderState::WidthInferred);

        let data_segment_base = HEADER_SIZE as u64 + count as u64 * record_width as u64;
        if data_segment_base > buf.len() as u64 {
            return Err(PfsError::TruncatedArchive {
                needed:    data_segment_base,
                available: buf.len() as u64,
            });
        }
        let entries = buf[HEADER_SIZE..data_segment_base as usize]
            .chunks_exact(record_width)
            .map(|record| EntryRecord::read(record, name_width))
            .collect::<std::io::Result<Vec<_>>>()?;
        self.advance(ReaderState::TableParsed);

        let available = buf.len() as u64;
        for entry in &entries {
            let start = data_segment_base + entry.offset as u64;
            let end   = start + entry.size as u64;
            if end > available {
                return Err(PfsError::PartitionOutOfBounds {
                    name: entry.name.clone(),
                    start,
                    end,
                    available,
                });
            }
        }
        self.advance(ReaderState::DataChecked);

        log::debug!(
            "{} image: {} entries, record width {}, data segment at {:#x}",
            header.signature_text(),
            count,
            record_width,
            data_segment_base
        );
        self.advance(ReaderState::Ready);
        Ok(Archive { header, entries, data_segment_base, record_width })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ArchiveBuilder;
    use crate::layout::FixedWidth;

    fn sample() -> Vec<u8> {
        let mut b = ArchiveBuilder::new();
        b.add_file("a.txt", b"Hello".to_vec()).unwrap();
        b.add_file("b.bin", vec![1, 2, 3]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn parses_built_image() {
        let img = sample();
        let ar = Archive::parse(&img).unwrap();
        assert_eq!(ar.len(), 2);
        assert_eq!(ar.header.entry_count, 2);
        assert_eq!(ar.record_width, 76);
        assert_eq!(ar.name_width(), 64);
        assert_eq!(ar.data_segment_base, 16 + 2 * 76);
        assert_eq!(ar.entries[1].name, "b.bin");
        assert_eq!(ar.data_range(&ar.entries[1]), (16 + 152 + 5, 16 + 152 + 8));
        assert!(ar.entry("a.txt").is_some());
        assert!(ar.entry("c.txt").is_none());
    }

    #[test]
    fn signature_checked_first() {
        let mut img = sample();
        img[0] = b'X';
        assert!(matches!(Archive::parse(&img), Err(PfsError::InvalidFormat { .. })));
    }

    #[test]
    fn truncated_table() {
        let img = sample();
        let err = Archive::parse(&img[..100]).unwrap_err();
        assert!(matches!(err, PfsError::TruncatedArchive { needed: 168, available: 100 }));
    }

    #[test]
    fn count_larger_than_table() {
        let mut img = sample();
        img[14] = 200;
        assert!(matches!(Archive::parse(&img), Err(PfsError::TruncatedArchive { .. })));
    }

    #[test]
    fn truncated_data_segment() {
        let img = sample();
        let err = Archive::parse(&img[..img.len() - 2]).unwrap_err();
        match err {
            PfsError::PartitionOutOfBounds { name, end, available, .. } => {
                assert_eq!(name, "b.bin");
                assert_eq!(end, available + 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Cutting into the first entry reports it, not the second.
        let err = Archive::parse(&img[..16 + 152 + 3]).unwrap_err();
        assert!(matches!(err, PfsError::PartitionOutOfBounds { ref name, .. } if name == "a.txt"));
    }

    #[test]
    fn oversized_fixed_width_is_an_error() {
        let img = sample();
        for width in [usize::MAX, usize::MAX - 11, crate::layout::MAX_NAME_WIDTH + 1] {
            assert!(matches!(
                Archive::parse_with(&img, &FixedWidth(width)),
                Err(PfsError::InvalidNameWidth(w)) if w == width
            ));
        }
        let empty = ArchiveBuilder::new().build().unwrap();
        assert!(matches!(
            Archive::parse_with(&empty, &FixedWidth(usize::MAX)),
            Err(PfsError::InvalidNameWidth(_))
        ));
    }

    #[test]
    fn empty_image_uses_fallback_width() {
        let img = ArchiveBuilder::new().build().unwrap();
        let ar = Archive::parse(&img).unwrap();
        assert!(ar.is_empty());
        assert_eq!(ar.data_segment_base, 16);
        assert_eq!(Archive::parse_with(&img, &FixedWidth(40)).unwrap().record_width, 52);
    }

    #[test]
    fn fixed_width_overrides_inference() {
        // Names exactly fill an 8-byte field, which defeats inference.
        let mut b = ArchiveBuilder::with_name_width(8).unwrap();
        b.add_file("abcdefgh", b"xyz".to_vec()).unwrap();
        b.add_file("ijklmnop", Vec::new()).unwrap();
        let img = b.build().unwrap();

        let ar = Archive::parse_with(&img, &FixedWidth(8)).unwrap();
        assert_eq!(ar.entries[0].name, "abcdefgh");
        assert_eq!(ar.entries[1].offset, 3);
    }
}

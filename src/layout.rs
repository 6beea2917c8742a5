//! Name-field width policies.
//!
//! PFS images carry no schema: the width of the name field inside each entry
//! record is whatever the producer chose (64 bytes for ours, 40 or 48 for
//! some vendor images).  The reader asks a [`NameWidthStrategy`] for it.
//!
//! # Inference
//! [`InferFromPadding`] reads the first entry's name field starting right
//! after the header: it skips the name bytes up to the first NUL, then the
//! NUL run, and stops at the first non-NUL byte.  That byte is taken to be
//! the start of the timestamp, so its distance from the table start is the
//! name width.
//!
//! # Known limitation
//! A name that fills its field completely has no NUL run in front of the
//! timestamp, and a timestamp whose low byte is zero extends the run into
//! the fixed fields.  In both cases the boundary found is wrong.  The
//! heuristic is kept as-is so images accepted by older tools still parse;
//! callers who know the producer's width pass [`FixedWidth`] instead.

use crate::error::{PfsError, Result};

/// Name-field width written by [`ArchiveBuilder`](crate::builder::ArchiveBuilder).
pub const DEFAULT_NAME_WIDTH: usize = 64;

/// How many bytes of the table the inference looks at.
pub const INFERENCE_WINDOW: usize = 128;

/// Widest name field accepted from any strategy or builder.
pub const MAX_NAME_WIDTH: usize = 4096;

/// Reject widths the record arithmetic cannot represent.
pub fn check_name_width(name_width: usize) -> Result<usize> {
    if name_width > MAX_NAME_WIDTH {
        return Err(PfsError::InvalidNameWidth(name_width));
    }
    Ok(name_width)
}

pub trait NameWidthStrategy {
    /// Name-field width for the table starting at `table[0]`.
    /// Only called when the header declares at least one entry.
    fn name_width(&self, table: &[u8]) -> Result<usize>;

    /// Width reported for an image with no entries.
    fn fallback_width(&self) -> usize;
}

// ── InferFromPadding ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct InferFromPadding {
    pub window: usize,
}

impl Default for InferFromPadding {
    fn default() -> Self {
        Self { window: INFERENCE_WINDOW }
    }
}

impl NameWidthStrategy for InferFromPadding {
    fn name_width(&self, table: &[u8]) -> Result<usize> {
        let window = &table[..table.len().min(self.window)];
        let mut in_padding = false;
        for (pos, &byte) in window.iter().enumerate() {
            if byte == 0 {
                in_padding = true;
            } else if in_padding {
                return Ok(pos);
            }
        }
        log::warn!(
            "no name-field boundary in the first {} table bytes, assuming width {}",
            window.len(),
            window.len()
        );
        Ok(window.len())
    }

    fn fallback_width(&self) -> usize {
        DEFAULT_NAME_WIDTH
    }
}

// ── FixedWidth ────────────────────────────────────────────────────────────────

/// Out-of-band width; skips inference entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidth(pub usize);

impl NameWidthStrategy for FixedWidth {
    fn name_width(&self, _table: &[u8]) -> Result<usize> {
        Ok(self.0)
    }

    fn fallback_width(&self) -> usize {
        self.0
    }
}

/// Pick a strategy from an optional user-supplied width.
pub fn strategy_for(name_width: Option<usize>) -> Box<dyn NameWidthStrategy> {
    match name_width {
        Some(w) => Box::new(FixedWidth(w)),
        None    => Box::new(InferFromPadding::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_record(name: &[u8], width: usize, timestamp: u32) -> Vec<u8> {
        let mut t = name.to_vec();
        t.resize(width, 0);
        t.extend_from_slice(&timestamp.to_le_bytes());
        t.extend_from_slice(&[0u8; 8]);
        t
    }

    #[test]
    fn infers_common_widths() {
        for width in [32, 40, 48, 64, 100] {
            let table = first_record(b"etc/passwd", width, 1);
            assert_eq!(InferFromPadding::default().name_width(&table).unwrap(), width);
        }
    }

    #[test]
    fn empty_name_still_infers() {
        let table = first_record(b"", 64, 0x5000_0001);
        assert_eq!(InferFromPadding::default().name_width(&table).unwrap(), 64);
    }

    #[test]
    fn full_name_misleads_inference() {
        // Name fills the field: the NUL run found is inside the timestamp.
        let table = first_record(b"abcdefgh", 8, 1);
        assert_ne!(InferFromPadding::default().name_width(&table).unwrap(), 8);
        assert_eq!(FixedWidth(8).name_width(&table).unwrap(), 8);
    }

    #[test]
    fn no_boundary_uses_window() {
        let table = vec![b'A'; 300];
        assert_eq!(InferFromPadding::default().name_width(&table).unwrap(), INFERENCE_WINDOW);
        let short = vec![b'A'; 20];
        assert_eq!(InferFromPadding::default().name_width(&short).unwrap(), 20);
    }

    #[test]
    fn width_bound() {
        assert_eq!(check_name_width(MAX_NAME_WIDTH).unwrap(), MAX_NAME_WIDTH);
        assert!(matches!(check_name_width(usize::MAX), Err(PfsError::InvalidNameWidth(_))));
    }

    #[test]
    fn strategy_selection() {
        assert_eq!(strategy_for(Some(40)).fallback_width(), 40);
        assert_eq!(strategy_for(None).fallback_width(), DEFAULT_NAME_WIDTH);
    }
}

//! The fixed 16-byte image header.
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 8    | signature, `PFS/0.9\0` when we build it |
//! | 8      | 4    | reserved, zero                          |
//! | 12     | 2    | unknown field (u16 LE), zero            |
//! | 14     | 2    | entry count (u16 LE)                    |
//!
//! Only the first three signature bytes are checked on read; producers put
//! different version strings after `PFS`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Cursor, Read, Write};

use crate::error::{PfsError, Result};

pub const MAGIC:       &[u8; 8] = b"PFS/0.9\0";
pub const SIGNATURE:   &[u8; 3] = b"PFS";
pub const HEADER_SIZE: usize    = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveHeader {
    pub magic:       [u8; 8],
    pub reserved:    [u8; 4],
    pub unknown:     u16,
    pub entry_count: u16,
}

impl ArchiveHeader {
    pub fn new(entry_count: u16) -> Self {
        Self {
            magic:    *MAGIC,
            reserved: [0u8; 4],
            unknown:  0,
            entry_count,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.reserved)?;
        writer.write_u16::<LittleEndian>(self.unknown)?;
        writer.write_u16::<LittleEndian>(self.entry_count)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        let mut reserved = [0u8; 4];
        reader.read_exact(&mut reserved)?;
        Ok(Self {
            magic,
            reserved,
            unknown:     reader.read_u16::<LittleEndian>()?,
            entry_count: reader.read_u16::<LittleEndian>()?,
        })
    }

    /// Validate the signature, then decode the header from the front of
    /// `buf`.  The signature is checked before anything else is looked at.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        check_signature(buf)?;
        if buf.len() < HEADER_SIZE {
            return Err(PfsError::TruncatedArchive {
                needed:    HEADER_SIZE as u64,
                available: buf.len() as u64,
            });
        }
        Ok(Self::read(Cursor::new(&buf[..HEADER_SIZE]))?)
    }

    /// Signature text up to the first NUL, for display.
    pub fn signature_text(&self) -> String {
        let end = self.magic.iter().position(|&b| b == 0).unwrap_or(self.magic.len());
        String::from_utf8_lossy(&self.magic[..end]).into_owned()
    }
}

pub fn check_signature(buf: &[u8]) -> Result<()> {
    if buf.len() < SIGNATURE.len() || &buf[..SIGNATURE.len()] != SIGNATURE {
        let shown = &buf[..buf.len().min(MAGIC.len())];
        return Err(PfsError::InvalidFormat { found: hex::encode(shown) });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut buf = Vec::new();
        ArchiveHeader::new(0x0102).write(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[..8], b"PFS/0.9\0");
        assert_eq!(&buf[8..14], &[0u8; 6]);
        assert_eq!(&buf[14..16], &[0x02u8, 0x01]);
    }

    #[test]
    fn parse_keeps_foreign_fields() {
        let mut buf = b"PFS/1.0\0".to_vec();
        buf.extend_from_slice(&[0, 0, 0, 0, 0x34, 0x12, 3, 0]);
        let h = ArchiveHeader::parse(&buf).unwrap();
        assert_eq!(h.signature_text(), "PFS/1.0");
        assert_eq!(h.unknown, 0x1234);
        assert_eq!(h.entry_count, 3);
    }

    #[test]
    fn bad_signature() {
        let err = ArchiveHeader::parse(b"ZIP/0.9\0\0\0\0\0\0\0\0\0").unwrap_err();
        assert!(matches!(err, PfsError::InvalidFormat { .. }));
        assert!(matches!(ArchiveHeader::parse(b"PF"), Err(PfsError::InvalidFormat { .. })));
        assert!(matches!(ArchiveHeader::parse(b""), Err(PfsError::InvalidFormat { .. })));
    }

    #[test]
    fn short_header_is_truncated() {
        let err = ArchiveHeader::parse(b"PFS/0.9\0\0\0").unwrap_err();
        assert!(matches!(err, PfsError::TruncatedArchive { needed: 16, available: 10 }));
    }
}

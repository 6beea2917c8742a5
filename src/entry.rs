//! One row of the entry table.
//!
//! ```text
//! [ name: W bytes, NUL padded ][ timestamp u32 LE ][ offset u32 LE ][ size u32 LE ]
//! ```
//!
//! `offset` is relative to the start of the data segment, not to the file.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Cursor, Write};

use crate::error::{PfsError, Result};

/// Bytes following the name field: timestamp, offset, size.
pub const FIXED_FIELDS_SIZE: usize = 12;

/// Timestamp written for every packed entry.  Real modification times are
/// not recorded.  The low byte must stay non-zero: the reader finds the end
/// of the name field by looking for the first non-NUL byte after the name.
pub const PLACEHOLDER_TIMESTAMP: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRecord {
    pub name:      String,
    pub timestamp: u32,
    pub offset:    u32,
    pub size:      u32,
}

impl EntryRecord {
    /// Serialize with the name left-justified in a `name_width` field.
    pub fn write<W: Write>(&self, mut writer: W, name_width: usize) -> Result<()> {
        let name = self.name.as_bytes();
        if name.len() > name_width {
            return Err(PfsError::NameTooLong {
                name:  self.name.clone(),
                len:   name.len(),
                width: name_width,
            });
        }
        writer.write_all(name)?;
        writer.write_all(&vec![0u8; name_width - name.len()])?;
        writer.write_u32::<LittleEndian>(self.timestamp)?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    /// Decode one record.  `record` must be exactly `name_width + 12` bytes.
    pub fn read(record: &[u8], name_width: usize) -> io::Result<Self> {
        let expected = name_width.checked_add(FIXED_FIELDS_SIZE);
        if expected != Some(record.len()) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry record is {} bytes, expected {} + {FIXED_FIELDS_SIZE}", record.len(), name_width),
            ));
        }
        let (name_field, fixed) = record.split_at(name_width);
        let mut fixed = Cursor::new(fixed);
        Ok(Self {
            name:      decode_name(name_field),
            timestamp: fixed.read_u32::<LittleEndian>()?,
            offset:    fixed.read_u32::<LittleEndian>()?,
            size:      fixed.read_u32::<LittleEndian>()?,
        })
    }

    /// Offset one past the entry's last byte, relative to the data segment.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }
}

fn decode_name(field: &[u8]) -> String {
    let len = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let raw = &field[..len];
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_owned(),
        Err(_) => {
            log::warn!("entry name is not valid UTF-8: {}", hex::encode(raw));
            String::from_utf8_lossy(raw).into_owned()
        }
    }
}

//! Firmware image helpers that sit next to the PFS packer: concatenating
//! partition images and padding one out to a fixed partition size.
//!
//! # Padded partition layout
//! ```text
//! [ payload ][ 0xFF fill ][ payload size u32 LE ][ 0x12345678 LE ][ 0xFFFFFFFF ]
//! ```
//! The last twelve bytes are the trailer Belkin bootloaders look for; the
//! all-ones checksum word makes the loader skip its CRC check.

use byteorder::{LittleEndian, WriteBytesExt};
use std::fs;
use std::path::Path;

use crate::error::{with_path, PfsError, Result};

pub const TRAILER_SIZE:  usize = 12;
pub const TRAILER_MAGIC: u32   = 0x1234_5678;
pub const CRC_BYPASS:    u32   = 0xFFFF_FFFF;
pub const FILL_BYTE:     u8    = 0xFF;

/// Concatenate the contents of `inputs` in order.
pub fn merge<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        let data = fs::read(path).map_err(with_path(path))?;
        log::debug!("merging {} ({} bytes) at {:#x}", path.display(), data.len(), out.len());
        out.extend_from_slice(&data);
    }
    Ok(out)
}

/// Pad `payload` to exactly `partition_size` bytes and append the trailer.
pub fn pad(payload: &[u8], partition_size: u64) -> Result<Vec<u8>> {
    let needed = payload.len() as u64 + TRAILER_SIZE as u64;
    let size = u32::try_from(payload.len())
        .map_err(|_| PfsError::SegmentTooLarge(payload.len() as u64))?;
    if partition_size < needed {
        return Err(PfsError::PartitionTooSmall { partition: partition_size, needed });
    }
    let total = usize::try_from(partition_size)
        .map_err(|_| PfsError::AllocationFailed { bytes: partition_size })?;

    let mut out: Vec<u8> = Vec::new();
    out.try_reserve_exact(total)
        .map_err(|_| PfsError::AllocationFailed { bytes: partition_size })?;
    out.extend_from_slice(payload);
    out.resize(total - TRAILER_SIZE, FILL_BYTE);
    out.write_u32::<LittleEndian>(size)?;
    out.write_u32::<LittleEndian>(TRAILER_MAGIC)?;
    out.write_u32::<LittleEndian>(CRC_BYPASS)?;
    Ok(out)
}

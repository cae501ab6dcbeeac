//! File header for .ksnap snapshot archives.

use std::io::{Read, Write};

use crate::types::error::{KsError, KsResult};
use crate::types::{FORMAT_VERSION, KSNAP_MAGIC, TOTAL_MASS};

/// Header of a .ksnap file. Fixed size: 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    /// Magic bytes: [0x4B, 0x53, 0x4E, 0x50] ("KSNP").
    pub magic: [u8; 4],
    /// Format version (currently 1).
    pub version: u32,
    /// Number of snapshot records following the header.
    pub snapshot_count: u64,
    /// Total mass the stored vectors were built with.
    pub total_mass: f64,
}

/// The fixed size of a FileHeader on disk: 32 bytes.
pub const HEADER_SIZE: u64 = 32;

impl FileHeader {
    /// Create a new header with default magic, version and mass.
    pub fn new(snapshot_count: u64) -> Self {
        Self {
            magic: KSNAP_MAGIC,
            version: FORMAT_VERSION,
            snapshot_count,
            total_mass: TOTAL_MASS,
        }
    }

    /// Write this header to the given writer. Writes exactly 32 bytes.
    ///
    /// Layout (all little-endian):
    /// - 0x00..0x04: magic (4 bytes)
    /// - 0x04..0x08: version (u32, 4 bytes)
    /// - 0x08..0x10: snapshot_count (u64, 8 bytes)
    /// - 0x10..0x18: total_mass (f64, 8 bytes)
    /// - 0x18..0x20: _reserved (u64, 8 bytes, written as 0)
    pub fn write_to(&self, writer: &mut impl Write) -> KsResult<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.snapshot_count.to_le_bytes())?;
        writer.write_all(&self.total_mass.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?; // _reserved
        Ok(())
    }

    /// Read a header from the given reader. Reads exactly 32 bytes.
    pub fn read_from(reader: &mut impl Read) -> KsResult<Self> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                KsError::Truncated
            } else {
                KsError::Io(e)
            }
        })?;

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != KSNAP_MAGIC {
            return Err(KsError::InvalidMagic);
        }

        let version = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if version != FORMAT_VERSION {
            return Err(KsError::UnsupportedVersion(version));
        }

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&buf[8..16]);
        let mut mass_bytes = [0u8; 8];
        mass_bytes.copy_from_slice(&buf[16..24]);
        // bytes 24..32 are reserved

        Ok(Self {
            magic,
            version,
            snapshot_count: u64::from_le_bytes(count_bytes),
            total_mass: f64::from_le_bytes(mass_bytes),
        })
    }
}

//! Reads .ksnap files into a snapshot store.

use std::io::Read;
use std::path::Path;

use crate::engine::snapshot::validate_space;
use crate::store::SnapshotStore;
use crate::types::error::{KsError, KsResult};
use crate::types::header::{FileHeader, HEADER_SIZE};
use crate::types::Snapshot;

use super::compression::decompress_record;

/// Reader for .ksnap binary files.
pub struct SnapshotReader;

impl SnapshotReader {
    /// Read a .ksnap file into a store.
    pub fn read_from_file(path: &Path) -> KsResult<SnapshotStore> {
        let data = std::fs::read(path)?;
        let mut cursor = std::io::Cursor::new(data);
        Self::read_from(&mut cursor)
    }

    /// Read the header of a .ksnap file.
    pub fn read_header(path: &Path) -> KsResult<FileHeader> {
        let mut file = std::fs::File::open(path)?;
        FileHeader::read_from(&mut file)
    }

    /// Read from any reader into a store.
    ///
    /// Every topic vector must sum to the mass recorded in the header.
    pub fn read_from(reader: &mut impl Read) -> KsResult<SnapshotStore> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let header_len = HEADER_SIZE as usize;
        if data.len() < header_len {
            return Err(KsError::Truncated);
        }
        let header = FileHeader::read_from(&mut std::io::Cursor::new(&data[..header_len]))?;

        let mut snapshots = Vec::new();
        let mut offset = header_len;
        for _ in 0..header.snapshot_count {
            let (snapshot, next) = parse_record(&data, offset)?;
            for space in &snapshot.data.spaces {
                if let Err(e) = validate_space(space, header.total_mass) {
                    log::warn!("snapshot {} at offset {}: {}", snapshot.id, offset, e);
                    return Err(KsError::Corrupt(offset as u64));
                }
            }
            snapshots.push(snapshot);
            offset = next;
        }

        SnapshotStore::from_snapshots(snapshots)
    }
}

/// Parse the record starting at `offset`, returning it and the next offset.
fn parse_record(data: &[u8], offset: usize) -> KsResult<(Snapshot, usize)> {
    let len_end = offset + 4;
    let len_bytes: [u8; 4] = data
        .get(offset..len_end)
        .and_then(|b| b.try_into().ok())
        .ok_or(KsError::Truncated)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    let body = data.get(len_end..len_end + len).ok_or(KsError::Truncated)?;
    let json = decompress_record(body)?;
    let snapshot =
        serde_json::from_slice(&json).map_err(|_| KsError::Corrupt(offset as u64))?;

    Ok((snapshot, len_end + len))
}

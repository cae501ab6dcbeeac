//! Writes .ksnap files from a snapshot store.

use std::io::Write;
use std::path::Path;

use crate::store::SnapshotStore;
use crate::types::error::{KsError, KsResult};
use crate::types::header::FileHeader;
use crate::types::Snapshot;

use super::compression::compress_record;

/// Writer for .ksnap binary files.
pub struct SnapshotWriter {
    total_mass: f64,
}

impl SnapshotWriter {
    /// Create a new writer recording the given total mass in the header.
    pub fn new(total_mass: f64) -> Self {
        Self { total_mass }
    }

    /// Write a complete store to a .ksnap file.
    pub fn write_to_file(&self, store: &SnapshotStore, path: &Path) -> KsResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_to(store, &mut writer)?;
        log::info!("wrote {} snapshots to {}", store.len(), path.display());
        Ok(())
    }

    /// Write a complete store to any writer, oldest snapshot first.
    pub fn write_to(&self, store: &SnapshotStore, writer: &mut impl Write) -> KsResult<()> {
        let snapshots = store.snapshots();

        let mut header = FileHeader::new(snapshots.len() as u64);
        header.total_mass = self.total_mass;
        header.write_to(writer)?;

        for snapshot in snapshots {
            write_record(writer, snapshot)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Write one length-prefixed, compressed snapshot record.
fn write_record(writer: &mut impl Write, snapshot: &Snapshot) -> KsResult<()> {
    let json = serde_json::to_vec(snapshot)?;
    let compressed = compress_record(&json);
    let len = u32::try_from(compressed.len()).map_err(|_| {
        KsError::invalid(format!("snapshot {} is too large to store", snapshot.id))
    })?;
    writer.write_all(&len.to_le_bytes())?; // 4 bytes
    writer.write_all(&compressed)?;
    Ok(())
}

//! LZ4 record compression/decompression.

use crate::types::error::{KsError, KsResult};

/// Compress a record with LZ4 (prepend size for decompression).
pub fn compress_record(bytes: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(bytes)
}

/// Decompress an LZ4-compressed record.
pub fn decompress_record(data: &[u8]) -> KsResult<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data).map_err(|e| KsError::Compression(e.to_string()))
}

//! Minecraft Anvil region file format (.mca).
//!
//! Region files contain 32x32 chunks in a specific binary format:
//! - Bytes 0-4095: Location table (1024 entries × 4 bytes)
//! - Bytes 4096-8191: Timestamp table (1024 entries × 4 bytes)
//! - Bytes 8192+: Chunk data (variable size sectors)

mod header;
mod locator;
mod reader;

#[cfg(test)]
pub(crate) mod fixtures;

pub use header::{Header, Location};
pub use locator::find_region_files;
pub use reader::{AnvilChunk, BiomeRef, BlockStateEntry, RegionData, RegionError};

use std::io::{Read, Write};

use flate2::Compression as ZlibCompression;
use flate2::write::ZlibEncoder;

use crate::storage::ChunkPos;

/// Size of one sector in bytes (4 KB).
pub const SECTOR_SIZE: usize = 4096;

/// Total header size (location table + timestamp table).
pub const HEADER_SIZE: usize = SECTOR_SIZE * 2; // 8192 bytes

/// Number of chunks per region dimension.
pub const REGION_SIZE: i32 = 32;

/// Number of chunks held by one region file.
pub const CHUNKS_PER_REGION: usize = (REGION_SIZE * REGION_SIZE) as usize;

/// Convert chunk coordinates to local region coordinates (0-31).
#[inline]
pub fn chunk_to_local(chunk_coord: i32) -> i32 {
    chunk_coord.rem_euclid(REGION_SIZE)
}

/// Convert chunk coordinates to region coordinates.
#[inline]
pub fn chunk_to_region(chunk_coord: i32) -> i32 {
    chunk_coord.div_euclid(REGION_SIZE)
}

/// Calculate linear index for a chunk within a region (0-1023).
#[inline]
pub fn local_to_index(local_x: i32, local_z: i32) -> usize {
    (local_z * REGION_SIZE + local_x) as usize
}

/// Calculate local coordinates from linear index.
#[inline]
pub fn index_to_local(index: usize) -> (i32, i32) {
    let local_x = (index % REGION_SIZE as usize) as i32;
    let local_z = (index / REGION_SIZE as usize) as i32;
    (local_x, local_z)
}

/// Region file coordinates (parsed from filename like "r.0.-1.mca").
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region owning the given chunk.
    pub fn of_chunk(pos: ChunkPos) -> Self {
        Self {
            x: chunk_to_region(pos.x),
            z: chunk_to_region(pos.z),
        }
    }

    /// Parse region position from filename (e.g., "r.0.-1.mca").
    ///
    /// Any extension is accepted, the legacy `.mcr` files share the naming scheme.
    pub fn from_filename(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() == 4 && parts[0] == "r" && !parts[3].is_empty() {
            let x = parts[1].parse().ok()?;
            let z = parts[2].parse().ok()?;
            Some(Self { x, z })
        } else {
            None
        }
    }

    /// Canonical `.mca` file name of this region.
    pub fn file_name(&self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }

    /// Convert local chunk coordinates to world chunk coordinates.
    pub fn local_to_world(&self, local_x: i32, local_z: i32) -> ChunkPos {
        ChunkPos::new(
            self.x * REGION_SIZE + local_x,
            self.z * REGION_SIZE + local_z,
        )
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        Self::of_chunk(pos) == *self
    }

    /// All 1024 chunk positions owned by this region, X-major.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkPos> + use<> {
        let origin = *self;
        (0..REGION_SIZE).flat_map(move |local_x| {
            (0..REGION_SIZE).map(move |local_z| origin.local_to_world(local_x, local_z))
        })
    }
}

impl std::fmt::Display for RegionPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r.{}.{}", self.x, self.z)
    }
}

/// Compression types used in Minecraft Anvil format
/// Same IDs as used by vanilla Minecraft
pub mod compression {
    pub const GZIP: u8 = 1;
    pub const ZLIB: u8 = 2;
    pub const NONE: u8 = 3;
    pub const LZ4: u8 = 4;
    /// Flag set when the payload lives in an external `.mcc` file.
    pub const EXTERNAL: u8 = 128;
}

/// Compress NBT with Zlib and frame it as `[Length: 4][Type: 1][Data...]`.
pub fn compress_and_wrap_chunk(nbt_data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), ZlibCompression::default());
    encoder.write_all(nbt_data)?;
    let compressed = encoder.finish()?;

    let total_len = (compressed.len() + 1) as u32; // +1 byte for Type
    let mut chunk_blob = Vec::with_capacity(5 + compressed.len());
    chunk_blob.extend_from_slice(&total_len.to_be_bytes());
    chunk_blob.push(compression::ZLIB);
    chunk_blob.extend_from_slice(&compressed);
    Ok(chunk_blob)
}

/// Unwrap and decompress a chunk blob.
/// Supports GZip (1), ZLib (2), None (3), and LZ4 (4).
pub fn unwrap_and_decompress_chunk(chunk_blob: &[u8]) -> Result<Vec<u8>, RegionError> {
    if chunk_blob.len() < 5 {
        return Err(RegionError::Truncated("chunk blob shorter than its header"));
    }

    // Parse header: [Length: 4 bytes][Type: 1 byte][Data...]
    let length = u32::from_be_bytes([chunk_blob[0], chunk_blob[1], chunk_blob[2], chunk_blob[3]]) as usize;
    let compression_type = chunk_blob[4];
    if length == 0 || 4 + length > chunk_blob.len() {
        return Err(RegionError::Truncated("chunk payload exceeds its sectors"));
    }
    let compressed_data = &chunk_blob[5..4 + length];

    let mut decompressed = Vec::new();
    match compression_type {
        compression::ZLIB => {
            flate2::read::ZlibDecoder::new(compressed_data).read_to_end(&mut decompressed)?;
        }
        compression::GZIP => {
            flate2::read::GzDecoder::new(compressed_data).read_to_end(&mut decompressed)?;
        }
        compression::NONE => decompressed.extend_from_slice(compressed_data),
        compression::LZ4 => {
            lz4_java_wrc::Lz4BlockInput::new(compressed_data).read_to_end(&mut decompressed)?;
        }
        other => return Err(RegionError::UnsupportedCompression(other)),
    }
    Ok(decompressed)
}

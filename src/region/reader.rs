//! Decoding of region files into per-chunk block and biome data.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use super::{
    CHUNKS_PER_REGION, Header, RegionPos, chunk_to_local, local_to_index, index_to_local,
    unwrap_and_decompress_chunk,
};
use crate::nbt::{self, BlockStateNbt, ChunkNbt, PADDED_PACKING_DATA_VERSION};
use crate::storage::ChunkPos;

/// A block-state palette entry: name plus optional properties.
pub type BlockStateEntry = BlockStateNbt;

/// Number of cells in one 16x16x16 section.
const SECTION_VOLUME: usize = 16 * 16 * 16;

/// Number of 4x4x4 biome cells in one section.
const BIOME_CELLS: usize = 64;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file name is not of the form r.<x>.<z>.<ext>: {0}")]
    BadFileName(String),
    #[error("truncated data: {0}")]
    Truncated(&'static str),
    #[error("unsupported chunk compression type {0}")]
    UnsupportedCompression(u8),
    #[error("invalid NBT: {0}")]
    Nbt(#[from] fastnbt::error::Error),
    #[error("chunk {pos}: {source}")]
    Chunk {
        pos: ChunkPos,
        #[source]
        source: Box<RegionError>,
    },
}

/// Largest palette whose indices fit the unpacked `u16` form.
const MAX_PALETTE_LEN: usize = u16::MAX as usize + 1;

/// A palette plus one unpacked index per cell.
#[derive(Debug)]
struct Paletted<T> {
    palette: Vec<T>,
    // None when the palette has a single entry and no index data.
    indices: Option<Vec<u16>>,
}

impl<T> Paletted<T> {
    /// `None` for palettes too large to index; the section then reads as absent.
    fn new(pos: ChunkPos, palette: Vec<T>, data: Option<&[i64]>, bits: usize, cells: usize, spanning: bool) -> Option<Self> {
        if palette.len() > MAX_PALETTE_LEN {
            log::warn!("Chunk {pos} has a palette of {} entries, ignoring section", palette.len());
            return None;
        }
        let indices = data.map(|data| unpack_indices(data, bits, cells, spanning));
        Some(Self { palette, indices })
    }

    fn entry(&self, index: usize) -> Option<&T> {
        let palette_index = match &self.indices {
            Some(indices) => *indices.get(index)? as usize,
            None => 0,
        };
        self.palette.get(palette_index)
    }
}

#[derive(Debug, Default)]
enum ChunkBiomes {
    #[default]
    Missing,
    /// Numeric ids: 1024 cells of 4x4x4 over y 0..256, or 256 columns.
    Legacy(Vec<i32>),
    /// Named biomes per section, 64 cells each.
    Named(BTreeMap<i32, Paletted<String>>),
}

/// Biome of one cell as stored in the save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiomeRef<'a> {
    Id(i32),
    Name(&'a str),
}

/// Block and biome data of one decoded chunk. Read-only once decoded.
#[derive(Debug)]
pub struct AnvilChunk {
    pos: ChunkPos,
    sections: BTreeMap<i32, Paletted<BlockStateEntry>>,
    biomes: ChunkBiomes,
}

impl AnvilChunk {
    fn from_nbt(pos: ChunkPos, chunk: ChunkNbt) -> Self {
        let data_version = chunk.data_version.unwrap_or(0);
        let mut sections = BTreeMap::new();
        let mut biomes = ChunkBiomes::Missing;

        if let Some(level) = chunk.level {
            let spanning = data_version < PADDED_PACKING_DATA_VERSION;
            for section in level.sections.unwrap_or_default() {
                let Some(palette) = section.palette else { continue };
                let bits = bits_per_entry(palette.len());
                let data = section.block_states.as_deref();
                if let Some(paletted) = Paletted::new(pos, palette, data, bits, SECTION_VOLUME, spanning) {
                    sections.insert(section.y as i32, paletted);
                }
            }
            if let Some(ids) = level.biomes.as_ref().and_then(nbt::biome_ids) {
                biomes = ChunkBiomes::Legacy(ids);
            }
        } else if let Some(modern) = chunk.sections {
            let mut named = BTreeMap::new();
            for section in modern {
                if let Some(states) = section.block_states {
                    let bits = bits_per_entry(states.palette.len());
                    let data = states.data.as_deref();
                    if let Some(paletted) = Paletted::new(pos, states.palette, data, bits, SECTION_VOLUME, false) {
                        sections.insert(section.y as i32, paletted);
                    }
                }
                if let Some(section_biomes) = section.biomes {
                    let bits = biome_bits(section_biomes.palette.len());
                    let data = section_biomes.data.as_deref();
                    if let Some(paletted) = Paletted::new(pos, section_biomes.palette, data, bits, BIOME_CELLS, false) {
                        named.insert(section.y as i32, paletted);
                    }
                }
            }
            if !named.is_empty() {
                biomes = ChunkBiomes::Named(named);
            }
        }

        Self { pos, sections, biomes }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Block state at chunk-local coordinates.
    ///
    /// Missing sections and malformed index data both read as `None`.
    pub fn block_state_at(&self, x: usize, y: i32, z: usize) -> Option<&BlockStateEntry> {
        if x >= 16 || z >= 16 {
            return None;
        }
        let section = self.sections.get(&y.div_euclid(16))?;
        let index = (y.rem_euclid(16) as usize * 16 + z) * 16 + x;
        section.entry(index)
    }

    /// Biome stored for the block at chunk-local `x`, `z` and world `y`.
    pub fn biome_at(&self, x: usize, y: i32, z: usize) -> Option<BiomeRef<'_>> {
        if x >= 16 || z >= 16 {
            return None;
        }
        match &self.biomes {
            ChunkBiomes::Missing => None,
            ChunkBiomes::Legacy(ids) if ids.len() == 1024 => {
                if !(0..256).contains(&y) {
                    return None;
                }
                let index = ((y as usize / 4) * 4 + z / 4) * 4 + x / 4;
                Some(BiomeRef::Id(ids[index]))
            }
            ChunkBiomes::Legacy(ids) if ids.len() == 256 => Some(BiomeRef::Id(ids[z * 16 + x])),
            ChunkBiomes::Legacy(_) => None,
            ChunkBiomes::Named(sections) => {
                let section = sections.get(&y.div_euclid(16))?;
                let index = ((y.rem_euclid(16) as usize / 4) * 4 + z / 4) * 4 + x / 4;
                section.entry(index).map(|name| BiomeRef::Name(name.as_str()))
            }
        }
    }
}

/// Bits used per packed block palette index.
fn bits_per_entry(palette_len: usize) -> usize {
    ceil_log2(palette_len).max(4)
}

/// Biome palettes have no minimum width; a single entry needs no data.
fn biome_bits(palette_len: usize) -> usize {
    ceil_log2(palette_len).max(1)
}

fn ceil_log2(n: usize) -> usize {
    (usize::BITS - n.saturating_sub(1).leading_zeros()) as usize
}

/// Unpack up to `cells` palette indices from a packed long array.
///
/// Before 20w17a entries span long boundaries; afterwards each long is padded.
/// Short arrays yield fewer entries, which then read as absent.
fn unpack_indices(data: &[i64], bits: usize, cells: usize, spanning: bool) -> Vec<u16> {
    let mask = (1u64 << bits) - 1;
    let mut indices = Vec::with_capacity(cells);

    if spanning {
        for i in 0..cells {
            let bit = i * bits;
            let (word, offset) = (bit / 64, bit % 64);
            let Some(&low) = data.get(word) else { break };
            let mut value = (low as u64) >> offset;
            if offset + bits > 64 {
                let Some(&high) = data.get(word + 1) else { break };
                value |= (high as u64) << (64 - offset);
            }
            indices.push((value & mask) as u16);
        }
    } else {
        let per_long = 64 / bits;
        'longs: for &long in data {
            for j in 0..per_long {
                if indices.len() == cells {
                    break 'longs;
                }
                indices.push(((long as u64 >> (j * bits)) & mask) as u16);
            }
        }
    }
    indices
}

/// Decoded contents of one region file.
#[derive(Debug)]
pub struct RegionData {
    pos: RegionPos,
    chunks: Vec<Option<AnvilChunk>>,
}

impl RegionData {
    /// Read and decode a region file. The coordinates come from its file name.
    pub fn open(path: &Path) -> Result<Self, RegionError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pos = RegionPos::from_filename(&name).ok_or(RegionError::BadFileName(name))?;
        let data = std::fs::read(path)?;
        Self::from_bytes(pos, &data)
    }

    /// Decode raw region bytes. Any damaged chunk fails the whole region.
    pub fn from_bytes(pos: RegionPos, data: &[u8]) -> Result<Self, RegionError> {
        let header = Header::parse(data)?;
        let mut chunks: Vec<Option<AnvilChunk>> = (0..CHUNKS_PER_REGION).map(|_| None).collect();

        for (index, location) in header.present_chunks() {
            let (local_x, local_z) = index_to_local(index);
            let chunk_pos = pos.local_to_world(local_x, local_z);

            let decoded = decode_chunk(data, location.byte_offset(), location.byte_len())
                .and_then(|nbt| Ok(fastnbt::from_bytes::<ChunkNbt>(&nbt)?))
                .map_err(|source| RegionError::Chunk {
                    pos: chunk_pos,
                    source: Box::new(source),
                })?;

            chunks[index] = Some(AnvilChunk::from_nbt(chunk_pos, decoded));
        }

        Ok(Self { pos, chunks })
    }

    /// Region coordinates.
    pub fn pos(&self) -> RegionPos {
        self.pos
    }

    /// Chunk at world chunk coordinates; `None` if never generated or outside this region.
    pub fn chunk(&self, pos: ChunkPos) -> Option<&AnvilChunk> {
        if !self.pos.contains(pos) {
            return None;
        }
        let index = local_to_index(chunk_to_local(pos.x), chunk_to_local(pos.z));
        self.chunks[index].as_ref()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }
}

fn decode_chunk(data: &[u8], offset: usize, len: usize) -> Result<Vec<u8>, RegionError> {
    if offset + 5 > data.len() {
        return Err(RegionError::Truncated("chunk sectors lie outside the file"));
    }
    let end = (offset + len).min(data.len());
    unwrap_and_decompress_chunk(&data[offset..end])
}

//! Chunks of the target world engine.
//!
//! This module handles:
//! - The dense block/biome grid of one converted chunk
//! - Chunk serialization for storage (NBT + compression)
//! - The generator interface chunks are produced through

mod generator;

pub use generator::{ChunkGenerator, VoidGenerator};

use anyhow::{Result, bail, ensure};
use fastnbt::IntArray;
use serde::{Deserialize, Serialize};

use crate::catalog::{BiomeId, BlockId};
use crate::region::{compress_and_wrap_chunk, unwrap_and_decompress_chunk};
use crate::storage::ChunkPos;

/// Vertical extent of the target world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldDimensions {
    pub min_y: i32,
    /// Number of block layers, a multiple of 16.
    pub height: u32,
}

impl Default for WorldDimensions {
    fn default() -> Self {
        Self { min_y: 0, height: 256 }
    }
}

impl WorldDimensions {
    /// Lowest supported minimum y.
    pub const MIN_Y: i32 = -2032;
    /// Highest supported exclusive upper bound.
    pub const MAX_Y: i32 = 2032;

    pub fn new(min_y: i32, height: u32) -> Result<Self> {
        if height == 0 || height % 16 != 0 {
            bail!("world height must be a positive multiple of 16, got {height}");
        }
        ensure!(min_y % 16 == 0, "minimum y must be section aligned, got {min_y}");
        ensure!(
            min_y >= Self::MIN_Y && i64::from(min_y) + i64::from(height) <= i64::from(Self::MAX_Y),
            "world must lie within y {}..{}, got {min_y} with height {height}",
            Self::MIN_Y,
            Self::MAX_Y
        );
        Ok(Self { min_y, height })
    }

    /// Exclusive upper bound.
    pub fn max_y(&self) -> i32 {
        self.min_y + self.height as i32
    }

    pub fn block_count(&self) -> usize {
        16 * 16 * self.height as usize
    }

    /// Biomes are stored per 4x4x4 cell.
    pub fn biome_count(&self) -> usize {
        4 * 4 * (self.height as usize / 4)
    }
}

/// A fully realized chunk column.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pos: ChunkPos,
    dims: WorldDimensions,
    blocks: Vec<BlockId>,
    biomes: Vec<BiomeId>,
}

// --- Storage representation ---
#[derive(Serialize, Deserialize)]
struct StoredChunk {
    #[serde(rename = "xPos")]
    x_pos: i32,
    #[serde(rename = "zPos")]
    z_pos: i32,
    #[serde(rename = "MinY")]
    min_y: i32,
    #[serde(rename = "Height")]
    height: i32,
    #[serde(rename = "Blocks")]
    blocks: IntArray,
    #[serde(rename = "Biomes")]
    biomes: IntArray,
}

impl Chunk {
    /// Empty chunk: air everywhere, biome id 0 until a generator fills them.
    pub fn new(pos: ChunkPos, dims: WorldDimensions) -> Self {
        Self {
            pos,
            dims,
            blocks: vec![BlockId::AIR; dims.block_count()],
            biomes: vec![BiomeId(0); dims.biome_count()],
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn dimensions(&self) -> WorldDimensions {
        self.dims
    }

    fn index(&self, x: usize, y: i32, z: usize) -> Option<usize> {
        if x >= 16 || z >= 16 || y < self.dims.min_y || y >= self.dims.max_y() {
            return None;
        }
        Some(((y - self.dims.min_y) as usize * 16 + z) * 16 + x)
    }

    /// Set a block at chunk-local coordinates. Returns false when out of range.
    pub fn set_block(&mut self, x: usize, y: i32, z: usize, block: BlockId) -> bool {
        match self.index(x, y, z) {
            Some(index) => {
                self.blocks[index] = block;
                true
            }
            None => false,
        }
    }

    pub fn block(&self, x: usize, y: i32, z: usize) -> BlockId {
        self.index(x, y, z).map_or(BlockId::AIR, |i| self.blocks[i])
    }

    /// Number of non-air blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.iter().filter(|&&b| b != BlockId::AIR).count()
    }

    /// Biome cells, indexed `(cell_y * 4 + cell_z) * 4 + cell_x` from `min_y` upwards.
    pub fn biomes(&self) -> &[BiomeId] {
        &self.biomes
    }

    pub fn biomes_mut(&mut self) -> &mut [BiomeId] {
        &mut self.biomes
    }

    /// Serialize to NBT, compress with Zlib and frame like an Anvil payload.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let stored = StoredChunk {
            x_pos: self.pos.x,
            z_pos: self.pos.z,
            min_y: self.dims.min_y,
            height: self.dims.height as i32,
            blocks: IntArray::new(self.blocks.iter().map(|b| b.0 as i32).collect()),
            biomes: IntArray::new(self.biomes.iter().map(|b| b.0 as i32).collect()),
        };
        let nbt = fastnbt::to_bytes(&stored)?;
        Ok(compress_and_wrap_chunk(&nbt)?)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let nbt = unwrap_and_decompress_chunk(blob)?;
        let stored: StoredChunk = fastnbt::from_bytes(&nbt)?;
        let dims = WorldDimensions::new(stored.min_y, u32::try_from(stored.height)?)?;
        ensure!(
            stored.blocks.len() == dims.block_count() && stored.biomes.len() == dims.biome_count(),
            "stored chunk ({}, {}) has inconsistent array sizes",
            stored.x_pos,
            stored.z_pos
        );

        Ok(Self {
            pos: ChunkPos::new(stored.x_pos, stored.z_pos),
            dims,
            blocks: stored.blocks.iter().map(|&b| BlockId(b as u16)).collect(),
            biomes: stored.biomes.iter().map(|&b| BiomeId(b as u16)).collect(),
        })
    }
}

//! Chunk generators.

use crate::catalog::BiomeId;

use super::Chunk;

/// Produces the contents of chunks the world has no stored data for.
///
/// Called from blocking worker threads, possibly for many chunks at once.
pub trait ChunkGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Place blocks into a freshly allocated (all air) chunk.
    fn generate_chunk_data(&self, chunk: &mut Chunk);

    /// Fill the 4x4x4 biome cells of a freshly allocated chunk.
    fn fill_biomes(&self, chunk: &mut Chunk);
}

/// Generates void: no blocks, one biome everywhere.
pub struct VoidGenerator {
    biome: BiomeId,
}

impl VoidGenerator {
    pub fn new(biome: BiomeId) -> Self {
        Self { biome }
    }
}

impl ChunkGenerator for VoidGenerator {
    fn name(&self) -> &'static str {
        "void"
    }

    fn generate_chunk_data(&self, _chunk: &mut Chunk) {}

    fn fill_biomes(&self, chunk: &mut Chunk) {
        chunk.biomes_mut().fill(self.biome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::WorldDimensions;
    use crate::storage::ChunkPos;

    #[test]
    fn test_void_generator() {
        let generator = VoidGenerator::new(BiomeId(1));
        let pos = ChunkPos::new(100, -100);
        let mut chunk = Chunk::new(pos, WorldDimensions::default());

        generator.generate_chunk_data(&mut chunk);
        generator.fill_biomes(&mut chunk);

        assert_eq!(chunk.block_count(), 0);
        assert!(chunk.biomes().iter().all(|&b| b == BiomeId(1)));
    }
}

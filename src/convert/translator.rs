//! Translation of decoded Anvil chunks into target-engine chunks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::catalog::{BiomeCatalog, BlockCatalog, BlockId};
use crate::chunk::{Chunk, ChunkGenerator};
use crate::nbt;
use crate::region::{AnvilChunk, BiomeRef, BlockStateEntry, RegionData, RegionPos};
use crate::storage::ChunkPos;

use super::cache::RegionCache;

/// Generator that fills chunks from the region currently held in the cache.
///
/// Chunks outside the cached region come out empty.
pub struct AnvilGenerator {
    cache: Arc<RegionCache>,
    blocks: Arc<BlockCatalog>,
    biomes: Arc<BiomeCatalog>,
}

impl AnvilGenerator {
    pub fn new(cache: Arc<RegionCache>, blocks: Arc<BlockCatalog>, biomes: Arc<BiomeCatalog>) -> Self {
        Self { cache, blocks, biomes }
    }

    fn region_for(&self, pos: ChunkPos) -> Option<Arc<RegionData>> {
        let region = RegionPos::of_chunk(pos);
        let data = self.cache.region_at(region);
        if data.is_none() {
            log::error!("Chunk {pos} requested but region {region} is not loaded");
        }
        data
    }

    /// Copy every translatable block of `source` into `chunk`.
    pub fn translate_blocks(&self, source: &AnvilChunk, chunk: &mut Chunk) {
        let dims = chunk.dimensions();
        // Palette entries repeat across thousands of cells.
        let mut resolved: HashMap<*const BlockStateEntry, Option<BlockId>> = HashMap::new();
        let mut warned = HashSet::new();

        for x in 0..16 {
            for z in 0..16 {
                for y in dims.min_y..dims.max_y() {
                    let Some(entry) = source.block_state_at(x, y, z) else { continue };
                    let block = *resolved
                        .entry(std::ptr::from_ref(entry))
                        .or_insert_with(|| self.resolve(entry));

                    match block {
                        Some(block) => {
                            chunk.set_block(x, y, z, block);
                        }
                        None => {
                            if warned.insert(entry.name.clone()) {
                                log::warn!(
                                    "Unknown block {} in chunk {}, skipping",
                                    entry.name,
                                    source.pos()
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    fn resolve(&self, entry: &BlockStateEntry) -> Option<BlockId> {
        let Some(properties) = &entry.properties else {
            return self.blocks.lookup(&entry.name, &[]);
        };
        let mut pairs: Vec<String> = properties
            .iter()
            .filter_map(|(key, value)| {
                let value = nbt::render_value(value)?;
                Some(format!("{}={}", key.replace('"', ""), value))
            })
            .collect();
        pairs.sort();
        self.blocks.lookup(&entry.name, &pairs)
    }

    /// Default-fill the biome cells of `chunk`, then overlay every mappable
    /// biome `source` stores at the same world height.
    pub fn translate_biomes(&self, source: Option<&AnvilChunk>, chunk: &mut Chunk) {
        let min_y = chunk.dimensions().min_y;
        let biomes = chunk.biomes_mut();
        biomes.fill(self.biomes.default_biome());
        let Some(source) = source else { return };

        for (slot, cell) in biomes.iter_mut().enumerate() {
            let x = (slot % 4) * 4;
            let z = (slot / 4 % 4) * 4;
            let y = min_y + (slot / 16) as i32 * 4;
            let mapped = match source.biome_at(x, y, z) {
                Some(BiomeRef::Id(id)) => self.biomes.by_id(id),
                Some(BiomeRef::Name(name)) => self.biomes.by_name(name),
                None => None,
            };
            if let Some(biome) = mapped {
                *cell = biome;
            }
        }
    }
}

impl ChunkGenerator for AnvilGenerator {
    fn name(&self) -> &'static str {
        "anvil"
    }

    fn generate_chunk_data(&self, chunk: &mut Chunk) {
        let Some(region) = self.region_for(chunk.pos()) else { return };
        if let Some(source) = region.chunk(chunk.pos()) {
            self.translate_blocks(source, chunk);
        }
    }

    fn fill_biomes(&self, chunk: &mut Chunk) {
        let pos = chunk.pos();
        let region = self.cache.region_at(RegionPos::of_chunk(pos));
        let source = region.as_deref().and_then(|region| region.chunk(pos));
        self.translate_biomes(source, chunk);
    }
}

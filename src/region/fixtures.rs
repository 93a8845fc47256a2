//! Synthetic region files for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use fastnbt::{IntArray, LongArray, Value};
use flate2::Compression;
use flate2::write::GzEncoder;

use super::{
    HEADER_SIZE, SECTOR_SIZE, chunk_to_local, compress_and_wrap_chunk, compression, local_to_index,
};
use crate::nbt::{
    BiomePalette, BlockStateNbt, BlockStates, ChunkNbt, LegacyLevel, LegacySection,
    PADDED_PACKING_DATA_VERSION, Section,
};
use crate::storage::ChunkPos;

/// Builder for one chunk of a synthetic region.
pub(crate) struct ChunkFixture {
    pub pos: ChunkPos,
    pub data_version: i32,
    pub modern: bool,
    pub gzip: bool,
    pub biomes: Option<Vec<i32>>,
    // section y -> (cell index -> block state)
    sections: BTreeMap<i32, BTreeMap<usize, BlockStateNbt>>,
    // section y -> 64 biome names (modern layout only)
    section_biomes: BTreeMap<i32, Vec<String>>,
}

impl ChunkFixture {
    pub fn new(x: i32, z: i32) -> Self {
        Self {
            pos: ChunkPos::new(x, z),
            data_version: 2230,
            modern: false,
            gzip: false,
            biomes: None,
            sections: BTreeMap::new(),
            section_biomes: BTreeMap::new(),
        }
    }

    /// Named biomes of one modern section: a single name, or one per 4x4x4 cell.
    pub fn set_section_biomes(&mut self, section_y: i32, names: &[&str]) {
        assert!(names.len() == 1 || names.len() == 64);
        self.section_biomes
            .insert(section_y, names.iter().map(|n| n.to_string()).collect());
    }

    pub fn set_block(&mut self, x: usize, y: i32, z: usize, name: &str, properties: &[(&str, &str)]) {
        let properties = (!properties.is_empty()).then(|| {
            properties
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect::<HashMap<_, _>>()
        });
        let index = (y.rem_euclid(16) as usize * 16 + z) * 16 + x;
        self.sections
            .entry(y.div_euclid(16))
            .or_default()
            .insert(index, BlockStateNbt { name: name.to_string(), properties });
    }

    fn to_nbt(&self) -> ChunkNbt {
        let spanning = !self.modern && self.data_version < PADDED_PACKING_DATA_VERSION;
        let mut legacy = Vec::new();
        let mut modern = Vec::new();

        let section_ys: BTreeSet<i32> =
            self.sections.keys().chain(self.section_biomes.keys()).copied().collect();
        for y in section_ys {
            let block_states = self.sections.get(&y).map(|cells| {
                let mut palette = vec![BlockStateNbt { name: "minecraft:air".into(), properties: None }];
                let mut indices = vec![0u16; 4096];
                for (&index, state) in cells {
                    let position = palette
                        .iter()
                        .position(|p| p.name == state.name && p.properties == state.properties)
                        .unwrap_or_else(|| {
                            palette.push(state.clone());
                            palette.len() - 1
                        });
                    indices[index] = position as u16;
                }

                let bits = (usize::BITS - (palette.len() - 1).leading_zeros()).max(4) as usize;
                let data = if spanning {
                    pack_spanning(&indices, bits)
                } else {
                    pack_padded(&indices, bits)
                };
                (palette, data)
            });

            if self.modern {
                modern.push(Section {
                    y: y as i8,
                    block_states: block_states.map(|(palette, data)| BlockStates {
                        palette,
                        data: Some(LongArray::new(data)),
                    }),
                    biomes: self.section_biomes.get(&y).map(|names| biome_palette(names)),
                });
            } else if let Some((palette, data)) = block_states {
                legacy.push(LegacySection {
                    y: y as i8,
                    palette: Some(palette),
                    block_states: Some(LongArray::new(data)),
                });
            }
        }

        if self.modern {
            ChunkNbt {
                data_version: Some(self.data_version),
                level: None,
                sections: Some(modern),
            }
        } else {
            ChunkNbt {
                data_version: Some(self.data_version),
                level: Some(LegacyLevel {
                    sections: Some(legacy),
                    biomes: self.biomes.clone().map(|ids| Value::IntArray(IntArray::new(ids))),
                }),
                sections: None,
            }
        }
    }

    fn to_blob(&self) -> Vec<u8> {
        let nbt = fastnbt::to_bytes(&self.to_nbt()).unwrap();
        if !self.gzip {
            return compress_and_wrap_chunk(&nbt).unwrap();
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&nbt).unwrap();
        let compressed = encoder.finish().unwrap();
        let mut blob = ((compressed.len() + 1) as u32).to_be_bytes().to_vec();
        blob.push(compression::GZIP);
        blob.extend_from_slice(&compressed);
        blob
    }
}

fn biome_palette(names: &[String]) -> BiomePalette {
    let mut palette: Vec<String> = Vec::new();
    let indices: Vec<u16> = names
        .iter()
        .map(|name| {
            let position = palette.iter().position(|p| p == name).unwrap_or_else(|| {
                palette.push(name.clone());
                palette.len() - 1
            });
            position as u16
        })
        .collect();

    let data = (palette.len() > 1).then(|| {
        let bits = (usize::BITS - (palette.len() - 1).leading_zeros()) as usize;
        LongArray::new(pack_padded(&indices, bits))
    });
    BiomePalette { palette, data }
}

pub(crate) fn pack_padded(values: &[u16], bits: usize) -> Vec<i64> {
    let per_long = 64 / bits;
    values
        .chunks(per_long)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u64, |acc, (j, &v)| acc | ((v as u64) << (j * bits))) as i64
        })
        .collect()
}

pub(crate) fn pack_spanning(values: &[u16], bits: usize) -> Vec<i64> {
    let mut longs = vec![0u64; (values.len() * bits).div_ceil(64)];
    for (i, &v) in values.iter().enumerate() {
        let bit = i * bits;
        let (word, offset) = (bit / 64, bit % 64);
        longs[word] |= (v as u64) << offset;
        if offset + bits > 64 {
            longs[word + 1] |= (v as u64) >> (64 - offset);
        }
    }
    longs.into_iter().map(|l| l as i64).collect()
}

/// Encode chunks into the bytes of one region file.
pub(crate) fn region_bytes(chunks: &[ChunkFixture]) -> Vec<u8> {
    let mut data = vec![0u8; HEADER_SIZE];
    for chunk in chunks {
        let mut blob = chunk.to_blob();
        let sector_offset = (data.len() / SECTOR_SIZE) as u32;
        let sector_count = blob.len().div_ceil(SECTOR_SIZE);
        blob.resize(sector_count * SECTOR_SIZE, 0);

        let index = local_to_index(chunk_to_local(chunk.pos.x), chunk_to_local(chunk.pos.z));
        let entry = &mut data[index * 4..index * 4 + 4];
        entry[..3].copy_from_slice(&sector_offset.to_be_bytes()[1..]);
        entry[3] = sector_count as u8;
        data.extend_from_slice(&blob);
    }
    data
}

/// Write a region file `<world>/region/<name>` and return its path.
pub(crate) fn write_region(world: &Path, name: &str, chunks: &[ChunkFixture]) -> PathBuf {
    let dir = world.join("region");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, region_bytes(chunks)).unwrap();
    path
}

//! NBT (Named Binary Tag) structures for Anvil chunk data.
//!
//! Two layouts are understood:
//! - Legacy (1.13 – 1.17): everything lives under a `Level` compound, sections
//!   carry `Palette` + `BlockStates`, biomes are a numeric `Biomes` int array.
//! - Modern (1.18+): `sections` at the root with `block_states { palette, data }`
//!   and named biomes in `biomes { palette, data }`.

use std::collections::HashMap;

use fastnbt::{LongArray, Value};
use serde::{Deserialize, Serialize};

/// First data version whose packed block indices no longer span two longs (20w17a).
pub const PADDED_PACKING_DATA_VERSION: i32 = 2527;

/// Main chunk structure - the root of NBT hierarchy in .mca files.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChunkNbt {
    #[serde(rename = "DataVersion", default, skip_serializing_if = "Option::is_none")]
    pub data_version: Option<i32>,

    // Legacy layout
    #[serde(rename = "Level", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LegacyLevel>,

    // Modern layout: vertical slices of the chunk (16 blocks high each)
    #[serde(rename = "sections", default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LegacyLevel {
    #[serde(rename = "Sections", default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<LegacySection>>,

    // IntArray since 1.13, ByteArray in older worlds.
    #[serde(rename = "Biomes", default, skip_serializing_if = "Option::is_none")]
    pub biomes: Option<Value>,
}

// --- Legacy Section (16x16x16 Cube) ---
#[derive(Debug, Serialize, Deserialize)]
pub struct LegacySection {
    #[serde(rename = "Y")]
    pub y: i8,

    // Empty (all air) sections omit the palette.
    #[serde(rename = "Palette", default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<BlockStateNbt>>,

    #[serde(rename = "BlockStates", default, skip_serializing_if = "Option::is_none")]
    pub block_states: Option<LongArray>,
}

// --- Modern Section ---
#[derive(Debug, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "Y")]
    pub y: i8,

    #[serde(rename = "block_states", default, skip_serializing_if = "Option::is_none")]
    pub block_states: Option<BlockStates>,

    // One entry per 4x4x4 cell, by biome name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biomes: Option<BiomePalette>,
}

// --- Block Palette ---
// Minecraft uses "Paletted Storage". Instead of storing 4096 block IDs,
// it stores a list of unique blocks (Palette).
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockStates {
    pub palette: Vec<BlockStateNbt>,
    // Indices into the palette. Required if palette length > 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LongArray>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BiomePalette {
    pub palette: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LongArray>,
}

// --- Single Block ---
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStateNbt {
    #[serde(rename = "Name")]
    pub name: String,

    // Properties like waterlogged or facing.
    #[serde(rename = "Properties", default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,
}

/// Render a tag value as the plain string used in `key=value` property pairs.
///
/// Quote characters are stripped; compound and list values have no string form.
pub fn render_value(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::String(s) => s.clone(),
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        _ => return None,
    };
    Some(rendered.replace('"', ""))
}

/// Read a numeric biome array (IntArray or legacy ByteArray).
pub fn biome_ids(value: &Value) -> Option<Vec<i32>> {
    match value {
        Value::IntArray(ids) => Some(ids.iter().copied().collect()),
        // Byte biome ids are unsigned.
        Value::ByteArray(ids) => Some(ids.iter().map(|&id| id as u8 as i32).collect()),
        Value::List(ids) => ids.iter().map(|v| v.as_i64().map(|id| id as i32)).collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastnbt::{ByteArray, IntArray};

    #[test]
    fn test_render_value_strips_quotes() {
        assert_eq!(render_value(&Value::String("\"north\"".into())), Some("north".into()));
        assert_eq!(render_value(&Value::Int(7)), Some("7".into()));
        assert_eq!(render_value(&Value::Byte(1)), Some("1".into()));
        assert_eq!(render_value(&Value::Compound(HashMap::new())), None);
    }

    #[test]
    fn test_biome_ids_from_arrays() {
        assert_eq!(biome_ids(&Value::IntArray(IntArray::new(vec![1, 4]))), Some(vec![1, 4]));
        assert_eq!(biome_ids(&Value::ByteArray(ByteArray::new(vec![-127, 2]))), Some(vec![129, 2]));
        assert_eq!(biome_ids(&Value::String("plains".into())), None);
    }

    #[test]
    fn test_legacy_chunk_nbt_parses() {
        let chunk = ChunkNbt {
            data_version: Some(2230),
            level: Some(LegacyLevel {
                sections: Some(vec![LegacySection {
                    y: 0,
                    palette: Some(vec![BlockStateNbt {
                        name: "minecraft:stone".into(),
                        properties: None,
                    }]),
                    block_states: None,
                }]),
                biomes: Some(Value::IntArray(IntArray::new(vec![1; 1024]))),
            }),
            sections: None,
        };

        let bytes = fastnbt::to_bytes(&chunk).unwrap();
        let parsed: ChunkNbt = fastnbt::from_bytes(&bytes).unwrap();
        let level = parsed.level.unwrap();
        assert_eq!(level.sections.unwrap()[0].palette.as_ref().unwrap()[0].name, "minecraft:stone");
        assert_eq!(biome_ids(&level.biomes.unwrap()).unwrap().len(), 1024);
        assert!(parsed.sections.is_none());
    }
}

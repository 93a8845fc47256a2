use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use super::{BiomeId, namespaced};

const BUILTIN_BIOMES: &str = include_str!("../../assets/biomes.json");

/// Biome every chunk cell starts with.
pub const DEFAULT_BIOME: &str = "minecraft:plains";

#[derive(Deserialize)]
struct BiomeEntry {
    id: i32,
    name: String,
}

/// Numeric legacy biome ids mapped to target-engine biomes.
pub struct BiomeCatalog {
    by_id: HashMap<i32, BiomeId>,
    by_name: HashMap<String, BiomeId>,
    default_biome: BiomeId,
}

impl BiomeCatalog {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_BIOMES).context("parsing bundled biome registry")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading biome registry {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing biome registry {}", path.display()))
    }

    /// Parse `[{ "id": 1, "name": "minecraft:plains" }, ...]`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<BiomeEntry> = serde_json::from_str(json)?;
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());

        for entry in entries {
            let id = u16::try_from(entry.id)
                .map(BiomeId)
                .map_err(|_| anyhow!("biome {} has out of range id {}", entry.name, entry.id))?;
            by_id.insert(entry.id, id);
            by_name.insert(namespaced(&entry.name), id);
        }

        let default_biome = *by_name
            .get(DEFAULT_BIOME)
            .ok_or_else(|| anyhow!("biome registry lacks {DEFAULT_BIOME}"))?;

        Ok(Self { by_id, by_name, default_biome })
    }

    /// Target biome for a numeric id from the world save.
    pub fn by_id(&self, id: i32) -> Option<BiomeId> {
        self.by_id.get(&id).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<BiomeId> {
        self.by_name.get(&namespaced(name)).copied()
    }

    pub fn default_biome(&self) -> BiomeId {
        self.default_biome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_biomes() {
        let catalog = BiomeCatalog::builtin().unwrap();
        assert_eq!(catalog.default_biome(), BiomeId(1));
        assert_eq!(catalog.by_id(2), catalog.by_name("minecraft:desert"));
        assert_eq!(catalog.by_name("plains"), Some(catalog.default_biome()));
    }

    #[test]
    fn test_unknown_biome_id() {
        let catalog = BiomeCatalog::builtin().unwrap();
        assert_eq!(catalog.by_id(-5), None);
        assert_eq!(catalog.by_id(250), None);
    }

    #[test]
    fn test_registry_requires_plains() {
        assert!(BiomeCatalog::from_json(r#"[{ "id": 0, "name": "minecraft:ocean" }]"#).is_err());
        assert!(BiomeCatalog::from_json(r#"[{ "id": -1, "name": "minecraft:plains" }]"#).is_err());
    }
}

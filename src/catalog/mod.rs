//! Block and biome vocabularies of the target world engine.
//!
//! Both catalogs are built once at startup and shared read-only (`Arc`)
//! by every chunk conversion.

mod biomes;
mod blocks;

pub use biomes::BiomeCatalog;
pub use blocks::{BlockCatalog, canonical_properties};

use serde::{Deserialize, Serialize};

/// Block-state id in the target engine.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);
}

/// Biome id in the target engine.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BiomeId(pub u16);

/// Prefix bare names with the vanilla namespace.
pub(crate) fn namespaced(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("minecraft:{name}")
    }
}

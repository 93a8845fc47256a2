use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::{BlockId, namespaced};

#[cfg(test)]
const SAMPLE_BLOCKS: &str = include_str!("testdata/blocks.json");

// --- Data generator report format (`reports/blocks.json`) ---
#[derive(Deserialize)]
struct BlockReport {
    states: Vec<StateReport>,
}

#[derive(Deserialize)]
struct StateReport {
    id: u16,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    default: bool,
}

struct BlockEntry {
    default_state: BlockId,
    // canonical "k=v,k=v" -> state
    states: HashMap<String, BlockId>,
}

/// Join `key=value` strings in ascending order into one lookup key.
pub fn canonical_properties<I, S>(properties: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pairs: Vec<String> = properties.into_iter().map(|p| p.as_ref().to_string()).collect();
    pairs.sort();
    pairs.join(",")
}

/// Mapping from block names (plus properties) to target-engine block states.
pub struct BlockCatalog {
    blocks: HashMap<String, BlockEntry>,
}

impl BlockCatalog {
    /// Small excerpt of the 1.16 registry, enough for synthetic worlds.
    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        Self::from_json(SAMPLE_BLOCKS).unwrap()
    }

    /// Load a vanilla data generator `blocks.json` report.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading block registry {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing block registry {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let report: HashMap<String, BlockReport> = serde_json::from_str(json)?;
        let mut blocks = HashMap::with_capacity(report.len());

        for (name, block) in report {
            let Some(first) = block.states.first() else {
                bail!("block {name} has no states");
            };
            let default_state = block
                .states
                .iter()
                .find(|s| s.default)
                .map_or(BlockId(first.id), |s| BlockId(s.id));

            let states = block
                .states
                .iter()
                .map(|state| {
                    let key = canonical_properties(
                        state.properties.iter().map(|(k, v)| format!("{k}={v}")),
                    );
                    (key, BlockId(state.id))
                })
                .collect();

            blocks.insert(name, BlockEntry { default_state, states });
        }

        log::debug!("Block catalog built with {} blocks", blocks.len());
        Ok(Self { blocks })
    }

    /// Look up a block state.
    ///
    /// `properties` are `key=value` strings; an empty slice selects the default
    /// state. `None` when the name is unknown or no state has exactly this
    /// property set.
    pub fn lookup(&self, name: &str, properties: &[String]) -> Option<BlockId> {
        if properties.is_empty() {
            return self.blocks.get(&namespaced(name)).map(|entry| entry.default_state);
        }
        self.with_properties(name, properties)
    }

    /// State of `name` whose full property set equals `properties`.
    pub fn with_properties(&self, name: &str, properties: &[String]) -> Option<BlockId> {
        let entry = self.blocks.get(&namespaced(name))?;
        entry.states.get(&canonical_properties(properties)).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

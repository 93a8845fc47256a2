//! Command line configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::chunk::WorldDimensions;
use crate::convert::ConverterConfig;
use crate::storage::{ChunkStorage, DirectoryStorage, MemoryStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// One file per chunk below the output directory
    File,
    /// Keep converted chunks in memory (dry run)
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "anvil-convert", about = "Convert an Anvil world save into chunk storage")]
pub struct Args {
    /// Path to the world folder (the one containing `region/`)
    pub world: PathBuf,

    /// Output directory for converted chunks
    #[arg(short, long, env = "OUTPUT_DIR", default_value = "converted_world")]
    pub output: PathBuf,

    #[arg(long, env = "STORAGE", value_enum, default_value = "file")]
    pub storage: StorageKind,

    /// Block registry of the target version (data generator `reports/blocks.json`)
    #[arg(long, env = "BLOCKS_REGISTRY")]
    pub blocks: PathBuf,

    /// Biome id table overriding the bundled one
    #[arg(long)]
    pub biomes: Option<PathBuf>,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub min_y: i32,

    #[arg(long, default_value_t = 256)]
    pub height: u32,

    /// Chunks converted concurrently (defaults to available parallelism)
    #[arg(short, long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Give up on a chunk after this many seconds
    #[arg(long)]
    pub chunk_timeout: Option<u64>,
}

impl Args {
    pub fn dimensions(&self) -> Result<WorldDimensions> {
        WorldDimensions::new(self.min_y, self.height)
    }

    pub fn converter_config(&self) -> ConverterConfig {
        let mut config = ConverterConfig::default();
        if let Some(workers) = self.workers {
            config.workers = workers.max(1);
        }
        config.chunk_timeout = self.chunk_timeout.map(Duration::from_secs);
        config
    }

    pub fn open_storage(&self) -> Result<Arc<dyn ChunkStorage>> {
        Ok(match self.storage {
            StorageKind::File => {
                log::info!("Storage: directory {}", self.output.display());
                Arc::new(DirectoryStorage::new(&self.output)?)
            }
            StorageKind::Memory => {
                log::warn!("Storage: in-memory (converted chunks are lost on exit)");
                Arc::new(MemoryStorage::new())
            }
        })
    }
}

//! The target world: chunk lifecycle on top of a storage backend.
//!
//! Chunks are provided by checking storage first, then falling back to the
//! currently installed generator (when on-demand loading is enabled).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use anyhow::{Result, bail};

use crate::chunk::{Chunk, ChunkGenerator, WorldDimensions};
use crate::metrics::WorldMetrics;
use crate::storage::{ChunkPos, ChunkStorage};

pub struct World {
    storage: Arc<dyn ChunkStorage>,
    dims: WorldDimensions,
    generator: RwLock<Arc<dyn ChunkGenerator>>,
    auto_load: AtomicBool,
    accepting: AtomicBool,
    loaded: Mutex<HashMap<ChunkPos, Arc<Chunk>>>,
    metrics: WorldMetrics,
}

impl World {
    pub fn new(
        storage: Arc<dyn ChunkStorage>,
        dims: WorldDimensions,
        generator: Arc<dyn ChunkGenerator>,
    ) -> Self {
        Self {
            storage,
            dims,
            generator: RwLock::new(generator),
            auto_load: AtomicBool::new(false),
            accepting: AtomicBool::new(true),
            loaded: Mutex::new(HashMap::new()),
            metrics: WorldMetrics::new(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn ChunkStorage> {
        &self.storage
    }

    pub fn metrics(&self) -> &WorldMetrics {
        &self.metrics
    }

    /// Install the generator used for chunks missing from storage.
    pub fn set_generator(&self, generator: Arc<dyn ChunkGenerator>) {
        log::debug!("Installing {} generator", generator.name());
        *self.generator.write().unwrap_or_else(PoisonError::into_inner) = generator;
    }

    pub fn generator(&self) -> Arc<dyn ChunkGenerator> {
        self.generator.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Allow `load_chunk` to generate chunks that are not in storage.
    pub fn enable_auto_chunk_load(&self, enabled: bool) {
        self.auto_load.store(enabled, Ordering::SeqCst);
    }

    pub fn auto_chunk_load(&self) -> bool {
        self.auto_load.load(Ordering::SeqCst)
    }

    /// Stop accepting chunk loads and drop every loaded chunk.
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn loaded_chunk_count(&self) -> usize {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn loaded_chunk(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).get(&pos).cloned()
    }

    /// Load a chunk: already loaded, then storage, then the generator.
    pub async fn load_chunk(&self, pos: ChunkPos) -> Result<Arc<Chunk>> {
        if !self.is_accepting() {
            bail!("world is shutting down, refusing to load chunk {pos}");
        }
        if let Some(chunk) = self.loaded_chunk(pos) {
            return Ok(chunk);
        }

        let start = Instant::now();
        let storage = Arc::clone(&self.storage);
        let stored = tokio::task::spawn_blocking(move || storage.get(pos)).await??;

        let chunk = match stored {
            Some(blob) => {
                let chunk = Chunk::from_blob(&blob)?;
                self.metrics.record_load(start.elapsed());
                chunk
            }
            None => {
                if !self.auto_chunk_load() {
                    bail!("chunk {pos} is not stored and on-demand loading is disabled");
                }
                let generator = self.generator();
                let dims = self.dims;
                let chunk = tokio::task::spawn_blocking(move || {
                    let mut chunk = Chunk::new(pos, dims);
                    generator.fill_biomes(&mut chunk);
                    generator.generate_chunk_data(&mut chunk);
                    chunk
                })
                .await?;
                self.metrics.record_generation(start.elapsed());
                chunk
            }
        };

        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(loaded.entry(pos).or_insert_with(|| Arc::new(chunk))))
    }

    /// Persist a chunk to storage.
    pub async fn save_chunk(&self, chunk: Arc<Chunk>) -> Result<()> {
        let start = Instant::now();
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || storage.set(chunk.pos(), chunk.to_blob()?)).await??;
        self.metrics.record_save(start.elapsed());
        Ok(())
    }

    /// Drop a chunk from memory. Returns whether it was loaded.
    pub fn unload_chunk(&self, pos: ChunkPos) -> bool {
        let removed = self
            .loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&pos)
            .is_some();
        if removed {
            self.metrics.record_unload();
        }
        removed
    }
}

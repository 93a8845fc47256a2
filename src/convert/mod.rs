//! Conversion of an Anvil world into the target world.
//!
//! Regions are processed one at a time: decode, cache, fan out the 1024
//! chunk loads through the world (which calls back into [`AnvilGenerator`]),
//! save and unload every chunk, then evict the region.

mod cache;
mod progress;
mod translator;

pub use cache::RegionCache;
pub use progress::{ConversionProgress, ConversionReport, ConversionState};
pub use translator::AnvilGenerator;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::catalog::{BiomeCatalog, BlockCatalog};
use crate::chunk::VoidGenerator;
use crate::region::{RegionData, RegionPos, find_region_files};
use crate::storage::ChunkPos;
use crate::world::World;

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Chunk units running at once.
    pub workers: usize,
    /// Per-chunk limit; expired chunks count as failures.
    pub chunk_timeout: Option<Duration>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            chunk_timeout: None,
        }
    }
}

/// Stops a running conversion.
///
/// Chunks not yet started are skipped, the world stops accepting loads and
/// no further region is decoded.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// The converted world together with what happened on the way.
pub struct Converted {
    pub world: Arc<World>,
    pub report: ConversionReport,
}

pub struct WorldConverter {
    blocks: Arc<BlockCatalog>,
    biomes: Arc<BiomeCatalog>,
    config: ConverterConfig,
    cache: Arc<RegionCache>,
    shutdown: ShutdownHandle,
}

impl WorldConverter {
    pub fn new(blocks: Arc<BlockCatalog>, biomes: Arc<BiomeCatalog>, config: ConverterConfig) -> Self {
        Self {
            blocks,
            biomes,
            config,
            cache: Arc::new(RegionCache::new()),
            shutdown: ShutdownHandle::default(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn cache(&self) -> &Arc<RegionCache> {
        &self.cache
    }

    /// Convert the Anvil world at `source` into `world`.
    ///
    /// Never fails as a whole: undecodable regions are skipped and failing
    /// chunks are counted in the report.
    pub async fn convert(&self, source: &Path, world: Arc<World>) -> Converted {
        let mut report = ConversionReport { state: ConversionState::Scanning, ..Default::default() };
        let fallback = Arc::new(VoidGenerator::new(self.biomes.default_biome()));

        let root = source.to_path_buf();
        let files = tokio::task::spawn_blocking(move || find_region_files(&root))
            .await
            .unwrap_or_else(|e| {
                log::error!("Region scan failed: {e}");
                Vec::new()
            });
        report.total = files.len();

        if files.is_empty() {
            log::info!("No region files in {}, using void generator", source.display());
            world.set_generator(fallback);
            report.state = ConversionState::NoRegions;
            return Converted { world, report };
        }

        log::info!("Found {} region files in {}", files.len(), source.display());
        report.state = ConversionState::Converting;
        world.set_generator(Arc::new(AnvilGenerator::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.blocks),
            Arc::clone(&self.biomes),
        )));
        world.enable_auto_chunk_load(true);

        let mut progress = ConversionProgress::new(files.len());
        for path in &files {
            if self.shutdown.is_shutdown() {
                log::warn!("Shutdown requested, stopping before {}", path.display());
                break;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match decode(path.clone()).await {
                Ok(data) => {
                    let region = data.pos();
                    log::debug!("Decoded {} with {} chunks", name, data.chunk_count());
                    self.cache.insert(&name, Arc::new(data));
                    report.chunk_failures += self.convert_region(region, &world).await;
                    if self.shutdown.is_shutdown() {
                        log::warn!("Shutdown requested, {name} left incomplete");
                        break;
                    }
                    report.converted += 1;
                }
                Err(e) => {
                    log::error!("Skipping region {}: {:#}", path.display(), e);
                    report.failed += 1;
                }
            }

            let percent = progress.advance();
            log::info!("Converting Anvil world: {percent}%");
            report.progress_log.push(percent);

            self.cache.remove(&name);
        }

        if self.shutdown.is_shutdown() {
            world.shutdown();
            report.state = ConversionState::Interrupted;
        }

        // Nothing may outlive the run, even on an early exit.
        self.cache.clear();
        world.set_generator(fallback);
        report.peak_cached_regions = self.cache.peak();
        if report.state == ConversionState::Converting {
            report.state = ConversionState::Done;
        }

        log::info!("Conversion finished. {report}");
        log::info!("\n{}", world.metrics().generate_report());
        Converted { world, report }
    }

    /// Load, save and unload all chunks of `region`. Returns the number of failed chunks.
    async fn convert_region(&self, region: RegionPos, world: &Arc<World>) -> usize {
        let limiter = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        for pos in region.chunks() {
            let world = Arc::clone(world);
            let limiter = Arc::clone(&limiter);
            let timeout = self.config.chunk_timeout;
            let shutdown = self.shutdown.clone();

            tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await?;
                if shutdown.is_shutdown() {
                    // Skipped, not failed.
                    world.shutdown();
                    return Ok(());
                }
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, convert_chunk(&world, pos)).await {
                        Ok(result) => result,
                        Err(_) => {
                            world.unload_chunk(pos);
                            Err(anyhow!("chunk {pos} timed out after {limit:?}"))
                        }
                    },
                    None => convert_chunk(&world, pos).await,
                }
            });
        }

        // Barrier: every chunk completes before the region is evicted.
        let mut failures = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    log::warn!("{e:#}");
                }
                Err(e) => {
                    failures += 1;
                    log::error!("Chunk task in {region} failed: {e}");
                }
            }
        }

        if failures > 0 {
            log::warn!("{failures} chunks of {region} failed");
        }
        failures
    }
}

async fn decode(path: PathBuf) -> Result<RegionData> {
    let data = tokio::task::spawn_blocking(move || RegionData::open(&path)).await??;
    Ok(data)
}

async fn convert_chunk(world: &World, pos: ChunkPos) -> Result<()> {
    let chunk = world
        .load_chunk(pos)
        .await
        .with_context(|| format!("loading chunk {pos}"))?;
    let saved = world
        .save_chunk(chunk)
        .await
        .with_context(|| format!("saving chunk {pos}"));
    world.unload_chunk(pos);
    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BiomeId, BlockId};
    use crate::chunk::{Chunk, ChunkGenerator, WorldDimensions};
    use crate::region::CHUNKS_PER_REGION;
    use crate::region::fixtures::{self, ChunkFixture};
    use crate::storage::{ChunkStorage, MemoryStorage};

    fn converter() -> WorldConverter {
        WorldConverter::new(
            Arc::new(BlockCatalog::sample()),
            Arc::new(BiomeCatalog::builtin().unwrap()),
            ConverterConfig { workers: 8, chunk_timeout: None },
        )
    }

    /// Installed before a run, so generator names tell what `convert` left behind.
    struct MarkerGenerator;

    impl ChunkGenerator for MarkerGenerator {
        fn name(&self) -> &'static str {
            "marker"
        }

        fn generate_chunk_data(&self, _chunk: &mut Chunk) {}

        fn fill_biomes(&self, chunk: &mut Chunk) {
            chunk.biomes_mut().fill(BiomeId(0));
        }
    }

    /// Requests shutdown once the first chunk is stored.
    struct ShutdownOnSave {
        inner: MemoryStorage,
        shutdown: ShutdownHandle,
    }

    impl ChunkStorage for ShutdownOnSave {
        fn get(&self, pos: ChunkPos) -> Result<Option<Vec<u8>>> {
            self.inner.get(pos)
        }

        fn set(&self, pos: ChunkPos, data: Vec<u8>) -> Result<()> {
            self.shutdown.shutdown();
            self.inner.set(pos, data)
        }

        fn delete(&self, pos: ChunkPos) -> Result<()> {
            self.inner.delete(pos)
        }

        fn list_chunks(&self) -> Result<Vec<ChunkPos>> {
            self.inner.list_chunks()
        }
    }

    // One section high keeps stored chunks small.
    fn target_world() -> Arc<World> {
        world_with(Arc::new(MemoryStorage::new()))
    }

    fn world_with(storage: Arc<dyn ChunkStorage>) -> Arc<World> {
        Arc::new(World::new(storage, WorldDimensions::new(0, 16).unwrap(), Arc::new(MarkerGenerator)))
    }

    fn stored_chunk(world: &World, pos: ChunkPos) -> Chunk {
        Chunk::from_blob(&world.storage().get(pos).unwrap().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_no_regions_installs_void_generator() {
        let source = tempfile::tempdir().unwrap();
        let world = target_world();
        assert_eq!(world.generator().name(), "marker");
        let converted = converter().convert(source.path(), world).await;

        assert_eq!(converted.report.state, ConversionState::NoRegions);
        assert_eq!(converted.report.total, 0);
        assert!(converted.report.progress_log.is_empty());
        assert_eq!(converted.world.generator().name(), "void");
        assert_eq!(converted.world.metrics().total_loads(), 0);
        assert!(converted.world.storage().list_chunks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_region() {
        let source = tempfile::tempdir().unwrap();
        let mut chunk = ChunkFixture::new(0, 0);
        chunk.set_block(0, 0, 0, "minecraft:stone", &[]);
        fixtures::write_region(source.path(), "r.0.0.mca", &[chunk]);

        let converter = converter();
        let converted = converter.convert(source.path(), target_world()).await;
        let world = &converted.world;

        assert_eq!(converted.report.state, ConversionState::Done);
        assert_eq!(converted.report.converted, 1);
        assert_eq!(converted.report.chunk_failures, 0);
        assert_eq!(converted.report.progress_log, vec![100]);
        assert_eq!(world.generator().name(), "void");
        assert_eq!(world.loaded_chunk_count(), 0);
        assert!(converter.cache().is_empty());

        assert_eq!(world.storage().list_chunks().unwrap().len(), CHUNKS_PER_REGION);
        let origin = stored_chunk(world, ChunkPos::new(0, 0));
        assert_eq!(origin.block(0, 0, 0), BlockId(1));
        let plains = BiomeCatalog::builtin().unwrap().default_biome();
        assert!(origin.biomes().iter().all(|&b| b == plains));
        assert_eq!(stored_chunk(world, ChunkPos::new(31, 31)).block_count(), 0);
    }

    #[tokio::test]
    async fn test_regions_are_processed_one_at_a_time() {
        let source = tempfile::tempdir().unwrap();
        let mut first = ChunkFixture::new(0, 0);
        first.set_block(1, 1, 1, "minecraft:dirt", &[]);
        let mut second = ChunkFixture::new(32, 0);
        second.set_block(2, 2, 2, "minecraft:stone", &[]);
        fixtures::write_region(source.path(), "r.0.0.mca", &[first]);
        fixtures::write_region(source.path(), "r.1.0.mca", &[second]);

        let converter = converter();
        let converted = converter.convert(source.path(), target_world()).await;

        assert_eq!(converted.report.progress_log, vec![50, 100]);
        assert_eq!(converted.report.peak_cached_regions, 1);
        assert_eq!(converter.cache().inserts(), 2);
        assert_eq!(converter.cache().removals(), 2);
        assert!(converter.cache().is_empty());
        assert_eq!(converted.world.storage().list_chunks().unwrap().len(), 2 * CHUNKS_PER_REGION);
        assert_eq!(stored_chunk(&converted.world, ChunkPos::new(32, 0)).block(2, 2, 2), BlockId(1));
        assert_eq!(stored_chunk(&converted.world, ChunkPos::new(0, 0)).block(1, 1, 1), BlockId(10));
    }

    #[tokio::test]
    async fn test_corrupt_region_is_skipped() {
        let source = tempfile::tempdir().unwrap();
        let region_dir = source.path().join("region");
        std::fs::create_dir_all(&region_dir).unwrap();
        std::fs::write(region_dir.join("r.0.0.mca"), vec![0xAB; 100]).unwrap();
        let mut good = ChunkFixture::new(32, 0);
        good.set_block(0, 0, 0, "minecraft:stone", &[]);
        fixtures::write_region(source.path(), "r.1.0.mca", &[good]);

        let converted = converter().convert(source.path(), target_world()).await;

        assert_eq!(converted.report.failed, 1);
        assert_eq!(converted.report.converted, 1);
        assert_eq!(converted.report.progress_log, vec![50, 100]);
        let chunks = converted.world.storage().list_chunks().unwrap();
        assert_eq!(chunks.len(), CHUNKS_PER_REGION);
        assert!(chunks.iter().all(|&pos| RegionPos::new(1, 0).contains(pos)));
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_next_region() {
        let source = tempfile::tempdir().unwrap();
        fixtures::write_region(source.path(), "r.0.0.mca", &[ChunkFixture::new(0, 0)]);

        let converter = converter();
        converter.shutdown_handle().shutdown();
        let converted = converter.convert(source.path(), target_world()).await;

        assert_eq!(converted.report.state, ConversionState::Interrupted);
        assert_eq!(converted.report.converted, 0);
        assert!(converted.report.progress_log.is_empty());
        assert!(!converted.world.is_accepting());
        assert_eq!(converted.world.generator().name(), "void");
        assert!(converter.cache().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_during_region() {
        let source = tempfile::tempdir().unwrap();
        let mut chunk = ChunkFixture::new(0, 0);
        chunk.set_block(0, 0, 0, "minecraft:stone", &[]);
        fixtures::write_region(source.path(), "r.0.0.mca", &[chunk]);

        let converter = WorldConverter::new(
            Arc::new(BlockCatalog::sample()),
            Arc::new(BiomeCatalog::builtin().unwrap()),
            ConverterConfig { workers: 1, chunk_timeout: None },
        );
        let storage = Arc::new(ShutdownOnSave {
            inner: MemoryStorage::new(),
            shutdown: converter.shutdown_handle(),
        });
        let converted = converter.convert(source.path(), world_with(storage)).await;

        assert_eq!(converted.report.state, ConversionState::Interrupted);
        assert_eq!(converted.report.converted, 0);
        assert!(converted.report.progress_log.is_empty());
        assert!(!converted.world.is_accepting());
        assert_eq!(converted.world.generator().name(), "void");
        assert!(converter.cache().is_empty());
        let stored = converted.world.storage().list_chunks().unwrap().len();
        assert!(stored >= 1 && stored < CHUNKS_PER_REGION);
    }
}

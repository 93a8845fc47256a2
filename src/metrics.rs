use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Chunk lifecycle counters of one world.
#[derive(Debug)]
pub struct WorldMetrics {
    // Generation Stats
    pub chunks_generated: AtomicUsize,
    pub generation_time_us: AtomicU64,
    pub max_generation_time_us: AtomicU64,

    // Storage Stats
    pub chunks_loaded: AtomicUsize,
    pub load_time_us: AtomicU64,
    pub chunks_saved: AtomicUsize,
    pub save_time_us: AtomicU64,
    pub chunks_unloaded: AtomicUsize,

    pub start_time: Instant,
}

impl Default for WorldMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldMetrics {
    pub fn new() -> Self {
        Self {
            chunks_generated: AtomicUsize::new(0),
            generation_time_us: AtomicU64::new(0),
            max_generation_time_us: AtomicU64::new(0),
            chunks_loaded: AtomicUsize::new(0),
            load_time_us: AtomicU64::new(0),
            chunks_saved: AtomicUsize::new(0),
            save_time_us: AtomicU64::new(0),
            chunks_unloaded: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_generation(&self, duration: Duration) {
        self.chunks_generated.fetch_add(1, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.generation_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_generation_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_load(&self, duration: Duration) {
        self.chunks_loaded.fetch_add(1, Ordering::Relaxed);
        self.load_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_save(&self, duration: Duration) {
        self.chunks_saved.fetch_add(1, Ordering::Relaxed);
        self.save_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_unload(&self) {
        self.chunks_unloaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Loads of any kind (generated or read back from storage).
    pub fn total_loads(&self) -> usize {
        self.chunks_generated.load(Ordering::Relaxed) + self.chunks_loaded.load(Ordering::Relaxed)
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.elapsed();
        let generated = self.chunks_generated.load(Ordering::Relaxed);
        let gen_time_total = self.generation_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let gen_max = self.max_generation_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let gen_avg = if generated > 0 { gen_time_total / generated as f64 } else { 0.0 };

        let loaded = self.chunks_loaded.load(Ordering::Relaxed);
        let load_time = self.load_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let load_avg = if loaded > 0 { load_time / loaded as f64 } else { 0.0 };

        let saved = self.chunks_saved.load(Ordering::Relaxed);
        let save_time = self.save_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let save_avg = if saved > 0 { save_time / saved as f64 } else { 0.0 };

        let unloaded = self.chunks_unloaded.load(Ordering::Relaxed);

        format!(
            "World Report\n\
             ============\n\
             Session Duration: {:.2?}\n\n\
             [Generation]\n\
             Chunks Generated: {}\n\
             Total Time: {:.2} ms\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\n\
             [Storage Read]\n\
             Chunks Loaded: {}\n\
             Avg Time: {:.2} ms/chunk\n\n\
             [Storage Write]\n\
             Chunks Saved: {}\n\
             Avg Time: {:.2} ms/chunk\n\n\
             Chunks Unloaded: {}\n",
            uptime,
            generated, gen_time_total, gen_avg, gen_max,
            loaded, load_avg,
            saved, save_avg,
            unloaded
        )
    }
}

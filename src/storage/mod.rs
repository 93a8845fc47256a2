mod directory;
mod memory;

pub use directory::DirectoryStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

/// Coordinates for a chunk in the world.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Abstract storage interface for converted chunk data.
///
/// Implementations of this trait can store chunk data in various backends:
/// - `MemoryStorage` - In-memory HashMap (for testing/dry runs)
/// - `DirectoryStorage` - One file per chunk below an output directory
///
/// The storage deals with framed, compressed chunk blobs, not parsed NBT.
pub trait ChunkStorage: Send + Sync {
    /// Retrieve chunk data by coordinates.
    /// Returns None if the chunk hasn't been stored.
    fn get(&self, pos: ChunkPos) -> Result<Option<Vec<u8>>>;

    /// Store chunk data at the given coordinates.
    fn set(&self, pos: ChunkPos, data: Vec<u8>) -> Result<()>;

    /// Check if a chunk exists in storage.
    fn exists(&self, pos: ChunkPos) -> Result<bool> {
        Ok(self.get(pos)?.is_some())
    }

    /// Delete a chunk from storage.
    fn delete(&self, pos: ChunkPos) -> Result<()>;

    /// Get all stored chunk positions.
    fn list_chunks(&self) -> Result<Vec<ChunkPos>>;
}

//! In-memory storage backend using HashMap.
//!
//! Useful for dry runs and testing. Data is lost on exit.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Result, anyhow};

use super::{ChunkPos, ChunkStorage};

/// In-memory chunk storage using a thread-safe HashMap.
#[derive(Default)]
pub struct MemoryStorage {
    chunks: RwLock<HashMap<ChunkPos, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStorage for MemoryStorage {
    fn get(&self, pos: ChunkPos) -> Result<Option<Vec<u8>>> {
        let chunks = self.chunks.read().map_err(|_| anyhow!("memory storage lock poisoned"))?;
        Ok(chunks.get(&pos).cloned())
    }

    fn set(&self, pos: ChunkPos, data: Vec<u8>) -> Result<()> {
        let mut chunks = self.chunks.write().map_err(|_| anyhow!("memory storage lock poisoned"))?;
        chunks.insert(pos, data);
        Ok(())
    }

    fn delete(&self, pos: ChunkPos) -> Result<()> {
        let mut chunks = self.chunks.write().map_err(|_| anyhow!("memory storage lock poisoned"))?;
        chunks.remove(&pos);
        Ok(())
    }

    fn list_chunks(&self) -> Result<Vec<ChunkPos>> {
        let chunks = self.chunks.read().map_err(|_| anyhow!("memory storage lock poisoned"))?;
        Ok(chunks.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        let pos = ChunkPos::new(10, -5);
        let data = vec![1, 2, 3, 4, 5];

        assert!(!storage.exists(pos).unwrap());
        storage.set(pos, data.clone()).unwrap();
        assert!(storage.exists(pos).unwrap());
        assert_eq!(storage.get(pos).unwrap(), Some(data));
        assert_eq!(storage.list_chunks().unwrap(), vec![pos]);

        storage.delete(pos).unwrap();
        assert!(!storage.exists(pos).unwrap());
    }
}

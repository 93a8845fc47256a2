//! Directory storage backend: one `c.<x>.<z>.dat` file per chunk.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{ChunkPos, ChunkStorage};

pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    /// Open (and create if needed) the output directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("creating storage directory {}", root.display()))?;
        Ok(Self { root })
    }

    fn chunk_path(&self, pos: ChunkPos) -> PathBuf {
        self.root.join(format!("c.{}.{}.dat", pos.x, pos.z))
    }

    fn parse_name(name: &str) -> Option<ChunkPos> {
        let mut parts = name.strip_prefix("c.")?.strip_suffix(".dat")?.split('.');
        let x = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        parts.next().is_none().then(|| ChunkPos::new(x, z))
    }
}

impl ChunkStorage for DirectoryStorage {
    fn get(&self, pos: ChunkPos) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.chunk_path(pos)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading chunk {pos}")),
        }
    }

    fn set(&self, pos: ChunkPos, data: Vec<u8>) -> Result<()> {
        // Write then rename so an interrupted run never leaves half a chunk behind.
        let path = self.chunk_path(pos);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, data).with_context(|| format!("writing chunk {pos}"))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("writing chunk {pos}"))?;
        Ok(())
    }

    fn delete(&self, pos: ChunkPos) -> Result<()> {
        match std::fs::remove_file(self.chunk_path(pos)) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("deleting chunk {pos}"))
            }
            _ => Ok(()),
        }
    }

    fn list_chunks(&self) -> Result<Vec<ChunkPos>> {
        let mut chunks = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(pos) = Self::parse_name(&entry.file_name().to_string_lossy()) {
                chunks.push(pos);
            }
        }
        chunks.sort();
        Ok(chunks)
    }
}

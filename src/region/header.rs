//! Region file header parsing.
//!
//! The header consists of two tables:
//! - Location table: where each chunk is stored
//! - Timestamp table: when each chunk was last saved (ignored here)

use super::{CHUNKS_PER_REGION, HEADER_SIZE, RegionError, SECTOR_SIZE};

/// Position of one chunk payload inside the region file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Offset in sectors from the start of the file.
    pub sector_offset: u32,
    pub sector_count: u8,
}

impl Location {
    /// Byte offset of the payload.
    #[inline]
    pub fn byte_offset(&self) -> usize {
        self.sector_offset as usize * SECTOR_SIZE
    }

    /// Number of bytes reserved for the payload.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.sector_count as usize * SECTOR_SIZE
    }
}

/// Parsed location table of an MCA file.
pub struct Header {
    locations: Vec<Option<Location>>,
}

impl Header {
    /// Parse the 8KB header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, RegionError> {
        if data.len() < HEADER_SIZE {
            return Err(RegionError::Truncated("file shorter than the 8KB header"));
        }

        let locations = (0..CHUNKS_PER_REGION)
            .map(|index| {
                // Minecraft stores: [Offset:3 bytes][Count:1 byte] (Big Endian)
                let entry = &data[index * 4..index * 4 + 4];
                let sector_offset = u32::from_be_bytes([0, entry[0], entry[1], entry[2]]);
                let sector_count = entry[3];

                // Offsets 0 and 1 point into the header itself, which means "not generated".
                if sector_offset < 2 || sector_count == 0 {
                    None
                } else {
                    Some(Location { sector_offset, sector_count })
                }
            })
            .collect();

        Ok(Self { locations })
    }

    /// Location of the chunk at linear index `index` (0-1023).
    pub fn location(&self, index: usize) -> Option<Location> {
        self.locations.get(index).copied().flatten()
    }

    pub fn present_chunks(&self) -> impl Iterator<Item = (usize, Location)> + '_ {
        self.locations
            .iter()
            .enumerate()
            .filter_map(|(index, location)| location.map(|l| (index, l)))
    }
}

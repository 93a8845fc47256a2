//! anvil-convert: converts Anvil (`.mca`) world saves into chunk storage.
//!
//! Region files are decoded one at a time, every chunk is translated into
//! the target block and biome vocabulary and written through a [`world::World`].

pub mod catalog;
pub mod chunk;
pub mod config;
pub mod convert;
pub mod metrics;
pub mod nbt;
pub mod region;
pub mod storage;
pub mod world;

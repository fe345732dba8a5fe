//! Parabox editor: level model and file export for a recursive box puzzle
//!
//! - Levels made of rooms that contain walls, floors, blocks and other rooms
//! - Room resizing and reference-aware room removal
//! - Wall outline extraction and polygon insetting
//! - Export to the game's line-oriented level format
//! - Name-keyed level store with optional brotli compression

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod export;
pub mod math;
pub mod storage;
pub mod world;

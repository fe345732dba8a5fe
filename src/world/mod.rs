//! World module - level data model for the recursive box editor
//!
//! - Levels, rooms and their content items
//! - Room resizing and bulk content removal
//! - Wall outline extraction
//! - JSON level files and validation

mod level;
mod model;
mod walls;

pub use level::*;
pub use model::*;
pub use walls::*;

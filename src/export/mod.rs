//! Level export
//!
//! Text encoding of levels for the game engine.

mod encoder;
mod writer;

pub use encoder::*;
pub use writer::LineWriter;

//! Level loading, saving and validation
//!
//! Levels are stored as JSON, in the same shape the web editor keeps in
//! browser storage. Files may be plain or brotli compressed:
//! - Reading: auto-detects format by checking for a JSON start
//! - Writing: compression is chosen by the caller

use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::{Level, ReferenceKind, RoomContent, RoomId};

/// Validation limits to keep hostile files from exhausting memory
pub mod limits {
    /// Maximum number of rooms in a level
    pub const MAX_ROOMS: usize = 1024;
    /// Maximum grid dimension (width or height) for a room
    pub const MAX_ROOM_SIZE: i32 = 512;
    /// Maximum content items in a single room
    pub const MAX_CONTENTS: usize = 65_536;
    /// Maximum title length in bytes
    pub const MAX_TITLE_LEN: usize = 256;
    /// Maximum absolute content coordinate (prevents overflow issues)
    pub const MAX_COORD: i32 = 1_000_000;
}

/// Check a content position against the coordinate limit
fn is_valid_coord((x, y): (i32, i32)) -> bool {
    x.unsigned_abs() <= limits::MAX_COORD as u32 && y.unsigned_abs() <= limits::MAX_COORD as u32
}

/// Error type for level loading and saving
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("brotli {operation} failed: {message}")]
    Compression {
        operation: &'static str,
        message: String,
    },
    #[error("validation error: {0}")]
    Validation(String),
}

/// Brotli quality 6, window 22: good balance of speed and ratio
fn brotli_params() -> brotli::enc::BrotliEncoderParams {
    brotli::enc::BrotliEncoderParams {
        quality: 6,
        lgwin: 22,
        ..Default::default()
    }
}

/// Plain JSON starts with `{` or whitespace; anything else is brotli
fn is_plain_json(bytes: &[u8]) -> bool {
    bytes
        .first()
        .map(|&b| b == b'{' || b.is_ascii_whitespace())
        .unwrap_or(false)
}

/// Validate a level's invariants.
///
/// Checks sizes, colors and limits, that room ids are unique, that every
/// link resolves to a room of the level, and that only the void plane room
/// carries a void plane link.
pub fn validate_level(level: &Level) -> Result<(), LevelError> {
    let fail = |msg: String| Err(LevelError::Validation(msg));

    if level.title.len() > limits::MAX_TITLE_LEN {
        return fail(format!(
            "title too long ({} > {})",
            level.title.len(),
            limits::MAX_TITLE_LEN
        ));
    }
    if level.rooms.is_empty() {
        return fail("level has no rooms".to_string());
    }
    if level.rooms.len() > limits::MAX_ROOMS {
        return fail(format!(
            "too many rooms ({} > {})",
            level.rooms.len(),
            limits::MAX_ROOMS
        ));
    }

    let mut ids: HashSet<&RoomId> = HashSet::new();
    for room in &level.rooms {
        if !ids.insert(&room.id) {
            return fail(format!("duplicate room id {}", room.id));
        }
    }

    let mut void_planes = 0;
    for room in &level.rooms {
        let context = format!("room {}", room.id);

        if room.width < 1 || room.height < 1 {
            return fail(format!("{}: invalid size {}x{}", context, room.width, room.height));
        }
        if room.width > limits::MAX_ROOM_SIZE || room.height > limits::MAX_ROOM_SIZE {
            return fail(format!(
                "{}: size {}x{} exceeds {}",
                context,
                room.width,
                room.height,
                limits::MAX_ROOM_SIZE
            ));
        }
        if !room.color.is_valid() {
            return fail(format!("{}: color out of range {:?}", context, room.color));
        }
        if !room.zoom_factor.is_finite() {
            return fail(format!("{}: invalid zoom factor {}", context, room.zoom_factor));
        }
        if room.contents.len() > limits::MAX_CONTENTS {
            return fail(format!(
                "{}: too many contents ({} > {})",
                context,
                room.contents.len(),
                limits::MAX_CONTENTS
            ));
        }

        if room.is_void_plane {
            void_planes += 1;
        }
        if let Some(plane) = &room.void_plane {
            if !room.is_void_plane {
                return fail(format!("{}: void plane link on a regular room", context));
            }
            if let Some(target) = &plane.inf_enter_id {
                check_target(&ids, &context, ReferenceKind::VoidPlane, target)?;
            }
        }

        for (i, content) in room.contents.iter().enumerate() {
            let item_context = format!("{} {}[{}]", context, content.kind(), i);
            if !is_valid_coord(content.pos()) {
                let (x, y) = content.pos();
                return fail(format!(
                    "{}: position ({}, {}) exceeds {}",
                    item_context,
                    x,
                    y,
                    limits::MAX_COORD
                ));
            }
            if let RoomContent::Block(block) = content {
                if !block.color.is_valid() {
                    return fail(format!("{}: color out of range {:?}", item_context, block.color));
                }
            }
            for (kind, target) in content.references() {
                check_target(&ids, &item_context, kind, target)?;
            }
        }
    }

    if void_planes > 1 {
        return fail(format!("{} rooms are marked as void plane", void_planes));
    }

    Ok(())
}

fn check_target(
    ids: &HashSet<&RoomId>,
    context: &str,
    kind: ReferenceKind,
    target: &RoomId,
) -> Result<(), LevelError> {
    if ids.contains(target) {
        Ok(())
    } else {
        Err(LevelError::Validation(format!(
            "{}: {} points at missing room {}",
            context, kind, target
        )))
    }
}

/// Parse level data from bytes (plain or brotli compressed JSON)
pub fn parse_level_data(bytes: &[u8]) -> Result<Level, LevelError> {
    let contents = if is_plain_json(bytes) {
        String::from_utf8(bytes.to_vec())?
    } else {
        let mut decompressed = Vec::new();
        brotli::BrotliDecompress(&mut Cursor::new(bytes), &mut decompressed).map_err(|e| {
            LevelError::Compression {
                operation: "decompression",
                message: e.to_string(),
            }
        })?;
        String::from_utf8(decompressed)?
    };

    load_level_from_str(&contents)
}

/// Load a level from a JSON string
pub fn load_level_from_str(s: &str) -> Result<Level, LevelError> {
    let level: Level = serde_json::from_str(s)?;
    validate_level(&level)?;
    Ok(level)
}

/// Serialize a level to bytes, optionally brotli compressed
pub fn serialize_level(level: &Level, compress: bool) -> Result<Vec<u8>, LevelError> {
    let json = serde_json::to_string_pretty(level)?;
    if !compress {
        return Ok(json.into_bytes());
    }

    let mut compressed = Vec::new();
    brotli::BrotliCompress(&mut Cursor::new(json.as_bytes()), &mut compressed, &brotli_params())
        .map_err(|e| LevelError::Compression {
            operation: "compression",
            message: e.to_string(),
        })?;

    debug!(raw = json.len(), compressed = compressed.len(), "compressed level");
    Ok(compressed)
}

/// Load a level from a file (plain or compressed)
pub fn load_level<P: AsRef<Path>>(path: P) -> Result<Level, LevelError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "loading level");
    parse_level_data(&bytes)
}

/// Save a level to a file
pub fn save_level<P: AsRef<Path>>(level: &Level, path: P, compress: bool) -> Result<(), LevelError> {
    let data = serialize_level(level, compress)?;
    fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{default_level, default_room, Color, VoidPlane};
    use tempfile::NamedTempFile;

    fn assert_invalid(level: &Level, needle: &str) {
        match validate_level(level) {
            Err(LevelError::Validation(msg)) => {
                assert!(msg.contains(needle), "{:?} does not mention {:?}", msg, needle)
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_level_is_valid() {
        assert!(validate_level(&default_level("ok")).is_ok());
    }

    #[test]
    fn test_unresolved_reference_rejected() {
        let mut level = default_level("bad");
        level.rooms[0].place(RoomContent::room_ref(0, 0, 7));
        assert_invalid(&level, "missing room 7");

        let mut level = default_level("bad");
        level.rooms[0].place(RoomContent::inf_exit(0, 0, "nowhere", 0));
        assert_invalid(&level, "inf-exit points at missing room nowhere");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut level = default_level("dup");
        level.rooms.push(default_room(0));
        assert_invalid(&level, "duplicate room id 0");
    }

    #[test]
    fn test_room_checks() {
        let mut level = default_level("size");
        level.rooms[0].width = 0;
        assert_invalid(&level, "invalid size 0x5");

        let mut level = default_level("color");
        level.rooms[0].color = Color::new(400.0, 0.5, 0.5);
        assert_invalid(&level, "color out of range");

        let mut level = default_level("block color");
        level.rooms[0].place(RoomContent::block(0, 0, Color::new(10.0, 2.0, 0.5)));
        assert_invalid(&level, "block[0]");

        let mut level = default_level("empty");
        level.rooms.clear();
        assert_invalid(&level, "no rooms");
    }

    #[test]
    fn test_coordinate_limit() {
        let mut level = default_level("edge");
        level.rooms[0].place(RoomContent::wall(limits::MAX_COORD, -limits::MAX_COORD));
        assert!(validate_level(&level).is_ok());

        level.rooms[0].place(RoomContent::wall(i32::MAX, 0));
        assert_invalid(&level, "wall[1]: position (2147483647, 0) exceeds 1000000");

        let mut level = default_level("edge");
        level.rooms[0].place(RoomContent::floor(0, i32::MIN, crate::world::ButtonType::Button));
        assert_invalid(&level, "floor[0]");
    }

    #[test]
    fn test_void_plane_checks() {
        let mut level = default_level("void");
        level.rooms[0].void_plane = Some(VoidPlane { inf_enter_id: None, order: 0 });
        assert_invalid(&level, "regular room");

        level.rooms[0].is_void_plane = true;
        assert!(validate_level(&level).is_ok());

        level.rooms.push(default_room(1));
        level.rooms[1].is_void_plane = true;
        assert_invalid(&level, "2 rooms are marked as void plane");
    }

    #[test]
    fn test_save_and_load_plain() {
        let mut level = default_level("Plain");
        level.rooms[0].place(RoomContent::wall(1, 2));

        let temp_file = NamedTempFile::new().unwrap();
        save_level(&level, temp_file.path(), false).unwrap();

        let text = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(text.starts_with('{'));
        assert!(text.contains("\"type\": \"wall\""));

        let loaded = load_level(temp_file.path()).unwrap();
        assert_eq!(loaded, level);
    }

    #[test]
    fn test_save_and_load_compressed() {
        let mut level = default_level("Packed");
        for x in 0..5 {
            level.rooms[0].place(RoomContent::wall(x, 0));
        }

        let bytes = serialize_level(&level, true).unwrap();
        assert!(!is_plain_json(&bytes));

        let loaded = parse_level_data(&bytes).unwrap();
        assert_eq!(loaded, level);
    }

    #[test]
    fn test_load_rejects_invalid_level() {
        let mut level = default_level("Broken");
        level.rooms[0].place(RoomContent::room_ref(0, 0, 3));
        let bytes = serialize_level(&level, false).unwrap();

        assert!(matches!(parse_level_data(&bytes), Err(LevelError::Validation(_))));
    }

    #[test]
    fn test_load_garbage() {
        assert!(matches!(
            load_level_from_str("not a level"),
            Err(LevelError::Json(_))
        ));
        assert!(parse_level_data(&[0xff, 0x00, 0x13]).is_err());
        assert!(parse_level_data(&[]).is_err());
    }
}

//! Level file encoder
//!
//! Serializes a [`Level`] into the game's line-oriented text format:
//!
//! ```text
//! version 4
//! #
//! Block -1 -1 1 5 5 0.6 0.8 1 1 0 0 0 0 0 1 0
//! 	Wall 0 0 0 0 0
//! ```
//!
//! Room contents are indented with one tab. Rooms are numbered 1..N in
//! level order. Nested blocks are implicit rooms and take their numbers from
//! the same counter, continuing after N in the order they are written.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::writer::LineWriter;
use crate::world::{Color, Level, PlayerOrder, ReferenceKind, Room, RoomContent, RoomId};

/// Format version written in the header
pub const FORMAT_VERSION: u32 = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// A link names a room that is not part of the level
    #[error("{kind} in room {room} points at missing room {id}")]
    UnresolvedReference {
        kind: ReferenceKind,
        room: RoomId,
        id: RoomId,
    },
    /// Two rooms share an id, so links to it are ambiguous
    #[error("room id {0} is used by more than one room")]
    DuplicateRoomId(RoomId),
}

/// Serialized room numbering for one encode pass
struct RoomNumbers<'a> {
    by_id: HashMap<&'a RoomId, usize>,
    next: usize,
}

impl<'a> RoomNumbers<'a> {
    fn new(level: &'a Level) -> Result<Self, EncodeError> {
        let mut by_id = HashMap::with_capacity(level.rooms.len());
        let mut next = 1;
        for room in &level.rooms {
            if by_id.insert(&room.id, next).is_some() {
                return Err(EncodeError::DuplicateRoomId(room.id.clone()));
            }
            next += 1;
        }
        Ok(Self { by_id, next })
    }

    fn resolve(&self, kind: ReferenceKind, room: &Room, id: &RoomId) -> Result<usize, EncodeError> {
        self.by_id
            .get(id)
            .copied()
            .ok_or_else(|| EncodeError::UnresolvedReference {
                kind,
                room: room.id.clone(),
                id: id.clone(),
            })
    }

    /// Take the next number for an implicit (nested block) room
    fn allocate(&mut self) -> usize {
        let n = self.next;
        self.next += 1;
        n
    }
}

/// Encode a level into the text format.
///
/// Fails on the first link that does not resolve; nothing is emitted for a
/// level that cannot be encoded completely.
pub fn level_to_file(level: &Level) -> Result<String, EncodeError> {
    let mut file = LineWriter::new();
    write_header(&mut file, level);

    let mut numbers = RoomNumbers::new(level)?;
    for (i, room) in level.rooms.iter().enumerate() {
        write_room(&mut file, room, i + 1, &mut numbers)?;
    }

    debug!(
        title = %level.title,
        rooms = level.rooms.len(),
        implicit_rooms = numbers.next - 1 - level.rooms.len(),
        "encoded level"
    );
    Ok(file.finish())
}

fn write_header(file: &mut LineWriter, level: &Level) {
    file.write_line(&format!("version {}", FORMAT_VERSION));
    if level.extrude {
        file.write_line("shed 1");
    }
    if level.inner_push {
        file.write_line("inner_push 1");
    }
    if level.style != crate::world::LevelStyle::Normal {
        file.write_line(&format!("draw_style {}", level.style));
    }
    if level.custom_level_palette >= 0 {
        file.write_line(&format!("custom_level_palette {}", level.custom_level_palette));
    }
    file.write_line("#");
}

fn write_room(
    file: &mut LineWriter,
    room: &Room,
    room_number: usize,
    numbers: &mut RoomNumbers<'_>,
) -> Result<(), EncodeError> {
    file.write_line(&format!(
        "Block -1 -1 {} {} {} {} {} 0 0 0 0 0 1 {}",
        room_number,
        room.width,
        room.height,
        color(&room.color),
        number(room.zoom_factor),
        room.special_effect,
    ));

    file.indented(|file| -> Result<(), EncodeError> {
        if let Some(plane) = &room.void_plane {
            let enter = inf_enter(numbers, room, plane.inf_enter_id.as_ref(), plane.order, ReferenceKind::VoidPlane)?;
            file.write_line(&format!("Ref -1 -1 {} 1 0 0 {} 0 0 0 0 1 0", room_number, enter));
        }

        for content in &room.contents {
            let line = match content {
                RoomContent::Wall(w) => format!("Wall {} {} {}", w.x, w.y, player(w.player)),
                RoomContent::Floor(f) => format!("Floor {} {} {}", f.x, f.y, f.button_type.as_str()),
                RoomContent::Block(b) => format!(
                    "Block {} {} {} 1 1 {} 1 1 {} 0 0 0",
                    b.x,
                    b.y,
                    numbers.allocate(),
                    color(&b.color),
                    player(b.player),
                ),
                RoomContent::Room(r) => {
                    let target = numbers.resolve(ReferenceKind::Room, room, &r.id)?;
                    let enter = inf_enter(numbers, room, r.inf_enter_id.as_ref(), r.order, ReferenceKind::InfEnter)?;
                    format!(
                        "Ref {} {} {} {} 0 0 {} {} {} 0 0",
                        r.x,
                        r.y,
                        target,
                        flag(!r.is_clone),
                        enter,
                        player(r.player),
                        flag(r.flipped),
                    )
                }
                RoomContent::InfExit(e) => {
                    let target = numbers.resolve(ReferenceKind::InfExit, room, &e.ref_id)?;
                    format!(
                        "Ref {} {} {} 0 1 {} 0 0 0 {} {} 0 0",
                        e.x,
                        e.y,
                        target,
                        e.order,
                        player(e.player),
                        flag(e.flipped),
                    )
                }
            };
            file.write_line(&line);
        }
        Ok(())
    })
}

/// `1 <order> <target>` for a link, `0 0 0` without one
fn inf_enter(
    numbers: &RoomNumbers<'_>,
    room: &Room,
    target: Option<&RoomId>,
    order: i32,
    kind: ReferenceKind,
) -> Result<String, EncodeError> {
    match target {
        Some(id) => {
            let target = numbers.resolve(kind, room, id)?;
            Ok(format!("1 {} {}", order, target))
        }
        None => Ok("0 0 0".to_string()),
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// `<is-number> <is-non-null> <value-or-0>`
pub fn player(value: PlayerOrder) -> String {
    format!(
        "{} {} {}",
        flag(value.is_order()),
        flag(value.is_present()),
        value.value_or_zero()
    )
}

/// Hue normalized to 0..1, then saturation and value
pub fn color(value: &Color) -> String {
    format!("{} {} {}", number(value.h / 360.0), number(value.s), number(value.v))
}

/// Format a number the way JavaScript's `Number#toString` does.
///
/// Shortest round-trip digits; exponent form below 1e-6 and from 1e21 up,
/// with an explicit `+` on positive exponents; negative zero prints as `0`.
pub fn number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{}", value);
    }

    let formatted = format!("{:e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => formatted,
    }
}

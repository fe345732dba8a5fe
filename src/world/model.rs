//! Level data model
//!
//! A level is an ordered list of rooms; each room is a grid holding a flat,
//! unordered list of content items. Several items may share one cell
//! (a floor under a wall, for example).
//!
//! The serde shape matches the JSON the web editor keeps in browser storage,
//! so levels saved there load here unchanged.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::level::limits::MAX_ROOM_SIZE;
use crate::math::GridPoint;

/// Errors from model mutations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("invalid room size {width}x{height}")]
    InvalidSize { width: i32, height: i32 },
    #[error("no room with id {0}")]
    UnknownRoom(RoomId),
    #[error("cannot remove the last room of a level")]
    LastRoom,
    #[error("room size out of integer range")]
    SizeOverflow,
}

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers and small value types
// ─────────────────────────────────────────────────────────────────────────────

/// Room identifier, unique within a level.
///
/// Older levels use integers, newer ones may use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoomId {
    Int(i64),
    Name(String),
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Int(n) => write!(f, "{}", n),
            RoomId::Name(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RoomId {
    fn from(n: i64) -> Self {
        RoomId::Int(n)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        RoomId::Name(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        RoomId::Name(s)
    }
}

/// Prefix marking a textual room id on the command line
pub const NAME_PREFIX: &str = "name:";

impl FromStr for RoomId {
    type Err = std::convert::Infallible;

    /// Integers parse as `Int`, anything else is a name. A `name:` prefix
    /// forces a name, for string ids that look like numbers (`name:0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix(NAME_PREFIX) {
            return Ok(RoomId::Name(name.to_string()));
        }
        Ok(match s.parse::<i64>() {
            Ok(n) => RoomId::Int(n),
            Err(_) => RoomId::Name(s.to_string()),
        })
    }
}

/// HSV color. `h` in degrees (0..=360), `s` and `v` in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Color {
    /// Blue used for freshly created rooms
    pub const DEFAULT_ROOM: Color = Color { h: 216.0, s: 0.8, v: 1.0 };

    pub fn new(h: f64, s: f64, v: f64) -> Self {
        Self { h, s, v }
    }

    /// Check channel ranges
    pub fn is_valid(&self) -> bool {
        (0.0..=360.0).contains(&self.h)
            && (0.0..=1.0).contains(&self.s)
            && (0.0..=1.0).contains(&self.v)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT_ROOM
    }
}

/// In-game drawing style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelStyle {
    #[default]
    Normal,
    Grid,
    Tui,
    Oldstyle,
}

impl LevelStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelStyle::Normal => "normal",
            LevelStyle::Grid => "grid",
            LevelStyle::Tui => "tui",
            LevelStyle::Oldstyle => "oldstyle",
        }
    }
}

impl fmt::Display for LevelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floor button kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonType {
    #[default]
    Button,
    PlayerButton,
}

impl ButtonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonType::Button => "Button",
            ButtonType::PlayerButton => "PlayerButton",
        }
    }
}

/// Player ownership of a piece of content.
///
/// Serialized as `null`, a non-negative number, or the string `"possess"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerOrder {
    #[default]
    Absent,
    Order(u32),
    Possess,
}

impl PlayerOrder {
    pub fn is_order(&self) -> bool {
        matches!(self, PlayerOrder::Order(_))
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, PlayerOrder::Absent)
    }

    /// Numeric order, 0 when not numeric
    pub fn value_or_zero(&self) -> u32 {
        match self {
            PlayerOrder::Order(n) => *n,
            _ => 0,
        }
    }
}

impl Serialize for PlayerOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlayerOrder::Absent => serializer.serialize_none(),
            PlayerOrder::Order(n) => serializer.serialize_u32(*n),
            PlayerOrder::Possess => serializer.serialize_str("possess"),
        }
    }
}

impl<'de> Deserialize<'de> for PlayerOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Order(u32),
            Tag(String),
        }

        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(PlayerOrder::Absent),
            Some(Repr::Order(n)) => Ok(PlayerOrder::Order(n)),
            Some(Repr::Tag(tag)) if tag == "possess" => Ok(PlayerOrder::Possess),
            Some(Repr::Tag(tag)) => Err(D::Error::custom(format!(
                "unknown player value {:?}",
                tag
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Room contents
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub player: PlayerOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub x: i32,
    pub y: i32,
    pub button_type: ButtonType,
}

/// Plain pushable block; the game treats it as an inline 1x1 room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub x: i32,
    pub y: i32,
    pub color: Color,
    #[serde(default)]
    pub player: PlayerOrder,
}

/// Reference to another room of the level, placed in this room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub x: i32,
    pub y: i32,
    /// Target room
    pub id: RoomId,
    /// Clones are not the canonical instance of the target
    #[serde(default)]
    pub is_clone: bool,
    /// Room entered when this reference is entered infinitely
    #[serde(default)]
    pub inf_enter_id: Option<RoomId>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub flipped: bool,
    #[serde(default)]
    pub player: PlayerOrder,
}

/// Infinite exit marker pointing back into `ref_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfExit {
    pub x: i32,
    pub y: i32,
    pub ref_id: RoomId,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub flipped: bool,
    #[serde(default)]
    pub player: PlayerOrder,
}

/// One item in a room's content list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RoomContent {
    Wall(Wall),
    Floor(Floor),
    Block(Block),
    Room(RoomRef),
    InfExit(InfExit),
}

impl RoomContent {
    pub fn wall(x: i32, y: i32) -> Self {
        RoomContent::Wall(Wall { x, y, player: PlayerOrder::Absent })
    }

    pub fn floor(x: i32, y: i32, button_type: ButtonType) -> Self {
        RoomContent::Floor(Floor { x, y, button_type })
    }

    pub fn block(x: i32, y: i32, color: Color) -> Self {
        RoomContent::Block(Block { x, y, color, player: PlayerOrder::Absent })
    }

    pub fn room_ref(x: i32, y: i32, id: impl Into<RoomId>) -> Self {
        RoomContent::Room(RoomRef {
            x,
            y,
            id: id.into(),
            is_clone: false,
            inf_enter_id: None,
            order: 0,
            flipped: false,
            player: PlayerOrder::Absent,
        })
    }

    pub fn inf_exit(x: i32, y: i32, ref_id: impl Into<RoomId>, order: i32) -> Self {
        RoomContent::InfExit(InfExit {
            x,
            y,
            ref_id: ref_id.into(),
            order,
            flipped: false,
            player: PlayerOrder::Absent,
        })
    }

    /// Grid position
    pub fn pos(&self) -> (i32, i32) {
        match self {
            RoomContent::Wall(c) => (c.x, c.y),
            RoomContent::Floor(c) => (c.x, c.y),
            RoomContent::Block(c) => (c.x, c.y),
            RoomContent::Room(c) => (c.x, c.y),
            RoomContent::InfExit(c) => (c.x, c.y),
        }
    }

    pub fn set_pos(&mut self, x: i32, y: i32) {
        let (cx, cy) = match self {
            RoomContent::Wall(c) => (&mut c.x, &mut c.y),
            RoomContent::Floor(c) => (&mut c.x, &mut c.y),
            RoomContent::Block(c) => (&mut c.x, &mut c.y),
            RoomContent::Room(c) => (&mut c.x, &mut c.y),
            RoomContent::InfExit(c) => (&mut c.x, &mut c.y),
        };
        *cx = x;
        *cy = y;
    }

    pub fn is_wall(&self) -> bool {
        matches!(self, RoomContent::Wall(_))
    }

    /// Tag name, as used in the serialized model
    pub fn kind(&self) -> &'static str {
        match self {
            RoomContent::Wall(_) => "wall",
            RoomContent::Floor(_) => "floor",
            RoomContent::Block(_) => "block",
            RoomContent::Room(_) => "room",
            RoomContent::InfExit(_) => "inf-exit",
        }
    }

    /// Room ids this item points at
    pub fn references(&self) -> Vec<(ReferenceKind, &RoomId)> {
        match self {
            RoomContent::Room(r) => {
                let mut refs = vec![(ReferenceKind::Room, &r.id)];
                if let Some(target) = &r.inf_enter_id {
                    refs.push((ReferenceKind::InfEnter, target));
                }
                refs
            }
            RoomContent::InfExit(e) => vec![(ReferenceKind::InfExit, &e.ref_id)],
            _ => Vec::new(),
        }
    }
}

/// What kind of link a room id was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Room,
    InfEnter,
    InfExit,
    VoidPlane,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceKind::Room => "room reference",
            ReferenceKind::InfEnter => "inf-enter link",
            ReferenceKind::InfExit => "inf-exit",
            ReferenceKind::VoidPlane => "void plane link",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rooms and levels
// ─────────────────────────────────────────────────────────────────────────────

/// Link carried by the void plane room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoidPlane {
    #[serde(default)]
    pub inf_enter_id: Option<RoomId>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub width: i32,
    pub height: i32,
    pub color: Color,
    #[serde(default)]
    pub is_void_plane: bool,
    #[serde(default)]
    pub void_plane: Option<VoidPlane>,
    pub zoom_factor: f64,
    pub special_effect: i32,
    #[serde(default)]
    pub contents: Vec<RoomContent>,
}

impl Room {
    /// Check if a cell lies inside the room rectangle
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// All items placed at a cell
    pub fn content_at(&self, x: i32, y: i32) -> impl Iterator<Item = &RoomContent> {
        self.contents.iter().filter(move |c| c.pos() == (x, y))
    }

    /// Positions of every wall item, in content order
    pub fn wall_cells(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.contents
            .iter()
            .filter(|c| c.is_wall())
            .map(|c| {
                let (x, y) = c.pos();
                GridPoint::new(x, y)
            })
    }

    /// Append an item. Out-of-range positions are allowed
    pub fn place(&mut self, content: RoomContent) {
        self.contents.push(content);
    }

    /// Grow or shrink the room, see [`expand_room`]
    pub fn expand(&mut self, top: i32, right: i32, bottom: i32, left: i32, expand_walls: bool) -> Result<(), ModelError> {
        expand_room(self, top, right, bottom, left, expand_walls)
    }
}

/// Create an empty 5x5 room
pub fn default_room(id: impl Into<RoomId>) -> Room {
    Room {
        id: id.into(),
        width: 5,
        height: 5,
        color: Color::DEFAULT_ROOM,
        is_void_plane: false,
        void_plane: None,
        zoom_factor: 1.0,
        special_effect: 0,
        contents: Vec::new(),
    }
}

/// The entire level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub title: String,
    #[serde(default)]
    pub extrude: bool,
    #[serde(default)]
    pub inner_push: bool,
    #[serde(default)]
    pub style: LevelStyle,
    /// -1 when unset
    #[serde(default = "default_palette")]
    pub custom_level_palette: i32,
    pub rooms: Vec<Room>,
}

fn default_palette() -> i32 {
    -1
}

/// Create a level with a single default room
pub fn default_level(title: impl Into<String>) -> Level {
    Level {
        title: title.into(),
        extrude: false,
        inner_push: false,
        style: LevelStyle::Normal,
        custom_level_palette: -1,
        rooms: vec![default_room(0)],
    }
}

impl Level {
    pub fn room_index(&self, id: &RoomId) -> Option<usize> {
        self.rooms.iter().position(|r| &r.id == id)
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| &r.id == id)
    }

    pub fn room_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| &r.id == id)
    }

    /// Smallest integer id above every integer id in use
    pub fn next_room_id(&self) -> RoomId {
        let next = self
            .rooms
            .iter()
            .filter_map(|r| match r.id {
                RoomId::Int(n) => Some(n),
                RoomId::Name(_) => None,
            })
            .max()
            .map_or(0, |max| max + 1);
        RoomId::Int(next)
    }

    /// Append a default room with a fresh id and return the id
    pub fn add_room(&mut self) -> RoomId {
        let id = self.next_room_id();
        self.rooms.push(default_room(id.clone()));
        id
    }

    /// Remove a room along with every link that targets it.
    ///
    /// References and inf-exits pointing at the room are deleted; inf-enter
    /// and void plane links pointing at it are cleared.
    pub fn remove_room(&mut self, id: &RoomId) -> Result<Room, ModelError> {
        let idx = self
            .room_index(id)
            .ok_or_else(|| ModelError::UnknownRoom(id.clone()))?;
        if self.rooms.len() == 1 {
            return Err(ModelError::LastRoom);
        }
        let removed = self.rooms.remove(idx);

        remove_in_level(self, |c, _, _| match c {
            RoomContent::Room(r) => &r.id == id,
            RoomContent::InfExit(e) => &e.ref_id == id,
            _ => false,
        });

        for room in &mut self.rooms {
            for content in &mut room.contents {
                if let RoomContent::Room(r) = content {
                    if r.inf_enter_id.as_ref() == Some(id) {
                        r.inf_enter_id = None;
                    }
                }
            }
            if let Some(plane) = &mut room.void_plane {
                if plane.inf_enter_id.as_ref() == Some(id) {
                    plane.inf_enter_id = None;
                }
            }
        }

        Ok(removed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutations
// ─────────────────────────────────────────────────────────────────────────────

/// Grow (or shrink, with negative amounts) a room on each side.
///
/// Every cell of the new grid copies the contents of the matching old cell,
/// clamped into the old rectangle. Cells outside the old rectangle only
/// receive walls, and only when `expand_walls` is set, so walls extrude
/// outward while everything else stays put. Contents are rebuilt column by
/// column; items outside the old rectangle are dropped.
///
/// The new size must lie in `1..=MAX_ROOM_SIZE` on both axes.
pub fn expand_room(
    room: &mut Room,
    top: i32,
    right: i32,
    bottom: i32,
    left: i32,
    expand_walls: bool,
) -> Result<(), ModelError> {
    let grow = |size: i32, a: i32, b: i32| size.checked_add(a).and_then(|s| s.checked_add(b));
    let (Some(new_width), Some(new_height)) = (
        grow(room.width, left, right),
        grow(room.height, top, bottom),
    ) else {
        return Err(ModelError::SizeOverflow);
    };

    let fits = |size: i32| (1..=MAX_ROOM_SIZE).contains(&size);
    if room.width < 1 || room.height < 1 || !fits(new_width) || !fits(new_height) {
        return Err(ModelError::InvalidSize {
            width: new_width,
            height: new_height,
        });
    }

    let new_contents = {
        let mut by_cell: HashMap<(i32, i32), Vec<&RoomContent>> = HashMap::new();
        for content in &room.contents {
            by_cell.entry(content.pos()).or_default().push(content);
        }

        let mut new_contents = Vec::with_capacity(room.contents.len());
        for x in 0..new_width {
            for y in 0..new_height {
                let old_x = x - left;
                let old_y = y - bottom;
                let outside = !room.contains(old_x, old_y);
                let key = (
                    old_x.clamp(0, room.width - 1),
                    old_y.clamp(0, room.height - 1),
                );

                let Some(items) = by_cell.get(&key) else {
                    continue;
                };
                for item in items {
                    // Only walls extrude into new territory
                    if outside && !(expand_walls && item.is_wall()) {
                        continue;
                    }
                    let mut moved = (*item).clone();
                    moved.set_pos(x, y);
                    new_contents.push(moved);
                }
            }
        }
        new_contents
    };

    room.width = new_width;
    room.height = new_height;
    room.contents = new_contents;
    Ok(())
}

/// Remove every content item, in every room, for which `pred` holds.
///
/// `pred` receives the item, its current index and the live list. Items are
/// removed in place while iterating, so indices shift after each removal.
/// Returns the number of removed items.
pub fn remove_in_level<F>(level: &mut Level, mut pred: F) -> usize
where
    F: FnMut(&RoomContent, usize, &[RoomContent]) -> bool,
{
    level
        .rooms
        .iter_mut()
        .map(|room| splice_if(&mut room.contents, &mut pred))
        .sum()
}

fn splice_if<T, F>(items: &mut Vec<T>, pred: &mut F) -> usize
where
    F: FnMut(&T, usize, &[T]) -> bool,
{
    let mut removed = 0;
    let mut i = 0;
    while i < items.len() {
        if pred(&items[i], i, items.as_slice()) {
            items.remove(i);
            removed += 1;
        } else {
            i += 1;
        }
    }
    removed
}

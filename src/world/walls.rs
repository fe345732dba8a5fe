//! Wall outline extraction
//!
//! Turns a room's wall cells into closed, axis-aligned boundary cycles.
//! Every cell contributes its four corners as a small linked cycle. When an
//! edge is shared with a neighbouring cell the two edges cancel: the cycles
//! are spliced together by swapping the `next` links of the two corners.
//! Whatever is left links up into the outer and inner (hole) boundaries.
//!
//! Nodes live in a flat arena and link by index, so a splice is a swap.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::model::Room;
use crate::math::GridPoint;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WallError {
    /// A chain of corners did not close; edge cancellation went wrong
    #[error("wall outline chain starting at node {start} never closed")]
    ImpossibleState { start: usize },
    /// A cell's far corner does not fit in an `i32`
    #[error("wall cell ({x}, {y}) is too far out to trace")]
    CoordinateOverflow { x: i32, y: i32 },
}

/// Corner of a wall cell, linked to the next corner of its cycle
#[derive(Debug, Clone, Copy)]
struct Node {
    point: GridPoint,
    next: usize,
}

/// Normalized key of the edge from a node to its successor.
///
/// Both directions of the same edge map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EdgeKey {
    Vertical { x: i32, y_min: i32, y_max: i32 },
    Horizontal { y: i32, x_min: i32, x_max: i32 },
}

fn edge_key(nodes: &[Node], idx: usize) -> EdgeKey {
    let a = nodes[idx].point;
    let b = nodes[nodes[idx].next].point;
    if a.x == b.x {
        EdgeKey::Vertical {
            x: a.x,
            y_min: a.y.min(b.y),
            y_max: a.y.max(b.y),
        }
    } else {
        EdgeKey::Horizontal {
            y: a.y,
            x_min: a.x.min(b.x),
            x_max: a.x.max(b.x),
        }
    }
}

/// Extract the outline cycles of a room's walls
pub fn room_wall_cycles(room: &Room) -> Result<Vec<Vec<GridPoint>>, WallError> {
    wall_cycles(room.wall_cells())
}

/// Extract the boundary cycles of the union of unit cells.
///
/// Each returned cycle is a closed polygon (last point connects back to the
/// first) made of grid corners. Cycles come out in no particular order and
/// may start at any corner. Corners between two collinear edges from
/// abutting cells are kept. A cell listed more than once counts once.
pub fn wall_cycles<I>(cells: I) -> Result<Vec<Vec<GridPoint>>, WallError>
where
    I: IntoIterator<Item = GridPoint>,
{
    let mut seen = HashSet::new();
    let mut nodes: Vec<Node> = Vec::new();
    let mut edges: HashMap<EdgeKey, usize> = HashMap::new();
    let mut cancelled = 0usize;

    for cell in cells {
        if !seen.insert(cell) {
            continue;
        }

        let (x1, y1) = cell
            .x
            .checked_add(1)
            .zip(cell.y.checked_add(1))
            .ok_or(WallError::CoordinateOverflow { x: cell.x, y: cell.y })?;

        let base = nodes.len();
        let corners = [
            GridPoint::new(cell.x, cell.y),
            GridPoint::new(x1, cell.y),
            GridPoint::new(x1, y1),
            GridPoint::new(cell.x, y1),
        ];
        for (i, point) in corners.into_iter().enumerate() {
            nodes.push(Node {
                point,
                next: base + (i + 1) % 4,
            });
        }

        for p in base..base + 4 {
            let key = edge_key(&nodes, p);
            match edges.remove(&key) {
                Some(t) => {
                    let p_next = nodes[p].next;
                    nodes[p].next = nodes[t].next;
                    nodes[t].next = p_next;
                    cancelled += 1;
                }
                None => {
                    edges.insert(key, p);
                }
            }
        }
    }

    let cycles = collect_cycles(&nodes)?;
    tracing::trace!(
        cells = seen.len(),
        cancelled,
        cycles = cycles.len(),
        "extracted wall outline"
    );
    Ok(cycles)
}

/// Walk every chain of the arena once
fn collect_cycles(nodes: &[Node]) -> Result<Vec<Vec<GridPoint>>, WallError> {
    let mut visited = vec![false; nodes.len()];
    let mut cycles = Vec::new();

    for start in 0..nodes.len() {
        if visited[start] {
            continue;
        }

        let mut cycle = Vec::new();
        let mut curr = start;
        loop {
            if visited[curr] {
                // Reached a node owned by another chain, or looped short of start
                return Err(WallError::ImpossibleState { start });
            }
            visited[curr] = true;
            cycle.push(nodes[curr].point);
            curr = nodes[curr].next;
            if curr == start {
                break;
            }
        }

        let deduped = remove_consecutive_duplicates(&cycle);
        if !deduped.is_empty() {
            cycles.push(deduped);
        }
    }

    Ok(cycles)
}

/// Drop every point equal to its cyclic successor
fn remove_consecutive_duplicates(cycle: &[GridPoint]) -> Vec<GridPoint> {
    let n = cycle.len();
    cycle
        .iter()
        .enumerate()
        .filter(|&(i, p)| *p != cycle[(i + 1) % n])
        .map(|(_, p)| *p)
        .collect()
}

//! Grid adjacency boundary.
//!
//! The routing core never owns the world's tile map. It asks a
//! [`GridAdjacency`] implementation what occupies a cell and classifies the
//! answer with the closed [`Cell`] variant. [`TileGrid`] is a ready-made
//! implementation for hosts without their own tile map (and for tests).

use crate::id::ConsumerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Positions and directions
// ---------------------------------------------------------------------------

/// A position on the 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The orthogonally adjacent position in `dir`, or `None` past the
    /// edge of the `i32` coordinate range.
    pub fn step(self, dir: Direction) -> Option<Self> {
        let (dx, dy) = dir.offset();
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }
}

/// Cardinal directions. Connectivity is 4-directional only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions, in enumeration order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}

// ---------------------------------------------------------------------------
// Cell classification
// ---------------------------------------------------------------------------

/// What occupies a grid cell, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// A router node. Extends connectivity, never receives items from the ring.
    Router,
    /// A block that holds items and may receive them from adjacent routers.
    Consumer(ConsumerId),
    /// Anything else (walls, conveyors facing away, decoration).
    Inert,
}

impl Cell {
    pub fn is_router_type(&self) -> bool {
        matches!(self, Cell::Router)
    }

    /// Routers never deliver to other routers, so only consumers qualify.
    pub fn is_eligible_destination(&self) -> bool {
        matches!(self, Cell::Consumer(_))
    }

    pub fn consumer(&self) -> Option<ConsumerId> {
        match self {
            Cell::Consumer(id) => Some(*id),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Adjacency provider
// ---------------------------------------------------------------------------

/// Answers what occupies a cell of the host's world.
pub trait GridAdjacency {
    /// The occupant of `pos`, or `None` for an empty cell.
    fn cell_at(&self, pos: GridPosition) -> Option<Cell>;

    /// The occupant of the cell next to `pos` in `dir`. Cells past the
    /// coordinate range are empty.
    fn neighbor(&self, pos: GridPosition, dir: Direction) -> Option<Cell> {
        self.cell_at(pos.step(dir)?)
    }
}

/// Distinct eligible destinations around `pos`, in [`Direction::all`] order.
pub fn destinations_around(grid: &impl GridAdjacency, pos: GridPosition) -> Vec<ConsumerId> {
    let mut out = Vec::with_capacity(4);
    for dir in Direction::all() {
        let Some(cell) = grid.neighbor(pos, dir) else {
            continue;
        };
        if !cell.is_eligible_destination() {
            continue;
        }
        if let Some(consumer) = cell.consumer() {
            if !out.contains(&consumer) {
                out.push(consumer);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// TileGrid
// ---------------------------------------------------------------------------

/// A sparse tile map implementing [`GridAdjacency`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileGrid {
    tiles: BTreeMap<GridPosition, Cell>,
}

impl TileGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the occupant of a cell. Returns the previous occupant.
    pub fn set(&mut self, pos: GridPosition, cell: Cell) -> Option<Cell> {
        self.tiles.insert(pos, cell)
    }

    /// Empty a cell. Returns the previous occupant.
    pub fn clear(&mut self, pos: GridPosition) -> Option<Cell> {
        self.tiles.remove(&pos)
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterate occupied cells in position order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPosition, Cell)> + '_ {
        self.tiles.iter().map(|(&pos, &cell)| (pos, cell))
    }
}

impl GridAdjacency for TileGrid {
    fn cell_at(&self, pos: GridPosition) -> Option<Cell> {
        self.tiles.get(&pos).copied()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i32, y: i32) -> GridPosition {
        GridPosition::new(x, y)
    }

    #[test]
    fn step_follows_offsets() {
        let p = pos(3, 3);
        assert_eq!(p.step(Direction::North), Some(pos(3, 2)));
        assert_eq!(p.step(Direction::East), Some(pos(4, 3)));
        assert_eq!(p.step(Direction::South), Some(pos(3, 4)));
        assert_eq!(p.step(Direction::West), Some(pos(2, 3)));
    }

    #[test]
    fn step_stops_at_coordinate_limits() {
        assert_eq!(pos(i32::MAX, 0).step(Direction::East), None);
        assert_eq!(pos(i32::MIN, 0).step(Direction::West), None);
        assert_eq!(pos(0, i32::MIN).step(Direction::North), None);
        assert_eq!(pos(0, i32::MAX).step(Direction::South), None);
        assert_eq!(pos(i32::MAX, 0).step(Direction::West), Some(pos(i32::MAX - 1, 0)));
    }

    #[test]
    fn corner_cells_have_no_outside_neighbors() {
        let mut grid = TileGrid::new();
        let corner = pos(i32::MAX, i32::MIN);
        grid.set(corner, Cell::Router);
        grid.set(pos(i32::MAX - 1, i32::MIN), Cell::Consumer(ConsumerId(4)));

        assert_eq!(grid.neighbor(corner, Direction::East), None);
        assert_eq!(grid.neighbor(corner, Direction::North), None);
        assert_eq!(destinations_around(&grid, corner), vec![ConsumerId(4)]);
    }

    #[test]
    fn opposite_round_trips() {
        for dir in Direction::all() {
            assert_eq!(dir.opposite().opposite(), dir);
            let back = pos(0, 0).step(dir).and_then(|p| p.step(dir.opposite()));
            assert_eq!(back, Some(pos(0, 0)));
        }
    }

    #[test]
    fn cell_classification() {
        assert!(Cell::Router.is_router_type());
        assert!(!Cell::Router.is_eligible_destination());
        assert!(Cell::Consumer(ConsumerId(1)).is_eligible_destination());
        assert!(!Cell::Consumer(ConsumerId(1)).is_router_type());
        assert!(!Cell::Inert.is_router_type());
        assert!(!Cell::Inert.is_eligible_destination());
    }

    #[test]
    fn tile_grid_neighbor_lookup() {
        let mut grid = TileGrid::new();
        grid.set(pos(0, 0), Cell::Router);
        grid.set(pos(1, 0), Cell::Consumer(ConsumerId(7)));

        assert_eq!(
            grid.neighbor(pos(0, 0), Direction::East),
            Some(Cell::Consumer(ConsumerId(7)))
        );
        assert_eq!(grid.neighbor(pos(0, 0), Direction::West), None);
        assert_eq!(grid.neighbor(pos(1, 0), Direction::West), Some(Cell::Router));
    }

    #[test]
    fn set_and_clear_report_previous() {
        let mut grid = TileGrid::new();
        assert_eq!(grid.set(pos(2, 2), Cell::Inert), None);
        assert_eq!(grid.set(pos(2, 2), Cell::Router), Some(Cell::Inert));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.clear(pos(2, 2)), Some(Cell::Router));
        assert!(grid.is_empty());
    }

    #[test]
    fn destinations_skip_routers_and_inert() {
        let mut grid = TileGrid::new();
        grid.set(pos(0, 0), Cell::Router);
        grid.set(pos(0, -1), Cell::Consumer(ConsumerId(1)));
        grid.set(pos(1, 0), Cell::Router);
        grid.set(pos(0, 1), Cell::Inert);
        grid.set(pos(-1, 0), Cell::Consumer(ConsumerId(2)));

        assert_eq!(
            destinations_around(&grid, pos(0, 0)),
            vec![ConsumerId(1), ConsumerId(2)]
        );
    }

    #[test]
    fn destinations_are_deduplicated() {
        // A multi-tile consumer touching two sides of the same router.
        let mut grid = TileGrid::new();
        grid.set(pos(0, -1), Cell::Consumer(ConsumerId(9)));
        grid.set(pos(1, 0), Cell::Consumer(ConsumerId(9)));

        assert_eq!(destinations_around(&grid, pos(0, 0)), vec![ConsumerId(9)]);
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod action;
pub mod agent;
pub mod config;
pub mod environment;
pub mod goals;
pub mod item;
pub mod map;
pub mod pathfinding;
pub mod selector;
pub mod synthesis;
pub mod world;

/// Unique identifier for agents, assigned in registration order.
pub type AgentId = usize;
/// Unique identifier for items (ingredients, plates).
pub type ItemId = usize;
/// Unique identifier for entries of the goal space.
pub type TaskId = usize;
/// Index of a station in the kitchen layout.
pub type StationId = usize;

/// Represents a 2D coordinate. `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Applies a signed displacement, returning `None` when it would leave
    /// the non-negative quadrant.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    pub fn manhattan_distance(self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Down, up, left, right. Stations are only reachable from these cells.
    pub fn orthogonal_neighbours(self) -> impl Iterator<Item = Position> {
        [(0, 1), (0, -1), (-1, 0), (1, 0)]
            .into_iter()
            .filter_map(move |(dx, dy)| self.offset(dx, dy))
    }

    pub fn is_orthogonally_adjacent(self, other: Position) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Recoverable failures of a single planning attempt.
///
/// None of these abort a turn: the planner logs them and falls back to a
/// cheaper decision for the affected agent only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("no walkable route from {from} to {to}")]
    PathNotFound { from: Position, to: Position },
    #[error("task {task} references a missing station: {station}")]
    MissingStation { task: TaskId, station: String },
    #[error("no obstacle-free decomposition of a {steps}-step path from {start}")]
    NoValidDecomposition { start: Position, steps: usize },
}

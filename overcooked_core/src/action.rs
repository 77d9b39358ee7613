use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Position, TaskId};

/// The primitive action vocabulary exposed to the execution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MoveDiagonalLeftUp,
    MoveDiagonalRightUp,
    MoveDiagonalLeftDown,
    MoveDiagonalRightDown,
    Stay,
    Pick,
    Chop,
    Cook,
    Scoop,
    Serve,
    Drop,
}

impl Action {
    pub const ORTHOGONAL_MOVES: [Action; 4] = [
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveUp,
        Action::MoveDown,
    ];

    /// All movement actions, orthogonal first. Neighbour expansion follows this order.
    pub const MOVES: [Action; 8] = [
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveUp,
        Action::MoveDown,
        Action::MoveDiagonalLeftUp,
        Action::MoveDiagonalRightUp,
        Action::MoveDiagonalLeftDown,
        Action::MoveDiagonalRightDown,
    ];

    /// Grid displacement of a movement action, `None` for everything else.
    pub fn delta(self) -> Option<(isize, isize)> {
        match self {
            Action::MoveLeft => Some((-1, 0)),
            Action::MoveRight => Some((1, 0)),
            Action::MoveUp => Some((0, -1)),
            Action::MoveDown => Some((0, 1)),
            Action::MoveDiagonalLeftUp => Some((-1, -1)),
            Action::MoveDiagonalRightUp => Some((1, -1)),
            Action::MoveDiagonalLeftDown => Some((-1, 1)),
            Action::MoveDiagonalRightDown => Some((1, 1)),
            _ => None,
        }
    }

    /// Converts a displacement between adjacent cells into a movement action.
    pub fn from_delta(dx: isize, dy: isize) -> Option<Action> {
        Action::MOVES
            .into_iter()
            .find(|action| action.delta() == Some((dx, dy)))
    }

    pub fn is_movement(self) -> bool {
        self.delta().is_some()
    }

    pub fn is_diagonal(self) -> bool {
        matches!(self.delta(), Some((dx, dy)) if dx != 0 && dy != 0)
    }

    /// Splits a diagonal move into its (horizontal, vertical) components.
    pub fn split_diagonal(self) -> Option<(Action, Action)> {
        let (dx, dy) = self.delta()?;
        if dx == 0 || dy == 0 {
            return None;
        }
        Some((Action::from_delta(dx, 0)?, Action::from_delta(0, dy)?))
    }

    /// Merges two perpendicular orthogonal moves into the equivalent diagonal.
    pub fn merge_orthogonal(first: Action, second: Action) -> Option<Action> {
        if first.is_diagonal() || second.is_diagonal() {
            return None;
        }
        let (ax, ay) = first.delta()?;
        let (bx, by) = second.delta()?;
        let (dx, dy) = (ax + bx, ay + by);
        if dx.abs() == 1 && dy.abs() == 1 {
            Action::from_delta(dx, dy)
        } else {
            None
        }
    }

    /// Cell reached by applying this action from `from`.
    pub fn apply_to(self, from: Position) -> Option<Position> {
        match self.delta() {
            Some((dx, dy)) => from.offset(dx, dy),
            None => Some(from),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::MoveLeft => "MOVE_LEFT",
            Action::MoveRight => "MOVE_RIGHT",
            Action::MoveUp => "MOVE_UP",
            Action::MoveDown => "MOVE_DOWN",
            Action::MoveDiagonalLeftUp => "MOVE_DIAGONAL_LEFT_UP",
            Action::MoveDiagonalRightUp => "MOVE_DIAGONAL_RIGHT_UP",
            Action::MoveDiagonalLeftDown => "MOVE_DIAGONAL_LEFT_DOWN",
            Action::MoveDiagonalRightDown => "MOVE_DIAGONAL_RIGHT_DOWN",
            Action::Stay => "STAY",
            Action::Pick => "PICK",
            Action::Chop => "CHOP",
            Action::Cook => "COOK",
            Action::Scoop => "SCOOP",
            Action::Serve => "SERVE",
            Action::Drop => "DROP",
        };
        f.write_str(name)
    }
}

/// Fixed reward constant per action, consumed by goal scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTable {
    pub move_orthogonal: i32,
    pub move_diagonal: i32,
    pub stay: i32,
    pub pick: i32,
    pub chop: i32,
    pub cook: i32,
    pub scoop: i32,
    pub serve: i32,
    pub drop: i32,
}

impl Default for RewardTable {
    fn default() -> Self {
        RewardTable {
            move_orthogonal: -1,
            move_diagonal: -2,
            stay: -2,
            pick: 10,
            chop: 30,
            cook: 45,
            scoop: 50,
            serve: 100,
            drop: 0,
        }
    }
}

impl RewardTable {
    pub fn reward(&self, action: Action) -> i32 {
        match action {
            Action::MoveLeft | Action::MoveRight | Action::MoveUp | Action::MoveDown => {
                self.move_orthogonal
            }
            Action::MoveDiagonalLeftUp
            | Action::MoveDiagonalRightUp
            | Action::MoveDiagonalLeftDown
            | Action::MoveDiagonalRightDown => self.move_diagonal,
            Action::Stay => self.stay,
            Action::Pick => self.pick,
            Action::Chop => self.chop,
            Action::Cook => self.cook,
            Action::Scoop => self.scoop,
            Action::Serve => self.serve,
            Action::Drop => self.drop,
        }
    }
}

/// One primitive action as handed to the world for execution.
///
/// Interactions carry the station or counter cell they act upon and, when
/// issued by the planner, the task they advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub action: Action,
    pub target: Option<Position>,
    pub task: Option<TaskId>,
}

impl PlannedStep {
    pub fn movement(action: Action) -> Self {
        PlannedStep {
            action,
            target: None,
            task: None,
        }
    }

    pub fn stay() -> Self {
        PlannedStep::movement(Action::Stay)
    }

    pub fn interact(action: Action, target: Position, task: Option<TaskId>) -> Self {
        PlannedStep {
            action,
            target: Some(target),
            task,
        }
    }
}

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use crate::{AgentId, PlanError, Position, action::Action, map::KitchenLayout, world::WorldState};

pub const ORTHOGONAL_STEP_COST: u32 = 1;
/// A diagonal step costs as much as the two orthogonal steps it decomposes into.
pub const DIAGONAL_STEP_COST: u32 = 2;

/// Lowest-cost route found by [`NavGraph::search`], start and goal inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: Vec<Position>,
    pub cost: u32,
}

impl Route {
    /// The movement actions that walk this route.
    pub fn actions(&self) -> Vec<Action> {
        self.path
            .windows(2)
            .filter_map(|pair| {
                let dx = pair[1].x as isize - pair[0].x as isize;
                let dy = pair[1].y as isize - pair[0].y as isize;
                Action::from_delta(dx, dy)
            })
            .collect()
    }
}

/// Walkable-cell graph of a kitchen, with a per-call set of temporary barriers.
#[derive(Debug, Clone)]
pub struct NavGraph<'a> {
    layout: &'a KitchenLayout,
    barriers: HashSet<Position>,
}

impl<'a> NavGraph<'a> {
    pub fn new(layout: &'a KitchenLayout) -> Self {
        Self {
            layout,
            barriers: HashSet::new(),
        }
    }

    pub fn with_barriers(layout: &'a KitchenLayout, barriers: HashSet<Position>) -> Self {
        Self { layout, barriers }
    }

    /// Graph for planning on behalf of `agent_id`: every other agent's cell is a barrier.
    pub fn for_agent(layout: &'a KitchenLayout, world: &WorldState, agent_id: AgentId) -> Self {
        Self::with_barriers(layout, world.other_agent_cells(agent_id))
    }

    pub fn layout(&self) -> &'a KitchenLayout {
        self.layout
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        self.layout.is_floor(pos) && !self.barriers.contains(&pos)
    }

    /// Walkable neighbours of `pos` with their step cost, in [`Action::MOVES`] order.
    pub fn neighbours(&self, pos: Position) -> Vec<(Position, u32)> {
        Action::MOVES
            .into_iter()
            .filter_map(|action| {
                let next = action.apply_to(pos)?;
                if !self.is_walkable(next) {
                    return None;
                }
                let cost = if action.is_diagonal() {
                    DIAGONAL_STEP_COST
                } else {
                    ORTHOGONAL_STEP_COST
                };
                Some((next, cost))
            })
            .collect()
    }

    /// Manhattan distance. Never overestimates: a diagonal step covers two
    /// units of it at a cost of two.
    pub fn heuristic(a: Position, b: Position) -> u32 {
        a.manhattan_distance(b) as u32
    }

    /// A* search from `start` to `goal`.
    ///
    /// The start cell is never checked for walkability, so an agent standing
    /// on an unusual cell can still plan its way out. Frontier ties are
    /// expanded in insertion order.
    pub fn search(&self, start: Position, goal: Position) -> Result<Route, PlanError> {
        #[derive(Clone, Eq, PartialEq)]
        struct PrioritizedItem {
            priority: u32,
            seq: u64,
            position: Position,
        }

        impl Ord for PrioritizedItem {
            fn cmp(&self, other: &Self) -> Ordering {
                // Reverse ordering for min-heap behavior
                other
                    .priority
                    .cmp(&self.priority)
                    .then_with(|| other.seq.cmp(&self.seq))
            }
        }

        impl PartialOrd for PrioritizedItem {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let not_found = PlanError::PathNotFound {
            from: start,
            to: goal,
        };
        if start != goal && !self.is_walkable(goal) {
            return Err(not_found);
        }

        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut cost_so_far: HashMap<Position, u32> = HashMap::new();
        let mut seq = 0u64;

        frontier.push(PrioritizedItem {
            priority: Self::heuristic(start, goal),
            seq,
            position: start,
        });
        cost_so_far.insert(start, 0);

        while let Some(PrioritizedItem {
            position: current, ..
        }) = frontier.pop()
        {
            if current == goal {
                break;
            }
            let current_cost = cost_so_far[&current];

            for (neighbour, step) in self.neighbours(current) {
                let new_cost = current_cost + step;
                if cost_so_far
                    .get(&neighbour)
                    .is_none_or(|&known| new_cost < known)
                {
                    cost_so_far.insert(neighbour, new_cost);
                    came_from.insert(neighbour, current);
                    seq += 1;
                    frontier.push(PrioritizedItem {
                        priority: new_cost + Self::heuristic(neighbour, goal),
                        seq,
                        position: neighbour,
                    });
                }
            }
        }

        let Some(&cost) = cost_so_far.get(&goal) else {
            return Err(not_found);
        };

        let mut path = vec![goal];
        let mut current = goal;
        while current != start {
            current = *came_from.get(&current).ok_or(not_found.clone())?;
            path.push(current);
        }
        path.reverse();
        Ok(Route { path, cost })
    }
}

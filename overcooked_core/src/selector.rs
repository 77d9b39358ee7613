use rand::{Rng, seq::IndexedRandom};
use tracing::warn;

use crate::{
    Position, TaskId,
    action::{Action, PlannedStep},
    goals::{Goal, GoalMap},
    map::KitchenLayout,
};

/// Normalised selection weights, `exp(-beta * reward) / sum`, in map order.
///
/// With a negative `beta` the weight grows with reward. Exponents are
/// shifted by their maximum before exponentiating, which leaves the
/// normalised result unchanged but keeps large rewards finite.
pub fn softmax_weights(goals: &GoalMap, beta: f64) -> Vec<(TaskId, f64)> {
    let exponents: Vec<(TaskId, f64)> = goals
        .values()
        .map(|goal| (goal.task, -beta * goal.reward))
        .collect();
    let Some(max) = exponents.iter().map(|(_, e)| *e).reduce(f64::max) else {
        return Vec::new();
    };
    let raw: Vec<(TaskId, f64)> = exponents
        .into_iter()
        .map(|(task, e)| (task, (e - max).exp()))
        .collect();
    let total: f64 = raw.iter().map(|(_, w)| w).sum();
    raw.into_iter().map(|(task, w)| (task, w / total)).collect()
}

/// Picks uniformly among the goals sharing the maximum weight.
pub fn select_goal<'g, R: Rng + ?Sized>(goals: &'g GoalMap, beta: f64, rng: &mut R) -> Option<&'g Goal> {
    let weights = softmax_weights(goals, beta);
    let best = weights.iter().map(|(_, w)| *w).reduce(f64::max)?;
    let tied: Vec<TaskId> = weights
        .into_iter()
        .filter(|(_, w)| *w == best)
        .map(|(task, _)| task)
        .collect();
    tied.choose(rng).and_then(|task| goals.get(task))
}

/// Decision for an agent with nothing reachable to do.
///
/// An agent standing on a staging cell may be in someone's way, so it steps
/// to a random free orthogonal neighbour. Otherwise it stays put.
pub fn fallback_step<R: Rng + ?Sized>(
    layout: &KitchenLayout,
    location: Position,
    is_free: impl Fn(Position) -> bool,
    rng: &mut R,
) -> PlannedStep {
    if layout.blocking_cells().contains(&location) {
        let legal: Vec<Action> = Action::ORTHOGONAL_MOVES
            .into_iter()
            .filter(|action| action.apply_to(location).is_some_and(|next| is_free(next)))
            .collect();
        if let Some(&action) = legal.choose(rng) {
            return PlannedStep::movement(action);
        }
        warn!(%location, "agent is boxed in on a staging cell");
    }
    PlannedStep::stay()
}

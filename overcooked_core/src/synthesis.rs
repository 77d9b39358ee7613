//! Turns a route into a concrete, grid-legal sequence of primitive moves.
//!
//! Every diagonal step may be kept or split into its two orthogonal
//! components in either order. The first two steps additionally get a swap
//! (orthogonal then diagonal) or merge (two perpendicular orthogonals) rewrite,
//! which helps when an agent starts wedged next to a counter corner.

use std::collections::HashSet;

use rand::{Rng, seq::IndexedRandom};

use crate::{
    PlanError, Position,
    action::Action,
    pathfinding::{DIAGONAL_STEP_COST, NavGraph, ORTHOGONAL_STEP_COST},
};

/// Rewrites of the first two steps, if any apply.
fn prefix_rewrites(actions: &[Action]) -> Vec<Vec<Action>> {
    let [first, second, rest @ ..] = actions else {
        return Vec::new();
    };
    let mut rewrites = Vec::new();
    if !first.is_diagonal() && second.is_diagonal() {
        let mut swapped = vec![*second, *first];
        swapped.extend_from_slice(rest);
        rewrites.push(swapped);
    }
    if let Some(merged) = Action::merge_orthogonal(*first, *second) {
        let mut joined = vec![merged];
        joined.extend_from_slice(rest);
        rewrites.push(joined);
    }
    rewrites
}

/// Expands a move sequence into the decomposition tree over its first
/// `max_branching` diagonal steps.
fn decompositions(actions: &[Action], max_branching: usize) -> Vec<Vec<Action>> {
    let mut partials: Vec<Vec<Action>> = vec![Vec::with_capacity(actions.len() * 2)];
    let mut branched = 0;

    for &action in actions {
        let split = if branched < max_branching {
            action.split_diagonal()
        } else {
            None
        };
        match split {
            Some((horizontal, vertical)) => {
                branched += 1;
                partials = partials
                    .into_iter()
                    .flat_map(|prefix| {
                        [vec![action], vec![horizontal, vertical], vec![vertical, horizontal]]
                            .into_iter()
                            .map(move |tail| {
                                let mut next = prefix.clone();
                                next.extend(tail);
                                next
                            })
                    })
                    .collect();
            }
            None => partials.iter_mut().for_each(|prefix| prefix.push(action)),
        }
    }
    partials
}

/// All candidate sequences for `actions`, the unmodified sequence first,
/// without duplicates.
pub fn expand_candidates(actions: &[Action], max_branching: usize) -> Vec<Vec<Action>> {
    let mut seeds = vec![actions.to_vec()];
    seeds.extend(prefix_rewrites(actions));

    let mut seen = HashSet::new();
    seeds
        .iter()
        .flat_map(|seed| decompositions(seed, max_branching))
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

/// Whether walking `actions` from `start` only ever enters walkable cells.
pub fn is_obstacle_free(nav: &NavGraph, start: Position, actions: &[Action]) -> bool {
    let mut current = start;
    for action in actions {
        match action.apply_to(current) {
            Some(next) if nav.is_walkable(next) => current = next,
            _ => return false,
        }
    }
    true
}

/// Movement cost of a sequence, diagonals counted double.
pub fn sequence_cost(actions: &[Action]) -> u32 {
    actions
        .iter()
        .filter(|action| action.is_movement())
        .map(|action| {
            if action.is_diagonal() {
                DIAGONAL_STEP_COST
            } else {
                ORTHOGONAL_STEP_COST
            }
        })
        .sum()
}

/// Picks one obstacle-free candidate uniformly at random.
pub fn synthesize<R: Rng + ?Sized>(
    nav: &NavGraph,
    start: Position,
    actions: &[Action],
    max_branching: usize,
    rng: &mut R,
) -> Result<Vec<Action>, PlanError> {
    let valid: Vec<Vec<Action>> = expand_candidates(actions, max_branching)
        .into_iter()
        .filter(|candidate| is_obstacle_free(nav, start, candidate))
        .collect();
    valid
        .choose(rng)
        .cloned()
        .ok_or(PlanError::NoValidDecomposition {
            start,
            steps: actions.len(),
        })
}

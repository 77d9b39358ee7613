//! Goal enumeration: for one agent, turn every outstanding task into a
//! concrete interaction (action, target cell, staging cell, route) and score it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    PlanError, Position, TaskId,
    action::Action,
    environment::EnvironmentView,
    item::{IngredientState, Item, Plate, PlateState},
    pathfinding::{NavGraph, Route},
    world::{Task, TaskKind},
};

/// A reachable, scored interaction that advances one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub task: TaskId,
    pub action: Action,
    /// The station or counter cell acted upon.
    pub target: Position,
    /// Floor cell orthogonally adjacent to `target` the agent walks to.
    pub staging: Position,
    pub route: Route,
    /// Action reward minus path cost.
    pub reward: f64,
}

impl Goal {
    pub fn cost(&self) -> u32 {
        self.route.cost
    }
}

/// Goals keyed by task id. Ordered so that enumeration is reproducible.
pub type GoalMap = BTreeMap<TaskId, Goal>;

/// The interaction a task calls for given what the agent currently holds,
/// plus every cell where it could be carried out.
///
/// `Ok(None)` means the task has nothing to offer right now (wrong item in
/// hand, pot busy); an error means the kitchen lacks the station entirely.
pub fn candidate_targets(
    view: &EnvironmentView,
    task: &Task,
) -> Result<Option<(Action, Vec<Position>)>, PlanError> {
    let missing = |station: &str| PlanError::MissingStation {
        task: task.id,
        station: station.to_string(),
    };
    let layout = view.layout;
    let world = view.world;

    match (task.kind, &view.agent.holding) {
        (TaskKind::Ingredient, None) => {
            let burnt: Vec<Position> = world
                .pots
                .iter()
                .filter(|pot| pot.is_burnt())
                .map(|pot| pot.location)
                .collect();
            let pot_free = view
                .config
                .recipe(&task.dish)
                .is_some_and(|recipe| world.pots.iter().any(|pot| pot.accepts(&task.ingredient, recipe.count)));
            // No pot can take this unit until a burnt one is emptied.
            if !burnt.is_empty() && !pot_free {
                return Ok(Some((Action::Pick, burnt)));
            }
            let mut targets: Vec<Position> = world
                .items
                .iter()
                .filter(|placed| {
                    matches!(&placed.item, Item::Ingredient(i)
                        if i.name == task.ingredient && i.state != IngredientState::Cooked)
                })
                .map(|placed| placed.location)
                .collect();
            let sources = layout.ingredient_sources(&task.ingredient);
            if targets.is_empty() && sources.is_empty() {
                return Err(missing(&format!("{} source", task.ingredient)));
            }
            targets.extend(sources);
            targets.extend(burnt);
            Ok(Some((Action::Pick, targets)))
        }
        (TaskKind::Ingredient, Some(Item::Ingredient(held))) if held.name == task.ingredient => {
            match held.state {
                IngredientState::Fresh => {
                    let boards = layout.chopping_boards();
                    if boards.is_empty() {
                        return Err(missing("chopping board"));
                    }
                    let free: Vec<_> = boards
                        .into_iter()
                        .filter(|&board| world.item_at(board).is_none())
                        .collect();
                    Ok((!free.is_empty()).then_some((Action::Chop, free)))
                }
                IngredientState::Chopped => {
                    if world.pots.is_empty() {
                        return Err(missing("stove"));
                    }
                    let required = view
                        .config
                        .recipe(&task.dish)
                        .map(|recipe| recipe.count)
                        .ok_or_else(|| missing(&format!("recipe {}", task.dish)))?;
                    // The fullest matching pot, else the first empty one.
                    let accepting = world
                        .pots
                        .iter()
                        .filter(|pot| pot.accepts(&task.ingredient, required));
                    let fullest = accepting.clone().filter(|pot| pot.count() > 0).reduce(
                        |best, pot| if pot.count() > best.count() { pot } else { best },
                    );
                    let pot = fullest.or_else(|| accepting.clone().next());
                    Ok(pot.map(|pot| (Action::Cook, vec![pot.location])))
                }
                IngredientState::Cooked => Ok(None),
            }
        }
        (TaskKind::Dish, None) => {
            let plated: Vec<_> = world
                .items
                .iter()
                .filter(|placed| {
                    matches!(&placed.item, Item::Plate(Plate { dish: Some(dish), .. }) if *dish == task.dish)
                })
                .map(|placed| placed.location)
                .collect();
            if !plated.is_empty() {
                return Ok(Some((Action::Pick, plated)));
            }
            let pot_ready = world
                .pots
                .iter()
                .any(|pot| pot.is_full() && pot.ingredient() == Some(task.ingredient.as_str()));
            if !pot_ready {
                return Ok(None);
            }
            let plates: Vec<_> = world
                .items
                .iter()
                .filter(|placed| {
                    matches!(&placed.item, Item::Plate(plate) if plate.state == PlateState::Empty)
                })
                .map(|placed| placed.location)
                .collect();
            Ok((!plates.is_empty()).then_some((Action::Pick, plates)))
        }
        (TaskKind::Dish, Some(Item::Plate(plate))) => match plate.state {
            PlateState::Empty => {
                if world.pots.is_empty() {
                    return Err(missing("stove"));
                }
                // Cooking pots are valid targets: the agent waits beside them.
                let pots: Vec<_> = world
                    .pots
                    .iter()
                    .filter(|pot| pot.is_full() && pot.ingredient() == Some(task.ingredient.as_str()))
                    .map(|pot| pot.location)
                    .collect();
                Ok((!pots.is_empty()).then_some((Action::Scoop, pots)))
            }
            PlateState::Plated if plate.dish.as_deref() == Some(task.dish.as_str()) => {
                let counters = layout.serving_counters();
                if counters.is_empty() {
                    return Err(missing("serving counter"));
                }
                Ok(Some((Action::Serve, counters)))
            }
            PlateState::Plated => Ok(None),
        },
        _ => Ok(None),
    }
}

/// Cheapest way to reach any staging cell of any target.
///
/// Targets and their staging cells are tried in order; the first minimal
/// cost wins.
pub fn cheapest_route(
    nav: &NavGraph,
    start: Position,
    targets: &[Position],
) -> Result<(Position, Position, Route), PlanError> {
    let mut best: Option<(Position, Position, Route)> = None;
    let mut last_error = None;

    for &target in targets {
        for staging in nav.layout().staging_cells(target) {
            match nav.search(start, staging) {
                Ok(route) => {
                    if best.as_ref().is_none_or(|(_, _, known)| route.cost < known.cost) {
                        best = Some((target, staging, route));
                    }
                }
                Err(err) => last_error = Some(err),
            }
        }
    }

    best.ok_or_else(|| {
        last_error.unwrap_or(PlanError::PathNotFound {
            from: start,
            to: targets.first().copied().unwrap_or(start),
        })
    })
}

/// Scores one task for the viewing agent.
pub fn evaluate_task(view: &EnvironmentView, nav: &NavGraph, task: &Task) -> Result<Option<Goal>, PlanError> {
    let Some((action, targets)) = candidate_targets(view, task)? else {
        return Ok(None);
    };
    let (target, staging, route) = cheapest_route(nav, view.agent.location, &targets)?;
    let reward = f64::from(view.config.rewards.reward(action)) - f64::from(route.cost);
    Ok(Some(Goal {
        task: task.id,
        action,
        target,
        staging,
        route,
        reward,
    }))
}

/// Every reachable goal for the viewing agent.
///
/// Tasks claimed by another agent are left out, unless this agent claimed
/// them too. Unreachable goals and tasks whose station is missing are
/// logged and skipped. Read-only: two calls on the same world yield the
/// same map.
pub fn enumerate_goals(view: &EnvironmentView, nav: &NavGraph) -> GoalMap {
    let me = view.agent.id;
    let mut goals = GoalMap::new();

    for task in &view.world.goal_space {
        let claimed = view
            .world
            .agents
            .iter()
            .any(|other| other.id != me && other.assigned == Some(task.id));
        if claimed && view.agent.assigned != Some(task.id) {
            continue;
        }
        match evaluate_task(view, nav, task) {
            Ok(Some(goal)) => {
                debug!(agent = me, task = task.id, action = %goal.action, target = %goal.target, cost = goal.cost(), reward = goal.reward, "scored goal");
                goals.insert(task.id, goal);
            }
            Ok(None) => {}
            Err(err) => debug!(agent = me, task = task.id, "skipping task: {}", err),
        }
    }
    goals
}

/// Route to the nearest free counter, for an agent holding something no
/// task wants. Returns `(counter, staging, route)`.
pub fn stash_route(view: &EnvironmentView, nav: &NavGraph) -> Option<(Position, Position, Route)> {
    view.agent.holding.as_ref()?;
    let free: Vec<Position> = view
        .layout
        .counters()
        .into_iter()
        .filter(|&counter| view.world.item_at(counter).is_none())
        .collect();
    if free.is_empty() {
        return None;
    }
    cheapest_route(nav, view.agent.location, &free).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AgentId,
        config::{Recipe, SimConfig},
        item::{Ingredient, PotPhase},
        map::{KitchenLayout, load_layout_from_string},
        world::WorldState,
    };

    // No chopping board and no tomato source.
    const BOARDLESS_KITCHEN: &str = "
CT ON CT PT CT
CT FL FL FL SV
CT FL FL FL CT
CT CT CT PL CT
";

    fn kitchen(recipes: Vec<Recipe>) -> (KitchenLayout, WorldState, SimConfig) {
        let layout = load_layout_from_string(BOARDLESS_KITCHEN).unwrap();
        let config = SimConfig {
            recipes,
            ..SimConfig::default()
        };
        let mut world = WorldState::new(&layout);
        world.add_agent(&layout, 0, Position::new(2, 2)).unwrap();
        for recipe in &config.recipes {
            world.queue_order(recipe);
        }
        (layout, world, config)
    }

    fn goals_for(layout: &KitchenLayout, world: &WorldState, config: &SimConfig, id: AgentId) -> GoalMap {
        let view = EnvironmentView::new(layout, world, config, id).unwrap();
        let nav = NavGraph::for_agent(layout, world, id);
        enumerate_goals(&view, &nav)
    }

    fn chopped_onion(id: usize) -> Ingredient {
        Ingredient {
            id,
            name: "onion".into(),
            state: IngredientState::Chopped,
        }
    }

    #[test]
    fn missing_station_skips_only_that_task() {
        let (layout, mut world, config) = kitchen(vec![
            Recipe::new("onion_soup", "onion", 1),
            Recipe::new("tomato_soup", "tomato", 1),
        ]);
        // 0: onion unit, 1: onion dish, 2: tomato unit, 3: tomato dish.
        let goals = goals_for(&layout, &world, &config, 0);
        assert_eq!(goals.keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(goals[&0].target, Position::new(1, 0));

        let view = EnvironmentView::new(&layout, &world, &config, 0).unwrap();
        assert!(matches!(
            candidate_targets(&view, &world.goal_space[2]),
            Err(PlanError::MissingStation { task: 2, .. })
        ));

        world.agent_mut(0).unwrap().holding = Some(Item::Ingredient(Ingredient::fresh(9, "onion")));
        let view = EnvironmentView::new(&layout, &world, &config, 0).unwrap();
        assert!(matches!(
            candidate_targets(&view, &world.goal_space[0]),
            Err(PlanError::MissingStation { task: 0, .. })
        ));
    }

    #[test]
    fn occupied_staging_cell_skips_only_that_task() {
        let (layout, mut world, config) = kitchen(vec![Recipe::new("onion_soup", "onion", 1)]);
        // The onion source's only staging cell is taken.
        world.add_agent(&layout, 1, Position::new(1, 1)).unwrap();
        world.pots[0].add(chopped_onion(50), 1, config.cook_ticks);

        let goals = goals_for(&layout, &world, &config, 0);
        assert_eq!(goals.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(goals[&1].action, Action::Pick);
        assert_eq!(goals[&1].target, Position::new(3, 3));
        assert_eq!(goals[&1].cost(), 1);

        let view = EnvironmentView::new(&layout, &world, &config, 0).unwrap();
        let nav = NavGraph::for_agent(&layout, &world, 0);
        assert!(matches!(
            evaluate_task(&view, &nav, &world.goal_space[0]),
            Err(PlanError::PathNotFound { .. })
        ));
    }

    #[test]
    fn claimed_tasks_stay_with_their_claimants() {
        let (layout, mut world, config) = kitchen(vec![Recipe::new("onion_soup", "onion", 1)]);
        world.add_agent(&layout, 1, Position::new(3, 2)).unwrap();
        world.agent_mut(1).unwrap().assigned = Some(0);

        assert!(goals_for(&layout, &world, &config, 0).is_empty());
        assert!(goals_for(&layout, &world, &config, 1).contains_key(&0));

        world.agent_mut(0).unwrap().assigned = Some(0);
        assert!(goals_for(&layout, &world, &config, 0).contains_key(&0));
    }

    #[test]
    fn burnt_pot_is_emptied_before_a_closer_onion_is_fetched() {
        let (layout, mut world, config) = kitchen(vec![Recipe::new("onion_soup", "onion", 3)]);
        world.agent_mut(0).unwrap().location = Position::new(1, 1);
        world.place_item(Item::Ingredient(chopped_onion(40)), Position::new(0, 1));
        world.pots[0].contents = vec![chopped_onion(41), chopped_onion(42)];
        world.pots[0].phase = PotPhase::Burnt;

        let goals = goals_for(&layout, &world, &config, 0);
        assert_eq!(goals.len(), 3);
        for goal in goals.values() {
            assert_eq!(goal.action, Action::Pick);
            assert_eq!(goal.target, Position::new(3, 0));
            assert_eq!(goal.staging, Position::new(3, 1));
        }

        world.pots[0].take_contents();
        let goals = goals_for(&layout, &world, &config, 0);
        assert!(goals.values().all(|goal| goal.target == Position::new(0, 1) && goal.cost() == 0));
    }
}

//! The shared, mutable world state: agents, loose items, pots, the goal
//! space and reward counters, plus the single-step execution of primitive
//! actions against it.
//!
//! The static kitchen topology lives in [`KitchenLayout`]; everything here
//! changes from tick to tick.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    AgentId, ItemId, Position, TaskId,
    action::{Action, PlannedStep},
    config::{Recipe, SimConfig},
    item::{Ingredient, IngredientState, Item, PlacedItem, Plate, PlateState, Pot, PotEvent, PotPhase},
    map::{KitchenLayout, StationKind},
};

/// Represents errors of the world store itself, as opposed to failed actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// An agent id that was never registered. Indicates a programming error.
    #[error("Agent {0} not found.")]
    UnknownAgent(AgentId),
    #[error("Agent ID {0} is already in use.")]
    DuplicateAgent(AgentId),
    #[error("Cannot place agent at {0}: not a free floor cell.")]
    BlockedSpawn(Position),
    #[error("Requested {requested} agents but the map has {available} start cells.")]
    NotEnoughStarts { requested: usize, available: usize },
}

/// Represents the outcome of executing one primitive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Success { reward: i32 },
    Failure(String),
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success { .. })
    }

    fn fail(reason: impl Into<String>) -> Self {
        ActionResult::Failure(reason.into())
    }
}

/// Which stage of a recipe a task tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// One unit of ingredient: PICK, CHOP, then COOK into a pot.
    Ingredient,
    /// The finished dish: PICK a plate, SCOOP the pot, SERVE.
    Dish,
}

/// An outstanding unit of recipe work in the goal space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub dish: String,
    pub ingredient: String,
    pub kind: TaskKind,
}

/// Holds the state of an agent within the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub location: Position,
    pub holding: Option<Item>,
    /// Task chosen at the last planning pass; `None` while idle.
    pub assigned: Option<TaskId>,
}

/// Cumulative rewards earned by successful task actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTally {
    pub chop: i64,
    pub cook: i64,
    pub serve: i64,
}

/// Named entity categories for read-only consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Agents,
    Ingredients,
    Plates,
    Pots,
    ChoppingBoards,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub id: AgentId,
    pub location: Position,
    pub holding: Option<String>,
    pub assigned: Option<TaskId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PotView {
    pub location: Position,
    pub ingredient: Option<String>,
    pub count: usize,
    pub phase: PotPhase,
}

/// Render-facing projection of the world for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct WorldView {
    pub episode: u64,
    pub order_count: u32,
    pub rewards: RewardTally,
    pub orders: Vec<String>,
    pub open_tasks: usize,
    pub agents: Vec<AgentView>,
    pub items: Vec<(String, Position)>,
    pub pots: Vec<PotView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// Registration order; also the per-tick processing order.
    pub agents: Vec<AgentState>,
    pub items: Vec<PlacedItem>,
    pub pots: Vec<Pot>,
    pub goal_space: Vec<Task>,
    pub orders: VecDeque<String>,
    pub order_count: u32,
    pub rewards: RewardTally,
    pub episode: u64,
    /// The world as it was one tick ago. Never nested deeper than one level.
    #[serde(skip)]
    pub history: Option<Box<WorldState>>,
    next_item_id: ItemId,
    next_task_id: TaskId,
}

impl WorldState {
    /// Fresh world: one empty pot per stove, clean plates on their spawn counters.
    pub fn new(layout: &KitchenLayout) -> Self {
        let mut world = WorldState {
            agents: Vec::new(),
            items: Vec::new(),
            pots: layout
                .stoves()
                .into_iter()
                .enumerate()
                .map(|(id, location)| Pot::new(id, location))
                .collect(),
            goal_space: Vec::new(),
            orders: VecDeque::new(),
            order_count: 0,
            rewards: RewardTally::default(),
            episode: 0,
            history: None,
            next_item_id: 0,
            next_task_id: 0,
        };
        for &location in layout.plate_spawns() {
            let plate = Item::Plate(Plate::empty(world.reserve_item_id()));
            world.items.push(PlacedItem {
                item: plate,
                location,
            });
        }
        world
    }

    pub fn reserve_item_id(&mut self) -> ItemId {
        let id = self.next_item_id;
        self.next_item_id += 1;
        id
    }

    /// Registers an agent on a free floor cell.
    pub fn add_agent(
        &mut self,
        layout: &KitchenLayout,
        id: AgentId,
        location: Position,
    ) -> Result<(), WorldError> {
        if self.agents.iter().any(|agent| agent.id == id) {
            return Err(WorldError::DuplicateAgent(id));
        }
        if !layout.is_floor(location) || self.agent_at(location).is_some() {
            return Err(WorldError::BlockedSpawn(location));
        }
        self.agents.push(AgentState {
            id,
            location,
            holding: None,
            assigned: None,
        });
        Ok(())
    }

    /// Places an item on a counter. Used to seed scenarios and by DROP.
    pub fn place_item(&mut self, item: Item, location: Position) {
        self.items.push(PlacedItem { item, location });
    }

    pub fn agent(&self, id: AgentId) -> Result<&AgentState, WorldError> {
        self.agents
            .iter()
            .find(|agent| agent.id == id)
            .ok_or(WorldError::UnknownAgent(id))
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Result<&mut AgentState, WorldError> {
        self.agents
            .iter_mut()
            .find(|agent| agent.id == id)
            .ok_or(WorldError::UnknownAgent(id))
    }

    fn agent_index(&self, id: AgentId) -> Result<usize, WorldError> {
        self.agents
            .iter()
            .position(|agent| agent.id == id)
            .ok_or(WorldError::UnknownAgent(id))
    }

    pub fn agent_at(&self, pos: Position) -> Option<AgentId> {
        self.agents
            .iter()
            .find(|agent| agent.location == pos)
            .map(|agent| agent.id)
    }

    /// Cells occupied by every agent except `agent_id`.
    pub fn other_agent_cells(&self, agent_id: AgentId) -> HashSet<Position> {
        self.agents
            .iter()
            .filter(|agent| agent.id != agent_id)
            .map(|agent| agent.location)
            .collect()
    }

    pub fn item_at(&self, pos: Position) -> Option<&PlacedItem> {
        self.items.iter().find(|placed| placed.location == pos)
    }

    pub fn pot_at(&self, pos: Position) -> Option<&Pot> {
        self.pots.iter().find(|pot| pot.location == pos)
    }

    /// Appends the tasks of one order: one ingredient task per unit, then the dish task.
    pub fn queue_order(&mut self, recipe: &Recipe) {
        self.orders.push_back(recipe.name.clone());
        for _ in 0..recipe.count {
            self.push_task(&recipe.name, &recipe.ingredient, TaskKind::Ingredient);
        }
        self.push_task(&recipe.name, &recipe.ingredient, TaskKind::Dish);
    }

    fn push_task(&mut self, dish: &str, ingredient: &str, kind: TaskKind) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id += 1;
        self.goal_space.push(Task {
            id,
            dish: dish.to_string(),
            ingredient: ingredient.to_string(),
            kind,
        });
        id
    }

    /// Removes exactly one task matching `kind` and `matches`, preferring `hint`.
    fn complete_task(
        &mut self,
        hint: Option<TaskId>,
        kind: TaskKind,
        matches: impl Fn(&Task) -> bool,
    ) -> Option<Task> {
        let eligible = |task: &Task| task.kind == kind && matches(task);
        let index = hint
            .and_then(|id| {
                self.goal_space
                    .iter()
                    .position(|task| task.id == id && eligible(task))
            })
            .or_else(|| self.goal_space.iter().position(eligible))?;
        Some(self.goal_space.remove(index))
    }

    /// Keeps a copy of the current state as the one-step history.
    pub fn record_history(&mut self) {
        self.history = None;
        let snapshot = self.clone();
        self.history = Some(Box::new(snapshot));
    }

    /// Executes one primitive action for `agent_id`.
    ///
    /// Only an unknown agent is an error; an action that cannot be carried
    /// out yields [`ActionResult::Failure`] and leaves the world untouched.
    pub fn apply(
        &mut self,
        layout: &KitchenLayout,
        config: &SimConfig,
        agent_id: AgentId,
        step: &PlannedStep,
    ) -> Result<ActionResult, WorldError> {
        let idx = self.agent_index(agent_id)?;
        let reward = config.rewards.reward(step.action);

        if step.action == Action::Stay {
            return Ok(ActionResult::Success { reward });
        }
        if step.action.is_movement() {
            return Ok(self.move_agent(layout, idx, step.action, reward));
        }

        let Some(target) = step.target else {
            return Ok(ActionResult::fail(format!("{} needs a target cell", step.action)));
        };
        if !self.agents[idx].location.is_orthogonally_adjacent(target) {
            return Ok(ActionResult::fail(format!(
                "{} target {} is not orthogonally adjacent",
                step.action, target
            )));
        }

        let result = match step.action {
            Action::Pick => self.pick(layout, idx, target),
            Action::Chop => self.chop(layout, config, idx, target),
            Action::Cook => self.cook(config, idx, target, step.task),
            Action::Scoop => self.scoop(config, idx, target),
            Action::Serve => self.serve(layout, config, idx, target, step.task),
            Action::Drop => self.drop_item(layout, idx, target),
            other => Err(format!("{} is not an interaction.", other)),
        };
        Ok(match result {
            Ok(()) => ActionResult::Success { reward },
            Err(reason) => ActionResult::Failure(reason),
        })
    }

    fn move_agent(
        &mut self,
        layout: &KitchenLayout,
        idx: usize,
        action: Action,
        reward: i32,
    ) -> ActionResult {
        let current = self.agents[idx].location;
        let Some(target) = action.apply_to(current) else {
            return ActionResult::fail("Target position is out of bounds.");
        };
        if !layout.is_floor(target) {
            return ActionResult::fail(format!("Cannot move into {}: not floor.", target));
        }
        if self.agent_at(target).is_some() {
            return ActionResult::fail("Target position is occupied by another agent.");
        }
        self.agents[idx].location = target;
        ActionResult::Success { reward }
    }

    fn pick(&mut self, layout: &KitchenLayout, idx: usize, target: Position) -> Result<(), String> {
        if self.agents[idx].holding.is_some() {
            return Err("Hands are full; drop first.".into());
        }
        if let Some(pos) = self.items.iter().position(|placed| placed.location == target) {
            let placed = self.items.remove(pos);
            self.agents[idx].holding = Some(placed.item);
            return Ok(());
        }
        if let Some(pot) = self.pots.iter_mut().find(|pot| pot.location == target) {
            if pot.is_burnt() {
                let discarded = pot.take_contents();
                debug!(agent = self.agents[idx].id, pot = pot.id, units = discarded.len(), "discarded burnt pot");
                return Ok(());
            }
            return Err("Only burnt pots can be emptied by hand.".into());
        }
        match layout.station_at(target).map(|station| &station.kind) {
            Some(StationKind::IngredientSource { ingredient }) => {
                let ingredient = Ingredient::fresh(self.reserve_item_id(), ingredient.clone());
                self.agents[idx].holding = Some(Item::Ingredient(ingredient));
                Ok(())
            }
            _ => Err(format!("Nothing to pick at {}.", target)),
        }
    }

    fn chop(
        &mut self,
        layout: &KitchenLayout,
        config: &SimConfig,
        idx: usize,
        target: Position,
    ) -> Result<(), String> {
        if layout.station_at(target).map(|station| &station.kind) != Some(&StationKind::ChoppingBoard) {
            return Err(format!("No chopping board at {}.", target));
        }
        if self.item_at(target).is_some() {
            return Err("Chopping board is occupied.".into());
        }
        match &mut self.agents[idx].holding {
            Some(Item::Ingredient(ingredient)) if ingredient.state == IngredientState::Fresh => {
                ingredient.state = IngredientState::Chopped;
            }
            _ => return Err("Must hold an unchopped ingredient to chop.".into()),
        }
        self.rewards.chop += i64::from(config.rewards.chop);
        Ok(())
    }

    fn cook(
        &mut self,
        config: &SimConfig,
        idx: usize,
        target: Position,
        hint: Option<TaskId>,
    ) -> Result<(), String> {
        let name = match &self.agents[idx].holding {
            Some(Item::Ingredient(ingredient)) if ingredient.state == IngredientState::Chopped => {
                ingredient.name.clone()
            }
            _ => return Err("Must hold a chopped ingredient to cook.".into()),
        };
        let recipe = config
            .recipe_for_ingredient(&name)
            .ok_or_else(|| format!("No recipe uses {}.", name))?;
        let pot = self
            .pots
            .iter_mut()
            .find(|pot| pot.location == target)
            .ok_or_else(|| format!("No pot at {}.", target))?;
        if !pot.accepts(&name, recipe.count) {
            return Err(format!("Pot at {} cannot take {}.", target, name));
        }
        let Some(Item::Ingredient(ingredient)) = self.agents[idx].holding.take() else {
            return Err("Must hold a chopped ingredient to cook.".into());
        };
        pot.add(ingredient, recipe.count, config.cook_ticks);

        self.rewards.cook += i64::from(config.rewards.cook);
        let dish = recipe.name.clone();
        if let Some(task) = self.complete_task(hint, TaskKind::Ingredient, |task| {
            task.ingredient == name && task.dish == dish
        }) {
            info!(agent = self.agents[idx].id, task = task.id, "cooked {} for {}", name, dish);
        }
        self.agents[idx].assigned = None;
        Ok(())
    }

    fn scoop(&mut self, config: &SimConfig, idx: usize, target: Position) -> Result<(), String> {
        if !matches!(
            &self.agents[idx].holding,
            Some(Item::Plate(plate)) if plate.state == PlateState::Empty
        ) {
            return Err("Must hold an empty plate to scoop.".into());
        }
        let pot = self
            .pots
            .iter_mut()
            .find(|pot| pot.location == target)
            .ok_or_else(|| format!("No pot at {}.", target))?;
        if !pot.is_cooked() {
            return Err("Pot is not ready.".into());
        }
        let dish = pot
            .ingredient()
            .and_then(|ingredient| config.recipe_for_ingredient(ingredient))
            .map(|recipe| recipe.name.clone())
            .ok_or("Pot contents match no recipe.")?;
        pot.take_contents();
        if let Some(Item::Plate(plate)) = &mut self.agents[idx].holding {
            plate.state = PlateState::Plated;
            plate.dish = Some(dish);
        }
        Ok(())
    }

    fn serve(
        &mut self,
        layout: &KitchenLayout,
        config: &SimConfig,
        idx: usize,
        target: Position,
        hint: Option<TaskId>,
    ) -> Result<(), String> {
        if layout.station_at(target).map(|station| &station.kind) != Some(&StationKind::ServingCounter) {
            return Err(format!("No serving counter at {}.", target));
        }
        let dish = match &self.agents[idx].holding {
            Some(Item::Plate(Plate {
                state: PlateState::Plated,
                dish: Some(dish),
                ..
            })) => dish.clone(),
            _ => return Err("Must hold a plated dish to serve.".into()),
        };
        let Some(Item::Plate(plate)) = self.agents[idx].holding.take() else {
            return Err("Must hold a plated dish to serve.".into());
        };

        self.rewards.serve += i64::from(config.rewards.serve);
        self.order_count += 1;
        if let Some(pos) = self.orders.iter().position(|order| *order == dish) {
            self.orders.remove(pos);
        }
        if let Some(task) = self.complete_task(hint, TaskKind::Dish, |task| task.dish == dish) {
            info!(agent = self.agents[idx].id, task = task.id, "served {}", dish);
        }
        self.agents[idx].assigned = None;

        let free = layout
            .return_counter()
            .into_iter()
            .chain(layout.plate_spawns().iter().copied())
            .chain(layout.counters())
            .find(|&cell| self.item_at(cell).is_none());
        match free {
            Some(cell) => self.place_item(Item::Plate(Plate::empty(plate.id)), cell),
            None => debug!(plate = plate.id, "every surface is taken; plate retired"),
        }
        Ok(())
    }

    fn drop_item(&mut self, layout: &KitchenLayout, idx: usize, target: Position) -> Result<(), String> {
        if self.agents[idx].holding.is_none() {
            return Err("Nothing to drop.".into());
        }
        if !layout.can_hold_items(target) || self.item_at(target).is_some() {
            return Err(format!("Cannot drop onto {}.", target));
        }
        if let Some(item) = self.agents[idx].holding.take() {
            self.place_item(item, target);
        }
        Ok(())
    }

    /// Advances every pot timer by one tick. Burnt pots put their units back into the goal space.
    pub fn advance_pots(&mut self, config: &SimConfig) -> Vec<PotEvent> {
        let mut events = Vec::new();
        for pot in &mut self.pots {
            if let Some(event) = pot.advance(config.burn_ticks) {
                events.push(event);
            }
        }
        for event in &events {
            if let PotEvent::Burnt { ingredient, count } = event {
                if let Some(recipe) = config.recipe_for_ingredient(ingredient) {
                    let dish = recipe.name.clone();
                    for _ in 0..*count {
                        self.push_task(&dish, ingredient, TaskKind::Ingredient);
                    }
                }
            }
        }
        events
    }

    /// Entities of one named category as `(label, location)` pairs.
    ///
    /// Held items report their holder's location.
    pub fn category(&self, layout: &KitchenLayout, category: Category) -> Vec<(String, Position)> {
        let all_items = self
            .items
            .iter()
            .map(|placed| (&placed.item, placed.location))
            .chain(
                self.agents
                    .iter()
                    .filter_map(|agent| agent.holding.as_ref().map(|item| (item, agent.location))),
            );
        match category {
            Category::Agents => self
                .agents
                .iter()
                .map(|agent| (format!("agent {}", agent.id), agent.location))
                .collect(),
            Category::Ingredients => all_items
                .filter(|(item, _)| matches!(item, Item::Ingredient(_)))
                .map(|(item, location)| (item.label(), location))
                .collect(),
            Category::Plates => all_items
                .filter(|(item, _)| matches!(item, Item::Plate(_)))
                .map(|(item, location)| (item.label(), location))
                .collect(),
            Category::Pots => self
                .pots
                .iter()
                .map(|pot| (format!("pot {}", pot.id), pot.location))
                .collect(),
            Category::ChoppingBoards => layout
                .chopping_boards()
                .into_iter()
                .map(|location| ("chopping board".to_string(), location))
                .collect(),
        }
    }

    pub fn view(&self) -> WorldView {
        WorldView {
            episode: self.episode,
            order_count: self.order_count,
            rewards: self.rewards,
            orders: self.orders.iter().cloned().collect(),
            open_tasks: self.goal_space.len(),
            agents: self
                .agents
                .iter()
                .map(|agent| AgentView {
                    id: agent.id,
                    location: agent.location,
                    holding: agent.holding.as_ref().map(Item::label),
                    assigned: agent.assigned,
                })
                .collect(),
            items: self
                .items
                .iter()
                .map(|placed| (placed.item.label(), placed.location))
                .collect(),
            pots: self
                .pots
                .iter()
                .map(|pot| PotView {
                    location: pot.location,
                    ingredient: pot.ingredient().map(str::to_string),
                    count: pot.count(),
                    phase: pot.phase,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::Action,
        map::load_layout_from_string,
    };

    const TINY_KITCHEN: &str = "
CT ON CT PT CT
CB FL FL FL SV
CT FL FL FL CT
CT RT CT PL CT
";

    fn setup(recipe_count: usize, cook_ticks: u32) -> (KitchenLayout, WorldState, SimConfig) {
        let layout = load_layout_from_string(TINY_KITCHEN).unwrap();
        let config = SimConfig {
            recipes: vec![Recipe::new("onion_soup", "onion", recipe_count)],
            cook_ticks,
            ..SimConfig::default()
        };
        let mut world = WorldState::new(&layout);
        world.add_agent(&layout, 0, Position::new(1, 1)).unwrap();
        world.queue_order(&config.recipes[0]);
        (layout, world, config)
    }

    fn run(
        world: &mut WorldState,
        layout: &KitchenLayout,
        config: &SimConfig,
        step: PlannedStep,
    ) -> ActionResult {
        world.apply(layout, config, 0, &step).unwrap()
    }

    fn interact(action: Action, x: usize, y: usize) -> PlannedStep {
        PlannedStep::interact(action, Position::new(x, y), None)
    }

    #[test]
    fn full_order_cycle() {
        let (layout, mut world, config) = setup(1, 0);
        assert_eq!(world.goal_space.len(), 2);

        assert_eq!(
            run(&mut world, &layout, &config, interact(Action::Pick, 1, 0)),
            ActionResult::Success { reward: 10 }
        );
        assert!(run(&mut world, &layout, &config, interact(Action::Chop, 0, 1)).is_success());
        assert_eq!(world.rewards.chop, 30);
        for _ in 0..2 {
            assert!(run(&mut world, &layout, &config, PlannedStep::movement(Action::MoveRight)).is_success());
        }
        assert!(run(&mut world, &layout, &config, PlannedStep::interact(Action::Cook, Position::new(3, 0), Some(0))).is_success());
        assert_eq!(world.goal_space.len(), 1);
        assert_eq!(world.goal_space[0].kind, TaskKind::Dish);
        assert_eq!(world.rewards.cook, 45);
        assert!(world.pot_at(Position::new(3, 0)).unwrap().is_cooked());

        assert!(run(&mut world, &layout, &config, PlannedStep::movement(Action::MoveDown)).is_success());
        assert!(run(&mut world, &layout, &config, interact(Action::Pick, 3, 3)).is_success());
        assert!(run(&mut world, &layout, &config, PlannedStep::movement(Action::MoveUp)).is_success());
        assert!(run(&mut world, &layout, &config, interact(Action::Scoop, 3, 0)).is_success());
        assert_eq!(
            world.agent(0).unwrap().holding.as_ref().map(Item::label).as_deref(),
            Some("plate of onion_soup")
        );
        assert_eq!(world.pot_at(Position::new(3, 0)).unwrap().count(), 0);

        assert_eq!(
            run(&mut world, &layout, &config, interact(Action::Serve, 4, 1)),
            ActionResult::Success { reward: 100 }
        );
        assert!(world.goal_space.is_empty());
        assert!(world.orders.is_empty());
        assert_eq!(world.order_count, 1);
        assert_eq!(world.rewards.serve, 100);
        assert!(world.agent(0).unwrap().holding.is_none());
        assert_eq!(
            world.item_at(Position::new(1, 3)).map(|placed| placed.item.label()).as_deref(),
            Some("empty plate")
        );
    }

    #[test]
    fn cook_removes_exactly_one_matching_task() {
        let (layout, mut world, config) = setup(3, 5);
        world.agent_mut(0).unwrap().location = Position::new(3, 1);
        world.agent_mut(0).unwrap().holding = Some(Item::Ingredient(Ingredient {
            id: 99,
            name: "onion".into(),
            state: IngredientState::Chopped,
        }));
        assert_eq!(world.goal_space.len(), 4);

        assert!(run(&mut world, &layout, &config, PlannedStep::interact(Action::Cook, Position::new(3, 0), Some(2))).is_success());
        let remaining: Vec<TaskId> = world.goal_space.iter().map(|task| task.id).collect();
        assert_eq!(remaining, vec![0, 1, 3]);
        assert_eq!(world.pot_at(Position::new(3, 0)).unwrap().phase, PotPhase::Filling);
    }

    #[test]
    fn invalid_actions_fail_without_side_effects() {
        let (layout, mut world, config) = setup(1, 0);
        let before = world.clone();

        // Counter above, not floor.
        assert!(!run(&mut world, &layout, &config, PlannedStep::movement(Action::MoveDiagonalRightUp)).is_success());
        // Pot is not adjacent to (1, 1).
        assert!(!run(&mut world, &layout, &config, interact(Action::Scoop, 3, 0)).is_success());
        assert!(!run(&mut world, &layout, &config, interact(Action::Chop, 0, 1)).is_success());
        assert!(!run(&mut world, &layout, &config, interact(Action::Drop, 2, 1)).is_success());
        assert!(!run(&mut world, &layout, &config, PlannedStep::movement(Action::Pick)).is_success());
        assert_eq!(world, before);

        assert!(run(&mut world, &layout, &config, interact(Action::Pick, 1, 0)).is_success());
        assert!(!run(&mut world, &layout, &config, interact(Action::Pick, 1, 0)).is_success());
        // Fresh onions cannot go into a pot.
        world.agent_mut(0).unwrap().location = Position::new(3, 1);
        assert!(!run(&mut world, &layout, &config, interact(Action::Cook, 3, 0)).is_success());
        assert!(!run(&mut world, &layout, &config, interact(Action::Serve, 4, 1)).is_success());
        assert!(world.agent(0).unwrap().holding.is_some());
        assert_eq!(world.goal_space.len(), 2);
    }

    #[test]
    fn unknown_agent_is_an_error() {
        let (layout, mut world, config) = setup(1, 0);
        assert_eq!(
            world.apply(&layout, &config, 42, &PlannedStep::stay()),
            Err(WorldError::UnknownAgent(42))
        );
    }

    #[test]
    fn agents_cannot_share_a_cell() {
        let (layout, mut world, config) = setup(1, 0);
        assert_eq!(
            world.add_agent(&layout, 1, Position::new(1, 1)),
            Err(WorldError::BlockedSpawn(Position::new(1, 1)))
        );
        assert_eq!(
            world.add_agent(&layout, 0, Position::new(2, 2)),
            Err(WorldError::DuplicateAgent(0))
        );
        world.add_agent(&layout, 1, Position::new(2, 1)).unwrap();
        assert!(!run(&mut world, &layout, &config, PlannedStep::movement(Action::MoveRight)).is_success());
    }

    #[test]
    fn drop_onto_counter_and_pick_back_up() {
        let (layout, mut world, config) = setup(1, 0);
        run(&mut world, &layout, &config, interact(Action::Pick, 1, 0));
        world.agent_mut(0).unwrap().location = Position::new(2, 1);
        assert!(run(&mut world, &layout, &config, interact(Action::Drop, 2, 0)).is_success());
        assert_eq!(
            world.item_at(Position::new(2, 0)).map(|placed| placed.item.label()).as_deref(),
            Some("fresh onion")
        );
        assert!(run(&mut world, &layout, &config, interact(Action::Pick, 2, 0)).is_success());
        assert!(world.item_at(Position::new(2, 0)).is_none());
    }

    #[test]
    fn burnt_pot_requeues_and_is_discarded_by_hand() {
        let (layout, mut world, mut config) = setup(1, 1);
        config.burn_ticks = Some(1);
        world.goal_space.retain(|task| task.kind == TaskKind::Dish);
        world.agent_mut(0).unwrap().location = Position::new(3, 1);
        world.agent_mut(0).unwrap().holding = Some(Item::Ingredient(Ingredient {
            id: 99,
            name: "onion".into(),
            state: IngredientState::Chopped,
        }));
        assert!(run(&mut world, &layout, &config, interact(Action::Cook, 3, 0)).is_success());

        assert!(matches!(
            world.advance_pots(&config).as_slice(),
            [PotEvent::FinishedCooking { .. }]
        ));
        assert!(matches!(
            world.advance_pots(&config).as_slice(),
            [PotEvent::Burnt { count: 1, .. }]
        ));
        let requeued = world
            .goal_space
            .iter()
            .filter(|task| task.kind == TaskKind::Ingredient)
            .count();
        assert_eq!(requeued, 1);

        assert!(run(&mut world, &layout, &config, interact(Action::Pick, 3, 0)).is_success());
        assert!(world.agent(0).unwrap().holding.is_none());
        let pot = world.pot_at(Position::new(3, 0)).unwrap();
        assert_eq!((pot.count(), pot.phase), (0, PotPhase::Filling));
    }

    #[test]
    fn served_plate_falls_back_to_a_free_counter() {
        let (layout, mut world, config) = setup(1, 0);
        world.place_item(Item::Ingredient(Ingredient::fresh(70, "onion")), Position::new(1, 3));
        world.agent_mut(0).unwrap().location = Position::new(3, 1);
        world.agent_mut(0).unwrap().holding = Some(Item::Plate(Plate {
            id: 71,
            state: PlateState::Plated,
            dish: Some("onion_soup".into()),
        }));

        assert!(run(&mut world, &layout, &config, interact(Action::Serve, 4, 1)).is_success());
        // Return counter and plate spawn are both taken.
        assert_eq!(
            world.item_at(Position::new(0, 0)).map(|placed| &placed.item),
            Some(&Item::Plate(Plate::empty(71)))
        );
    }

    #[test]
    fn categories_report_held_items_at_the_holder() {
        let (layout, mut world, config) = setup(1, 0);
        run(&mut world, &layout, &config, interact(Action::Pick, 1, 0));

        let ingredients = world.category(&layout, Category::Ingredients);
        assert_eq!(ingredients, vec![("fresh onion".to_string(), Position::new(1, 1))]);
        assert_eq!(world.category(&layout, Category::Plates).len(), 1);
        assert_eq!(world.category(&layout, Category::Pots).len(), 1);
        assert_eq!(world.category(&layout, Category::ChoppingBoards)[0].1, Position::new(0, 1));

        let view = world.view();
        assert_eq!(view.agents[0].holding.as_deref(), Some("fresh onion"));
        assert_eq!(view.open_tasks, 2);
    }
}

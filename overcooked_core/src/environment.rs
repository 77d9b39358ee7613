use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use tracing::{debug, info};

use crate::{
    AgentId, Position, TaskId,
    action::PlannedStep,
    agent::{Agent, PlanningAgent},
    config::SimConfig,
    item::PotEvent,
    map::KitchenLayout,
    world::{ActionResult, AgentState, WorldError, WorldState},
};

/// Provides a read-only view of the kitchen relevant to one agent.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentView<'a> {
    pub layout: &'a KitchenLayout,
    pub world: &'a WorldState,
    pub config: &'a SimConfig,
    pub agent: &'a AgentState,
}

impl<'a> EnvironmentView<'a> {
    pub fn new(
        layout: &'a KitchenLayout,
        world: &'a WorldState,
        config: &'a SimConfig,
        agent_id: AgentId,
    ) -> Result<Self, WorldError> {
        Ok(EnvironmentView {
            layout,
            world,
            config,
            agent: world.agent(agent_id)?,
        })
    }
}

/// What one agent did during a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    pub agent: AgentId,
    pub task: Option<TaskId>,
    pub step: PlannedStep,
    pub result: ActionResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Episode number the turn was played in.
    pub episode: u64,
    pub outcomes: Vec<AgentOutcome>,
    pub pot_events: Vec<PotEvent>,
}

/// Manages the simulation: the static kitchen, the shared world and the
/// agents acting on it.
pub struct Environment {
    layout: KitchenLayout,
    world: WorldState,
    config: SimConfig,
    behaviors: Vec<Box<dyn Agent>>,
    rng: StdRng,
}

impl Environment {
    /// Creates an environment with no agents and a full order queue.
    pub fn new(layout: KitchenLayout, config: SimConfig) -> Self {
        let world = WorldState::new(&layout);
        let rng = StdRng::seed_from_u64(config.seed);
        let mut env = Environment {
            layout,
            world,
            config,
            behaviors: Vec::new(),
            rng,
        };
        env.top_up_orders();
        env
    }

    /// Places `count` planning agents on the layout's agent starts, in start order.
    pub fn with_planning_agents(
        layout: KitchenLayout,
        config: SimConfig,
        count: usize,
    ) -> Result<Self, WorldError> {
        let available = layout.agent_starts().len();
        if count > available {
            return Err(WorldError::NotEnoughStarts {
                requested: count,
                available,
            });
        }
        let starts: Vec<Position> = layout.agent_starts()[..count].to_vec();
        let seed = config.seed;
        let mut env = Environment::new(layout, config);
        for (id, start) in starts.into_iter().enumerate() {
            let agent = PlanningAgent::new(id, seed.wrapping_add(id as u64));
            env.add_agent(Box::new(agent), start)?;
        }
        Ok(env)
    }

    /// Registers an agent. Registration order is the processing order.
    pub fn add_agent(&mut self, behavior: Box<dyn Agent>, location: Position) -> Result<(), WorldError> {
        self.world.add_agent(&self.layout, behavior.id(), location)?;
        self.behaviors.push(behavior);
        Ok(())
    }

    /// Draws random recipes until `active_orders` orders are queued.
    pub fn top_up_orders(&mut self) {
        while self.world.orders.len() < self.config.active_orders {
            let Some(recipe) = self.config.recipes.choose(&mut self.rng) else {
                break;
            };
            info!(order = %recipe.name, "new order");
            self.world.queue_order(recipe);
        }
    }

    /// Plays one tick.
    ///
    /// Every agent plans against the same snapshot, in registration order;
    /// then each agent's first step is applied in that order, so earlier
    /// agents win contested stations. Pot timers and the order queue
    /// advance afterwards.
    pub fn process_turn(&mut self) -> Result<TurnReport, WorldError> {
        self.world.record_history();

        let mut decisions = Vec::with_capacity(self.behaviors.len());
        for behavior in &mut self.behaviors {
            let view = EnvironmentView::new(&self.layout, &self.world, &self.config, behavior.id())?;
            decisions.push((behavior.id(), behavior.decide(&view)));
        }

        let mut outcomes = Vec::with_capacity(decisions.len());
        for (agent_id, decision) in decisions {
            let step = decision.first_step();
            self.world.agent_mut(agent_id)?.assigned = decision.task;
            let result = self.world.apply(&self.layout, &self.config, agent_id, &step)?;
            match &result {
                ActionResult::Success { .. } => {
                    debug!(agent = agent_id, action = %step.action, "step succeeded")
                }
                ActionResult::Failure(reason) => {
                    debug!(agent = agent_id, action = %step.action, "step failed: {}", reason)
                }
            }
            outcomes.push(AgentOutcome {
                agent: agent_id,
                task: decision.task,
                step,
                result,
            });
        }

        let pot_events = self.world.advance_pots(&self.config);
        for event in &pot_events {
            info!(?event, "pot");
        }
        self.top_up_orders();

        let report = TurnReport {
            episode: self.world.episode,
            outcomes,
            pot_events,
        };
        self.world.episode += 1;
        Ok(report)
    }

    pub fn layout(&self) -> &KitchenLayout {
        &self.layout
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Direct access for seeding scenarios.
    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::Action,
        agent::ScriptedAgent,
        map::default_layout,
    };

    #[test]
    fn new_environment_queues_one_order() {
        let env = Environment::new(default_layout(), SimConfig::default());
        assert_eq!(env.world().orders.len(), 1);
        // Three onions plus the dish.
        assert_eq!(env.world().goal_space.len(), 4);
        assert_eq!(env.world().items.len(), 2);
    }

    #[test]
    fn too_many_agents_is_rejected() {
        let err = Environment::with_planning_agents(default_layout(), SimConfig::default(), 5)
            .err()
            .unwrap();
        assert_eq!(
            err,
            WorldError::NotEnoughStarts {
                requested: 5,
                available: 4
            }
        );
    }

    #[test]
    fn first_registered_agent_wins_a_contested_cell() {
        let mut env = Environment::new(default_layout(), SimConfig::default());
        // Both agents try to step into (6, 2).
        env.add_agent(
            Box::new(ScriptedAgent::new(7, [PlannedStep::movement(Action::MoveRight)])),
            Position::new(5, 2),
        )
        .unwrap();
        env.add_agent(
            Box::new(ScriptedAgent::new(3, [PlannedStep::movement(Action::MoveLeft)])),
            Position::new(7, 2),
        )
        .unwrap();

        let report = env.process_turn().unwrap();
        assert_eq!(report.episode, 0);
        assert_eq!(report.outcomes[0].agent, 7);
        assert!(report.outcomes[0].result.is_success());
        assert!(!report.outcomes[1].result.is_success());
        assert_eq!(env.world().agent(7).unwrap().location, Position::new(6, 2));
        assert_eq!(env.world().agent(3).unwrap().location, Position::new(7, 2));
        assert_eq!(env.world().episode, 1);
    }

    #[test]
    fn history_keeps_exactly_one_previous_tick() {
        let mut env = Environment::new(default_layout(), SimConfig::default());
        env.add_agent(
            Box::new(ScriptedAgent::new(
                0,
                [
                    PlannedStep::movement(Action::MoveRight),
                    PlannedStep::movement(Action::MoveRight),
                ],
            )),
            Position::new(5, 2),
        )
        .unwrap();
        env.process_turn().unwrap();
        env.process_turn().unwrap();

        let previous = env.world().history.as_deref().unwrap();
        assert_eq!(previous.episode, 1);
        assert_eq!(previous.agent(0).unwrap().location, Position::new(6, 2));
        assert!(previous.history.is_none());
        assert_eq!(env.world().agent(0).unwrap().location, Position::new(7, 2));
    }

    #[test]
    fn planning_agents_make_progress_on_the_default_kitchen() {
        let mut config = SimConfig::default();
        config.seed = 42;
        let mut env = Environment::with_planning_agents(default_layout(), config, 2).unwrap();
        let mut picked = false;
        for _ in 0..30 {
            let report = env.process_turn().unwrap();
            picked |= report
                .outcomes
                .iter()
                .any(|o| o.step.action == Action::Pick && o.result.is_success());
        }
        assert!(picked);
    }
}
